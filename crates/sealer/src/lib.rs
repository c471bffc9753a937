//! `sealer`: passphrase-based at-rest encryption of OAuth token bundles.
//!
//! Layers, leaves first:
//! 1. [`kdf`]: memory-hard key derivation (Argon2id, scrypt) and the version registry.
//! 2. [`cache`]: bounded FIFO cache of derived keys.
//! 3. [`crypto`]: AES-256-GCM-SIV envelopes ([`Sealer`]).
//! 4. [`codec`]: serde values in and out of envelopes.
//! 5. [`tokens`]: denylist sanitizing for token bundles.
//! 6. [`strength`]: passphrase policy check for provisioning.
//!
//! [`offload::AsyncSealer`] runs the same operations on tokio's blocking pool.
//!
//! # Security invariants
//!
//! - Passphrases, derived keys and plaintext are never logged.
//! - Every envelope gets a fresh salt and nonce; callers cannot supply either.
//! - Authentication failures are one generic error whatever the cause.

pub mod cache;
pub mod codec;
pub mod config;
pub mod crypto;
pub mod kdf;
pub mod offload;
pub mod strength;
pub mod tokens;

pub use cache::KeyCache;
pub use codec::{decrypt_structured, encrypt_structured, encrypt_structured_with_version};
pub use common::{CipherAlgorithm, EncryptionEnvelope, SealError, SealResult};
pub use config::SealerConfig;
pub use crypto::{Sealer, SealerBuilder};
pub use kdf::{KdfRegistry, KeyDerivationParams, CURRENT_KEY_VERSION};
pub use offload::AsyncSealer;
pub use strength::{validate_strength, StrengthIssue, StrengthReport};
pub use tokens::{decrypt_token_bundle, encrypt_token_bundle, TokenSanitizer};
