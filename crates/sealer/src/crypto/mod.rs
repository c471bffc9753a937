//! Authenticated encryption: AES-256-GCM-SIV primitives and the envelope engine.
//!
//! This module is intentionally free of serialisation formats and token
//! policy. It turns bytes plus a passphrase into an [`common::EncryptionEnvelope`]
//! and back.
//!
//! # Pipeline
//!
//! ```text
//! encrypt: validate → random salt → cache/KDF(passphrase, salt, version) → AEAD(nonce, aad) → envelope
//! decrypt: validate shape → cache/KDF(passphrase, envelope.salt, envelope.version) → AEAD open
//! ```

pub mod cipher;
pub mod engine;

pub use engine::{Sealer, SealerBuilder, ALGORITHM, DEFAULT_AAD_CONTEXT};
