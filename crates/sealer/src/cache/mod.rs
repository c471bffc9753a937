//! Process-local cache of derived keys.
//!
//! Key derivation is deliberately expensive. The cache amortises that cost
//! across repeated encrypt/decrypt calls for the same `(passphrase, salt,
//! version)` within one process lifetime.
//!
//! # Security invariants
//!
//! - Entries live only in memory. Nothing here is ever written to disk, logged,
//!   or included in traces.
//! - Key bytes and cached passphrases are zeroed when evicted, cleared, or dropped.
//! - The cache is an owned value handed to each [`crate::Sealer`]; there is no
//!   global instance. Call [`KeyCache::clear`] on logout or key rotation.

pub mod store;

pub use store::{CacheStats, KeyCache, DEFAULT_CAPACITY};
