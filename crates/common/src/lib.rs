//! Envelope types and errors shared across `token-seal` crates.

pub mod envelope;
pub mod error;

pub use envelope::{CipherAlgorithm, EncryptionEnvelope};
pub use error::{SealError, SealResult};
