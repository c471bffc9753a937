//! Error taxonomy shared by every token-seal crate.

use thiserror::Error;

/// Every failure the sealing pipeline can report.
///
/// All variants are terminal to the operation that produced them. Nothing in
/// token-seal retries internally or falls back to a weaker path.
///
/// Machine-readable codes (see [`SealError::code`]):
/// - [`SealError::InvalidInput`] → `invalid_input`
/// - [`SealError::KeyDerivationFailed`] → `key_derivation_failed`
/// - [`SealError::MalformedEnvelope`] → `malformed_envelope`
/// - [`SealError::AuthenticationFailed`] → `authentication_failed`
/// - [`SealError::DeserializationFailed`] → `deserialization_failed`
/// - [`SealError::WorkerFailed`] → `worker_failed`
#[derive(Debug, Error)]
pub enum SealError {
    /// Missing or malformed arguments, rejected before any cryptographic work.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The underlying KDF primitive rejected its inputs or parameters.
    #[error("key derivation failed: {0}")]
    KeyDerivationFailed(String),

    /// The envelope handed to `decrypt` is structurally incomplete or unparseable.
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),

    /// AEAD tag verification failed.
    ///
    /// Covers wrong passphrase, corrupted data and tampering alike. Carries no
    /// detail on purpose.
    #[error("decryption failed: authentication failed")]
    AuthenticationFailed,

    /// Authentic plaintext did not parse as the expected structured format.
    #[error("deserialization failed: {0}")]
    DeserializationFailed(String),

    /// A blocking-pool task running a seal operation panicked or was cancelled.
    #[error("worker failed: {0}")]
    WorkerFailed(String),
}

impl SealError {
    /// Stable, machine-readable code for this error, safe to log or return to callers.
    pub fn code(&self) -> &'static str {
        match self {
            SealError::InvalidInput(_) => "invalid_input",
            SealError::KeyDerivationFailed(_) => "key_derivation_failed",
            SealError::MalformedEnvelope(_) => "malformed_envelope",
            SealError::AuthenticationFailed => "authentication_failed",
            SealError::DeserializationFailed(_) => "deserialization_failed",
            SealError::WorkerFailed(_) => "worker_failed",
        }
    }

    /// Shorthand for [`SealError::InvalidInput`].
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        SealError::InvalidInput(msg.into())
    }

    /// Shorthand for [`SealError::MalformedEnvelope`].
    pub fn malformed(msg: impl Into<String>) -> Self {
        SealError::MalformedEnvelope(msg.into())
    }
}

/// Result alias used throughout token-seal.
pub type SealResult<T> = Result<T, SealError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes() {
        assert_eq!(SealError::invalid_input("x").code(), "invalid_input");
        assert_eq!(
            SealError::KeyDerivationFailed("x".into()).code(),
            "key_derivation_failed"
        );
        assert_eq!(SealError::malformed("x").code(), "malformed_envelope");
        assert_eq!(SealError::AuthenticationFailed.code(), "authentication_failed");
        assert_eq!(
            SealError::DeserializationFailed("x".into()).code(),
            "deserialization_failed"
        );
        assert_eq!(SealError::WorkerFailed("x".into()).code(), "worker_failed");
    }

    #[test]
    fn display_includes_message() {
        let e = SealError::invalid_input("passphrase must not be empty");
        assert!(e.to_string().contains("passphrase must not be empty"));
    }

    #[test]
    fn authentication_failure_is_generic() {
        let msg = SealError::AuthenticationFailed.to_string();
        assert_eq!(msg, "decryption failed: authentication failed");
        for hint in ["wrong", "tamper", "corrupt", "passphrase", "key"] {
            assert!(!msg.contains(hint), "message leaks cause hint {hint:?}: {msg}");
        }
    }
}
