//! Structured values in and out of envelopes, as JSON bytes.
//!
//! Serialisation failures on the way in are [`SealError::InvalidInput`]. On the
//! way out the two failure classes stay apart:
//! [`SealError::AuthenticationFailed`] means the envelope did not verify, and
//! [`SealError::DeserializationFailed`] means it verified but the bytes are not
//! the expected shape.

use common::{EncryptionEnvelope, SealError, SealResult};
use serde::{de::DeserializeOwned, Serialize};
use zeroize::Zeroizing;

use crate::crypto::Sealer;

/// Serialise `value` to JSON and encrypt it under the sealer's default version.
///
/// # Errors
///
/// [`SealError::InvalidInput`] if `value` cannot be serialised, plus anything
/// [`Sealer::encrypt`] returns.
pub fn encrypt_structured<T>(
    sealer: &Sealer,
    value: &T,
    passphrase: &[u8],
) -> SealResult<EncryptionEnvelope>
where
    T: Serialize + ?Sized,
{
    encrypt_structured_with_version(sealer, value, passphrase, sealer.default_version())
}

/// Serialise `value` to JSON and encrypt it under `version`.
///
/// # Errors
///
/// See [`encrypt_structured`].
pub fn encrypt_structured_with_version<T>(
    sealer: &Sealer,
    value: &T,
    passphrase: &[u8],
    version: u32,
) -> SealResult<EncryptionEnvelope>
where
    T: Serialize + ?Sized,
{
    let bytes = Zeroizing::new(
        serde_json::to_vec(value)
            .map_err(|e| SealError::invalid_input(format!("value is not serialisable: {e}")))?,
    );
    sealer.encrypt_with_version(&bytes, passphrase, version)
}

/// Decrypt `envelope` and parse the plaintext as `T`.
///
/// # Errors
///
/// Anything [`Sealer::decrypt`] returns, unchanged; [`SealError::DeserializationFailed`]
/// if the authenticated plaintext does not parse as `T`.
pub fn decrypt_structured<T>(
    sealer: &Sealer,
    envelope: &EncryptionEnvelope,
    passphrase: &[u8],
) -> SealResult<T>
where
    T: DeserializeOwned,
{
    let bytes = Zeroizing::new(sealer.decrypt(envelope, passphrase)?);
    // serde_json's message carries position only, never the offending input.
    serde_json::from_slice(&bytes).map_err(|e| SealError::DeserializationFailed(e.to_string()))
}
