//! OAuth token bundles: sanitize, then seal; open, then sanitize again.
//!
//! # Security invariants
//!
//! - Denylisted fields (authorization codes, PKCE verifiers, `state`) never
//!   reach the cipher.
//! - The decrypt side applies the same denylist, so envelopes written before a
//!   path was added to it never hand that field back to a caller.
//! - Input shape is checked before any key derivation happens.

pub mod sanitize;

pub use sanitize::{TokenSanitizer, DEFAULT_DENYLIST};

use common::{EncryptionEnvelope, SealError, SealResult};
use serde_json::{Map, Value};

use crate::codec;
use crate::crypto::Sealer;

/// A token bundle: a JSON object of provider fields.
pub type TokenBundle = Map<String, Value>;

/// Sanitize `tokens` with the default denylist and encrypt them.
///
/// # Errors
///
/// See [`encrypt_token_bundle_with`].
pub fn encrypt_token_bundle(
    sealer: &Sealer,
    tokens: &Value,
    passphrase: &[u8],
) -> SealResult<EncryptionEnvelope> {
    encrypt_token_bundle_with(sealer, &TokenSanitizer::default(), tokens, passphrase)
}

/// Sanitize `tokens` with `sanitizer` and encrypt them under the default version.
///
/// # Errors
///
/// See [`encrypt_token_bundle_with_version`].
pub fn encrypt_token_bundle_with(
    sealer: &Sealer,
    sanitizer: &TokenSanitizer,
    tokens: &Value,
    passphrase: &[u8],
) -> SealResult<EncryptionEnvelope> {
    encrypt_token_bundle_with_version(
        sealer,
        sanitizer,
        tokens,
        passphrase,
        sealer.default_version(),
    )
}

/// Sanitize `tokens` with `sanitizer` and encrypt them under `version`.
///
/// # Errors
///
/// [`SealError::InvalidInput`] if `tokens` is not a JSON object, plus anything
/// [`Sealer::encrypt_with_version`] returns.
pub fn encrypt_token_bundle_with_version(
    sealer: &Sealer,
    sanitizer: &TokenSanitizer,
    tokens: &Value,
    passphrase: &[u8],
    version: u32,
) -> SealResult<EncryptionEnvelope> {
    let Value::Object(map) = tokens else {
        return Err(SealError::invalid_input(format!(
            "token bundle must be a JSON object, got {}",
            kind(tokens)
        )));
    };
    let mut bundle = map.clone();
    sanitizer.sanitize(&mut bundle);
    codec::encrypt_structured_with_version(sealer, &bundle, passphrase, version)
}

/// Decrypt a token bundle and apply the default denylist to it.
///
/// # Errors
///
/// See [`decrypt_token_bundle_with`].
pub fn decrypt_token_bundle(
    sealer: &Sealer,
    envelope: &EncryptionEnvelope,
    passphrase: &[u8],
) -> SealResult<TokenBundle> {
    decrypt_token_bundle_with(sealer, &TokenSanitizer::default(), envelope, passphrase)
}

/// Decrypt a token bundle and apply `sanitizer` to it.
///
/// # Errors
///
/// Anything [`Sealer::decrypt`] returns; [`SealError::DeserializationFailed`] if
/// the plaintext is not a JSON object.
pub fn decrypt_token_bundle_with(
    sealer: &Sealer,
    sanitizer: &TokenSanitizer,
    envelope: &EncryptionEnvelope,
    passphrase: &[u8],
) -> SealResult<TokenBundle> {
    let value: Value = codec::decrypt_structured(sealer, envelope, passphrase)?;
    let mut bundle = match value {
        Value::Object(map) => map,
        other => {
            return Err(SealError::DeserializationFailed(format!(
                "token bundle must be a JSON object, got {}",
                kind(&other)
            )))
        }
    };
    sanitizer.sanitize(&mut bundle);
    Ok(bundle)
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kdf::test_params::FAST_ARGON2ID_V2;
    use crate::kdf::{KdfRegistry, MockKeyDeriver};
    use serde_json::json;
    use std::sync::Arc;

    const PASS: &[u8] = b"token-test-passphrase";

    fn sealer() -> Sealer {
        let registry = KdfRegistry::empty();
        registry.register(FAST_ARGON2ID_V2).unwrap();
        Sealer::builder().registry(registry).build().unwrap()
    }

    #[test]
    fn round_trip_strips_code() {
        let sealer = sealer();
        let tokens = json!({
            "access_token": "ya29.a0",
            "refresh_token": "1//0g",
            "expires_at": 1_700_000_000,
            "code": "4/0AX4",
        });
        let env = encrypt_token_bundle(&sealer, &tokens, PASS).unwrap();
        let back = decrypt_token_bundle(&sealer, &env, PASS).unwrap();
        assert!(!back.contains_key("code"));
        assert_eq!(back["access_token"], "ya29.a0");
        assert_eq!(back["expires_at"], 1_700_000_000);
    }

    #[test]
    fn caller_value_is_not_mutated() {
        let sealer = sealer();
        let tokens = json!({"access_token": "a", "state": "s"});
        encrypt_token_bundle(&sealer, &tokens, PASS).unwrap();
        assert_eq!(tokens["state"], "s");
    }

    #[test]
    fn non_object_input_rejected_before_key_derivation() {
        let mut mock = MockKeyDeriver::new();
        mock.expect_derive().never();
        let registry = KdfRegistry::empty();
        registry.register_with(FAST_ARGON2ID_V2, Arc::new(mock)).unwrap();
        let sealer = Sealer::builder().registry(registry).build().unwrap();

        for bad in [json!(null), json!(["a"]), json!("token"), json!(42)] {
            let err = encrypt_token_bundle(&sealer, &bad, PASS).unwrap_err();
            assert!(matches!(err, SealError::InvalidInput(_)), "{bad}");
        }
    }

    #[test]
    fn non_object_plaintext_is_deserialization_failure() {
        let sealer = sealer();
        let env = codec::encrypt_structured(&sealer, &json!(["a", "b"]), PASS).unwrap();
        let err = decrypt_token_bundle(&sealer, &env, PASS).unwrap_err();
        assert!(matches!(err, SealError::DeserializationFailed(_)));
    }

    #[test]
    fn decrypt_applies_a_later_denylist() {
        let sealer = sealer();
        let written_with = TokenSanitizer::new(Vec::<String>::new());
        let env = encrypt_token_bundle_with(
            &sealer,
            &written_with,
            &json!({"access_token": "a", "code": "leaked"}),
            PASS,
        )
        .unwrap();

        let raw: Value = codec::decrypt_structured(&sealer, &env, PASS).unwrap();
        assert_eq!(raw["code"], "leaked");

        let back = decrypt_token_bundle(&sealer, &env, PASS).unwrap();
        assert!(!back.contains_key("code"));
    }

    #[test]
    fn wrong_passphrase_is_authentication_failure() {
        let sealer = sealer();
        let env = encrypt_token_bundle(&sealer, &json!({"access_token": "a"}), PASS).unwrap();
        assert!(matches!(
            decrypt_token_bundle(&sealer, &env, b"not-the-passphrase"),
            Err(SealError::AuthenticationFailed)
        ));
    }
}
