//! AES-256-GCM-SIV sealing and opening with associated data.
//!
//! **Algorithm choice:** AES-256-GCM-SIV (RFC 8452) is the nonce-misuse-resistant
//! variant of GCM. Every call still draws a fresh 96-bit nonce and every
//! envelope a fresh salt, so the same key/nonce pair never recurs in practice;
//! SIV limits the damage if the RNG ever misbehaves.
//!
//! **Do NOT expose a caller-supplied nonce.** Nonces are generated here and
//! nowhere else.

use aes_gcm_siv::{
    aead::{rand_core::RngCore, Aead, KeyInit, OsRng, Payload},
    Aes256GcmSiv, Nonce,
};
use common::envelope::{NONCE_LEN, SALT_LEN, TAG_LEN};
use common::{SealError, SealResult};
use zeroize::Zeroizing;

use crate::kdf::DerivedKey;

/// Output of [`seal`]: ciphertext with the tag split off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedParts {
    pub nonce: [u8; NONCE_LEN],
    pub ciphertext: Vec<u8>,
    pub tag: [u8; TAG_LEN],
}

/// Draw a fresh KDF salt from the OS CSPRNG.
pub fn random_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    salt
}

/// Encrypt `plaintext` under `key`, authenticating `aad` alongside it.
///
/// A random 96-bit nonce is generated per call via the OS CSPRNG.
///
/// # Errors
///
/// Returns [`SealError::InvalidInput`] if the AEAD refuses the plaintext
/// (only possible for inputs beyond the cipher's size limit).
pub fn seal(key: &DerivedKey, plaintext: &[u8], aad: &[u8]) -> SealResult<SealedParts> {
    let cipher = build_cipher(key)?;

    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);

    let mut combined = cipher
        .encrypt(Nonce::from_slice(&nonce), Payload { msg: plaintext, aad })
        .map_err(|_| SealError::invalid_input("plaintext could not be encrypted"))?;

    let tag_start = combined.len() - TAG_LEN;
    let mut tag = [0u8; TAG_LEN];
    tag.copy_from_slice(&combined[tag_start..]);
    combined.truncate(tag_start);

    Ok(SealedParts {
        nonce,
        ciphertext: combined,
        tag,
    })
}

/// Decrypt and verify. Every verification failure is the same
/// [`SealError::AuthenticationFailed`].
///
/// # Errors
///
/// [`SealError::MalformedEnvelope`] if `nonce` or `tag` has the wrong length;
/// [`SealError::AuthenticationFailed`] if the tag does not verify.
pub fn open(
    key: &DerivedKey,
    nonce: &[u8],
    ciphertext: &[u8],
    tag: &[u8],
    aad: &[u8],
) -> SealResult<Vec<u8>> {
    if nonce.len() != NONCE_LEN || tag.len() != TAG_LEN {
        return Err(SealError::malformed("nonce or tag has the wrong length"));
    }
    let cipher = build_cipher(key)?;

    let mut combined = Zeroizing::new(Vec::with_capacity(ciphertext.len() + TAG_LEN));
    combined.extend_from_slice(ciphertext);
    combined.extend_from_slice(tag);

    cipher
        .decrypt(
            Nonce::from_slice(nonce),
            Payload {
                msg: combined.as_slice(),
                aad,
            },
        )
        .map_err(|_| SealError::AuthenticationFailed)
}

fn build_cipher(key: &DerivedKey) -> SealResult<Aes256GcmSiv> {
    Aes256GcmSiv::new_from_slice(key.as_bytes())
        .map_err(|_| SealError::KeyDerivationFailed("derived key has invalid length".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::envelope::KEY_LEN;

    const AAD: &[u8] = b"test-context";

    fn random_key() -> DerivedKey {
        let mut bytes = [0u8; KEY_LEN];
        OsRng.fill_bytes(&mut bytes);
        DerivedKey::from_bytes(bytes)
    }

    #[test]
    fn seal_open_round_trip() {
        let key = random_key();
        let sealed = seal(&key, b"refresh-token-123", AAD).unwrap();
        assert_eq!(sealed.ciphertext.len(), b"refresh-token-123".len());
        let opened = open(&key, &sealed.nonce, &sealed.ciphertext, &sealed.tag, AAD).unwrap();
        assert_eq!(opened, b"refresh-token-123");
    }

    #[test]
    fn fresh_nonce_each_call() {
        let key = random_key();
        let a = seal(&key, b"same", AAD).unwrap();
        let b = seal(&key, b"same", AAD).unwrap();
        assert_ne!(a.nonce, b.nonce);
        assert_ne!(a.ciphertext, b.ciphertext);
    }

    #[test]
    fn wrong_key_fails_authentication() {
        let sealed = seal(&random_key(), b"secret", AAD).unwrap();
        let err = open(&random_key(), &sealed.nonce, &sealed.ciphertext, &sealed.tag, AAD)
            .unwrap_err();
        assert!(matches!(err, SealError::AuthenticationFailed));
    }

    #[test]
    fn different_aad_fails_authentication() {
        let key = random_key();
        let sealed = seal(&key, b"secret", AAD).unwrap();
        let err = open(&key, &sealed.nonce, &sealed.ciphertext, &sealed.tag, b"other-context")
            .unwrap_err();
        assert!(matches!(err, SealError::AuthenticationFailed));
    }

    #[test]
    fn tampered_tag_fails_authentication() {
        let key = random_key();
        let mut sealed = seal(&key, b"tamper me", AAD).unwrap();
        sealed.tag[0] ^= 0xFF;
        assert!(matches!(
            open(&key, &sealed.nonce, &sealed.ciphertext, &sealed.tag, AAD),
            Err(SealError::AuthenticationFailed)
        ));
    }

    #[test]
    fn short_nonce_is_malformed_not_a_panic() {
        let key = random_key();
        let sealed = seal(&key, b"x", AAD).unwrap();
        assert!(matches!(
            open(&key, &sealed.nonce[..8], &sealed.ciphertext, &sealed.tag, AAD),
            Err(SealError::MalformedEnvelope(_))
        ));
    }

    #[test]
    fn salts_are_random() {
        assert_ne!(random_salt(), random_salt());
    }
}
