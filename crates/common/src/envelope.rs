//! The [`EncryptionEnvelope`]: the only artifact token-seal hands back for persistence.
//!
//! Two lossless encodings are supported. Callers pick whichever suits their
//! storage column; both carry every field, in a fixed order.
//!
//! # JSON
//!
//! ```text
//! {"ciphertext":"<b64>","nonce":"<b64>","salt":"<b64>","authTag":"<b64>","keyVersion":2,"algorithm":"aes-256-gcm-siv"}
//! ```
//!
//! Byte fields use standard (padded) base64. Unknown keys are ignored so that
//! envelopes written by a newer release remain readable.
//!
//! # Compact
//!
//! ```text
//! ts1.<keyVersion>.<algorithm>.<b64url(salt)>.<b64url(nonce)>.<b64url(authTag)>.<b64url(ciphertext)>
//! ```
//!
//! Byte fields use base64url without padding, so `.` never appears inside a field.

use std::fmt;
use std::str::FromStr;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};

use crate::error::{SealError, SealResult};

/// Byte length of an AES-256 key (32 bytes = 256 bits).
pub const KEY_LEN: usize = 32;

/// Byte length of the per-envelope KDF salt.
pub const SALT_LEN: usize = 32;

/// Byte length of an AES-GCM-SIV nonce (12 bytes = 96 bits).
pub const NONCE_LEN: usize = 12;

/// Byte length of the AEAD authentication tag.
pub const TAG_LEN: usize = 16;

/// Prefix of the compact string encoding.
pub const COMPACT_PREFIX: &str = "ts1";

const COMPACT_PARTS: usize = 7;

/// AEAD cipher that produced an envelope.
///
/// Fixed for the lifetime of a deployment, but carried in every envelope so a
/// future cipher can be introduced without guessing what old data used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CipherAlgorithm {
    /// AES-256-GCM-SIV (RFC 8452).
    #[serde(rename = "aes-256-gcm-siv")]
    Aes256GcmSiv,
}

impl CipherAlgorithm {
    /// Identifier as written into envelopes.
    pub fn as_str(&self) -> &'static str {
        match self {
            CipherAlgorithm::Aes256GcmSiv => "aes-256-gcm-siv",
        }
    }
}

impl fmt::Display for CipherAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CipherAlgorithm {
    type Err = SealError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "aes-256-gcm-siv" => Ok(CipherAlgorithm::Aes256GcmSiv),
            other => Err(SealError::malformed(format!("unknown cipher algorithm: {other}"))),
        }
    }
}

/// Self-describing bundle of ciphertext plus everything needed to attempt decryption.
///
/// Only meaningful as a whole. Byte fields are plain vectors so that an
/// envelope read back from storage can be represented even when it is the
/// wrong shape; [`EncryptionEnvelope::validate_shape`] rejects it before any
/// key derivation happens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptionEnvelope {
    /// AEAD ciphertext, tag excluded.
    #[serde(with = "b64")]
    pub ciphertext: Vec<u8>,
    /// Per-call random nonce, [`NONCE_LEN`] bytes.
    #[serde(with = "b64")]
    pub nonce: Vec<u8>,
    /// Per-call random KDF salt, [`SALT_LEN`] bytes.
    #[serde(with = "b64")]
    pub salt: Vec<u8>,
    /// AEAD authentication tag, [`TAG_LEN`] bytes.
    #[serde(with = "b64")]
    pub auth_tag: Vec<u8>,
    /// KDF parameter set that produced the key.
    pub key_version: u32,
    /// AEAD cipher identifier.
    pub algorithm: CipherAlgorithm,
}

impl EncryptionEnvelope {
    /// Check that every field is present and has the length this deployment expects.
    ///
    /// # Errors
    ///
    /// Returns [`SealError::MalformedEnvelope`] naming the first offending field.
    pub fn validate_shape(&self) -> SealResult<()> {
        if self.ciphertext.is_empty() {
            return Err(SealError::malformed("ciphertext is empty"));
        }
        check_len("nonce", &self.nonce, NONCE_LEN)?;
        check_len("salt", &self.salt, SALT_LEN)?;
        check_len("authTag", &self.auth_tag, TAG_LEN)?;
        if self.key_version == 0 {
            return Err(SealError::malformed("keyVersion must be non-zero"));
        }
        Ok(())
    }

    /// Encode as a JSON object (see module docs).
    ///
    /// # Errors
    ///
    /// Returns [`SealError::MalformedEnvelope`] if serialisation fails.
    pub fn to_json(&self) -> SealResult<String> {
        serde_json::to_string(self)
            .map_err(|e| SealError::malformed(format!("failed to encode envelope: {e}")))
    }

    /// Decode the JSON encoding.
    ///
    /// # Errors
    ///
    /// Returns [`SealError::MalformedEnvelope`] on missing fields, bad base64,
    /// or an unknown algorithm identifier.
    pub fn from_json(s: &str) -> SealResult<Self> {
        serde_json::from_str(s).map_err(|e| SealError::malformed(format!("invalid envelope JSON: {e}")))
    }

    /// Encode in the compact `ts1.` string form.
    pub fn to_compact(&self) -> String {
        format!(
            "{}.{}.{}.{}.{}.{}.{}",
            COMPACT_PREFIX,
            self.key_version,
            self.algorithm,
            URL_SAFE_NO_PAD.encode(&self.salt),
            URL_SAFE_NO_PAD.encode(&self.nonce),
            URL_SAFE_NO_PAD.encode(&self.auth_tag),
            URL_SAFE_NO_PAD.encode(&self.ciphertext),
        )
    }

    /// Decode either encoding, choosing by the first non-blank character.
    ///
    /// # Errors
    ///
    /// Returns [`SealError::MalformedEnvelope`] if neither encoding parses.
    pub fn parse(s: &str) -> SealResult<Self> {
        let trimmed = s.trim();
        if trimmed.starts_with('{') {
            Self::from_json(trimmed)
        } else {
            trimmed.parse()
        }
    }
}

impl fmt::Display for EncryptionEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_compact())
    }
}

impl FromStr for EncryptionEnvelope {
    type Err = SealError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('.').collect();
        if parts.len() != COMPACT_PARTS || parts[0] != COMPACT_PREFIX {
            return Err(SealError::malformed(format!(
                "expected {COMPACT_PREFIX}.<version>.<algorithm>.<salt>.<nonce>.<tag>.<ciphertext>"
            )));
        }
        let key_version = parts[1]
            .parse::<u32>()
            .map_err(|_| SealError::malformed("keyVersion is not an unsigned integer"))?;
        let algorithm = parts[2].parse::<CipherAlgorithm>()?;

        Ok(Self {
            key_version,
            algorithm,
            salt: decode_part("salt", parts[3])?,
            nonce: decode_part("nonce", parts[4])?,
            auth_tag: decode_part("authTag", parts[5])?,
            ciphertext: decode_part("ciphertext", parts[6])?,
        })
    }
}

fn check_len(field: &str, bytes: &[u8], expected: usize) -> SealResult<()> {
    if bytes.len() != expected {
        return Err(SealError::malformed(format!(
            "{field} must be {expected} bytes, got {}",
            bytes.len()
        )));
    }
    Ok(())
}

fn decode_part(field: &str, part: &str) -> SealResult<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(part)
        .map_err(|_| SealError::malformed(format!("{field} is not valid base64url")))
}

/// Serde adapter: `Vec<u8>` <-> standard base64 string.
mod b64 {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        STANDARD.decode(s.as_bytes()).map_err(serde::de::Error::custom)
    }
}
