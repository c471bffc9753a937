//! Passphrase key derivation: two memory-hard strategies behind one trait, plus
//! an append-only registry mapping key versions to parameter sets.
//!
//! # Versions
//!
//! | version | strategy | parameters |
//! |---------|----------|------------|
//! | 1 | scrypt | log2(N) = 17, r = 8, p = 1 |
//! | 2 | Argon2id | 64 MiB, t = 3, p = 4 |
//!
//! Every envelope records the version its key was derived under. A version's
//! parameters never change once registered, otherwise old envelopes would
//! silently stop decrypting.
//!
//! # Module invariants
//!
//! - Derivation is deterministic: the same `(passphrase, salt, version)` always
//!   yields the same key bytes.
//! - A primitive error is surfaced as [`SealError::KeyDerivationFailed`]; there is
//!   no fallback to weaker parameters.

pub mod argon2id;
pub mod registry;
pub mod scrypt;

pub use argon2id::Argon2idDeriver;
pub use registry::{KdfEntry, KdfRegistry};
pub use self::scrypt::ScryptDeriver;

use std::fmt;

use common::envelope::{KEY_LEN, SALT_LEN};
use common::{SealError, SealResult};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Key version used for new envelopes unless configured otherwise.
pub const CURRENT_KEY_VERSION: u32 = 2;

/// Legacy scrypt parameter set.
pub const SCRYPT_V1: KeyDerivationParams = KeyDerivationParams {
    version: 1,
    algorithm: KdfAlgorithm::Scrypt,
    memory_cost: 17,
    time_cost: 1,
    parallelism: 1,
    output_length: KEY_LEN,
};

/// Current Argon2id parameter set.
pub const ARGON2ID_V2: KeyDerivationParams = KeyDerivationParams {
    version: 2,
    algorithm: KdfAlgorithm::Argon2id,
    memory_cost: 64 * 1024,
    time_cost: 3,
    parallelism: 4,
    output_length: KEY_LEN,
};

/// Memory-hard function family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KdfAlgorithm {
    /// Argon2id, version 0x13. GPU-resistant; preferred for new versions.
    Argon2id,
    /// scrypt. Cost factor only; kept for deployments without Argon2.
    Scrypt,
}

impl fmt::Display for KdfAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KdfAlgorithm::Argon2id => f.write_str("argon2id"),
            KdfAlgorithm::Scrypt => f.write_str("scrypt"),
        }
    }
}

/// Immutable parameter set for one key version.
///
/// Interpretation per algorithm:
///
/// | field | Argon2id | scrypt |
/// |-------|----------|--------|
/// | `memory_cost` | memory in KiB | cost factor log2(N); r is fixed at 8 |
/// | `time_cost` | passes | unused |
/// | `parallelism` | lanes | p |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyDerivationParams {
    pub version: u32,
    pub algorithm: KdfAlgorithm,
    pub memory_cost: u32,
    pub time_cost: u32,
    pub parallelism: u32,
    pub output_length: usize,
}

impl KeyDerivationParams {
    /// Check that the underlying primitive accepts these parameters.
    ///
    /// # Errors
    ///
    /// [`SealError::InvalidInput`] for a zero version or an output length other
    /// than [`KEY_LEN`]; [`SealError::KeyDerivationFailed`] if the primitive
    /// rejects the combination.
    pub fn validate(&self) -> SealResult<()> {
        if self.version == 0 {
            return Err(SealError::invalid_input("key version must be non-zero"));
        }
        if self.output_length != KEY_LEN {
            return Err(SealError::invalid_input(format!(
                "output length must be {KEY_LEN} bytes, got {}",
                self.output_length
            )));
        }
        match self.algorithm {
            KdfAlgorithm::Argon2id => argon2id::build(self).map(|_| ()),
            KdfAlgorithm::Scrypt => self::scrypt::build(self).map(|_| ()),
        }
    }

    /// `true` if these parameters fall below the OWASP password-storage minimums.
    pub fn is_below_owasp_minimum(&self) -> bool {
        match self.algorithm {
            KdfAlgorithm::Argon2id => {
                self.memory_cost < argon2id::OWASP_MIN_MEMORY_KIB
                    || self.time_cost < argon2id::OWASP_MIN_TIME_COST
            }
            KdfAlgorithm::Scrypt => self.memory_cost < self::scrypt::OWASP_MIN_LOG_N,
        }
    }
}

/// A derived 256-bit key. Zeroed on drop; never printed.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey([u8; KEY_LEN]);

impl DerivedKey {
    /// Wrap raw key bytes.
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Borrow the raw key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    fn zeroed() -> Self {
        Self([0u8; KEY_LEN])
    }

    fn as_mut_bytes(&mut self) -> &mut [u8; KEY_LEN] {
        &mut self.0
    }
}

impl fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DerivedKey([REDACTED])")
    }
}

/// One key-derivation strategy.
///
/// Implementations must be deterministic and must not cache; caching is the
/// job of [`crate::cache::KeyCache`].
#[cfg_attr(test, mockall::automock)]
pub trait KeyDeriver: Send + Sync {
    /// Derive [`KEY_LEN`] bytes from `passphrase` and `salt` under `params`.
    ///
    /// # Errors
    ///
    /// [`SealError::InvalidInput`] for an empty passphrase or a salt that is not
    /// [`SALT_LEN`] bytes; [`SealError::KeyDerivationFailed`] if the primitive errors.
    fn derive(
        &self,
        passphrase: &[u8],
        salt: &[u8],
        params: &KeyDerivationParams,
    ) -> SealResult<DerivedKey>;
}

/// Input checks shared by both strategies.
fn check_inputs(passphrase: &[u8], salt: &[u8], params: &KeyDerivationParams) -> SealResult<()> {
    if passphrase.is_empty() {
        return Err(SealError::invalid_input("passphrase must not be empty"));
    }
    if salt.len() != SALT_LEN {
        return Err(SealError::invalid_input(format!(
            "salt must be {SALT_LEN} bytes, got {}",
            salt.len()
        )));
    }
    if params.output_length != KEY_LEN {
        return Err(SealError::invalid_input(format!(
            "output length must be {KEY_LEN} bytes, got {}",
            params.output_length
        )));
    }
    Ok(())
}
