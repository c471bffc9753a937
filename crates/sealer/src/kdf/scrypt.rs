//! scrypt strategy.
//!
//! Parameterised by a single cost factor: `memory_cost` holds log2(N), the
//! block size is fixed at [`BLOCK_SIZE`] and `parallelism` is p.

use common::{SealError, SealResult};
use scrypt::Params;

use super::{check_inputs, DerivedKey, KeyDerivationParams, KeyDeriver};

/// scrypt block size `r`.
pub const BLOCK_SIZE: u32 = 8;

/// OWASP minimum cost factor (N = 2^17 with r = 8, p = 1).
pub const OWASP_MIN_LOG_N: u32 = 17;

/// scrypt key derivation.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScryptDeriver;

impl KeyDeriver for ScryptDeriver {
    fn derive(
        &self,
        passphrase: &[u8],
        salt: &[u8],
        params: &KeyDerivationParams,
    ) -> SealResult<DerivedKey> {
        check_inputs(passphrase, salt, params)?;
        let scrypt_params = build(params)?;

        let mut key = DerivedKey::zeroed();
        scrypt::scrypt(passphrase, salt, &scrypt_params, key.as_mut_bytes())
            .map_err(|e| SealError::KeyDerivationFailed(format!("scrypt failed: {e}")))?;
        Ok(key)
    }
}

pub(crate) fn build(params: &KeyDerivationParams) -> SealResult<Params> {
    let log_n = u8::try_from(params.memory_cost).map_err(|_| {
        SealError::KeyDerivationFailed(format!(
            "scrypt cost factor out of range: {}",
            params.memory_cost
        ))
    })?;
    Params::new(log_n, BLOCK_SIZE, params.parallelism, params.output_length)
        .map_err(|e| SealError::KeyDerivationFailed(format!("invalid scrypt parameters: {e}")))
}
