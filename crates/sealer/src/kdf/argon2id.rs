//! Argon2id strategy.

use argon2::{Algorithm, Argon2, Params, Version};
use common::{SealError, SealResult};

use super::{check_inputs, DerivedKey, KeyDerivationParams, KeyDeriver};

/// OWASP minimum memory cost for Argon2id (19 MiB).
pub const OWASP_MIN_MEMORY_KIB: u32 = 19 * 1024;

/// OWASP minimum number of passes at the minimum memory cost.
pub const OWASP_MIN_TIME_COST: u32 = 2;

/// Argon2id v0x13 key derivation.
#[derive(Debug, Clone, Copy, Default)]
pub struct Argon2idDeriver;

impl KeyDeriver for Argon2idDeriver {
    fn derive(
        &self,
        passphrase: &[u8],
        salt: &[u8],
        params: &KeyDerivationParams,
    ) -> SealResult<DerivedKey> {
        check_inputs(passphrase, salt, params)?;
        let argon2 = build(params)?;

        let mut key = DerivedKey::zeroed();
        argon2
            .hash_password_into(passphrase, salt, key.as_mut_bytes())
            .map_err(|e| SealError::KeyDerivationFailed(format!("Argon2id hashing failed: {e}")))?;
        Ok(key)
    }
}

/// Build an Argon2id context, rejecting parameter combinations the primitive refuses.
pub(crate) fn build(params: &KeyDerivationParams) -> SealResult<Argon2<'static>> {
    let p = Params::new(
        params.memory_cost,
        params.time_cost,
        params.parallelism,
        Some(params.output_length),
    )
    .map_err(|e| SealError::KeyDerivationFailed(format!("invalid Argon2id parameters: {e}")))?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, p))
}
