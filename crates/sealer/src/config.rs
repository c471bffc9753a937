//! Library configuration, loaded from `TOKEN_SEAL_*` environment variables.
//!
//! Every field has a default, so an empty environment yields a working sealer.

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::cache::DEFAULT_CAPACITY;
use crate::crypto::DEFAULT_AAD_CONTEXT;
use crate::kdf::CURRENT_KEY_VERSION;

/// Environment variable prefix for [`SealerConfig`].
pub const ENV_PREFIX: &str = "TOKEN_SEAL";

/// Validated sealer configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SealerConfig {
    /// Key version used for new envelopes. Must be registered.
    #[serde(default = "default_key_version")]
    pub default_key_version: u32,

    /// Maximum number of derived keys held in memory.
    #[serde(default = "default_key_cache_capacity")]
    pub key_cache_capacity: usize,

    /// Associated data bound into every envelope.
    #[serde(default = "default_aad_context")]
    pub aad_context: String,
}

fn default_key_version() -> u32 {
    CURRENT_KEY_VERSION
}
fn default_key_cache_capacity() -> usize {
    DEFAULT_CAPACITY
}
fn default_aad_context() -> String {
    DEFAULT_AAD_CONTEXT.into()
}

impl Default for SealerConfig {
    fn default() -> Self {
        Self {
            default_key_version: default_key_version(),
            key_cache_capacity: default_key_cache_capacity(),
            aad_context: default_aad_context(),
        }
    }
}

impl SealerConfig {
    /// Load and validate configuration from `TOKEN_SEAL_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable cannot be parsed or a value is out of range.
    pub fn from_env() -> Result<Self> {
        Self::from_source(config::Environment::with_prefix(ENV_PREFIX))
    }

    fn from_source(env: config::Environment) -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(env)
            .build()
            .context("failed to build sealer configuration from environment")?;

        let c: SealerConfig = cfg
            .try_deserialize()
            .context("failed to deserialise sealer configuration")?;

        c.validate()?;
        Ok(c)
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    ///
    /// Whether the key version is actually registered is checked when the
    /// [`crate::Sealer`] is built.
    pub fn validate(&self) -> Result<()> {
        if self.default_key_version == 0 {
            anyhow::bail!("TOKEN_SEAL_DEFAULT_KEY_VERSION must be > 0");
        }
        if self.key_cache_capacity == 0 {
            anyhow::bail!("TOKEN_SEAL_KEY_CACHE_CAPACITY must be > 0");
        }
        if self.aad_context.trim().is_empty() {
            anyhow::bail!("TOKEN_SEAL_AAD_CONTEXT must not be empty");
        }
        Ok(())
    }
}
