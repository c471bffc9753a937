//! Configuration loading and validation for `sealctl`.
//!
//! Passphrases come from the environment rather than argv so they never show
//! up in shell history or `ps` output.

use std::fmt;

use anyhow::{Context, Result};
use serde::Deserialize;
use zeroize::Zeroizing;

/// Environment variable prefix for [`Config`].
pub const ENV_PREFIX: &str = "SEALCTL";

/// Validated `sealctl` configuration.
#[derive(Clone, Deserialize)]
pub struct Config {
    /// Passphrase used to seal and open envelopes. Required by every command
    /// except `inspect`.
    #[serde(default)]
    pub passphrase: Option<Zeroizing<String>>,

    /// Passphrase for `reseal` output. Defaults to [`Config::passphrase`].
    #[serde(default)]
    pub new_passphrase: Option<Zeroizing<String>>,

    /// Tracing log level.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".into()
}

impl Config {
    /// Load and validate configuration from `SEALCTL_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_source(config::Environment::with_prefix(ENV_PREFIX))
    }

    fn from_source(env: config::Environment) -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(env)
            .build()
            .context("failed to build sealctl configuration")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise sealctl configuration")?;

        c.validate()?;
        Ok(c)
    }

    fn validate(&self) -> Result<()> {
        if self.log_level.trim().is_empty() {
            anyhow::bail!("SEALCTL_LOG_LEVEL must not be empty");
        }
        if matches!(&self.new_passphrase, Some(p) if p.is_empty()) {
            anyhow::bail!("SEALCTL_NEW_PASSPHRASE must not be empty when set");
        }
        Ok(())
    }

    /// The configured passphrase, or an error naming the variable to set.
    pub fn passphrase(&self) -> Result<&[u8]> {
        match &self.passphrase {
            Some(p) if !p.is_empty() => Ok(p.as_bytes()),
            _ => anyhow::bail!("SEALCTL_PASSPHRASE is required and must not be empty"),
        }
    }

    /// Passphrase for resealed output: `SEALCTL_NEW_PASSPHRASE` if set, else
    /// the current passphrase.
    pub fn new_passphrase(&self) -> Result<&[u8]> {
        match &self.new_passphrase {
            Some(p) => Ok(p.as_bytes()),
            None => self.passphrase(),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |p: &Option<Zeroizing<String>>| p.as_ref().map(|_| "[REDACTED]");
        f.debug_struct("Config")
            .field("passphrase", &redact(&self.passphrase))
            .field("new_passphrase", &redact(&self.new_passphrase))
            .field("log_level", &self.log_level)
            .finish()
    }
}
