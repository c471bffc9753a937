//! Subcommand implementations. Each takes its input as a string and returns
//! the text to print, so `main` owns all stdio.

use anyhow::{Context, Result};
use common::EncryptionEnvelope;
use sealer::kdf::KeyDerivationParams;
use sealer::{validate_strength, AsyncSealer, StrengthReport};
use serde::Serialize;
use tracing::{info, warn};

/// JSON printed by `check`.
#[derive(Debug, Serialize)]
pub struct CheckOutput {
    pub valid: bool,
    pub issues: Vec<String>,
}

impl From<&StrengthReport> for CheckOutput {
    fn from(report: &StrengthReport) -> Self {
        Self {
            valid: report.is_valid,
            issues: report.messages(),
        }
    }
}

/// JSON printed by `inspect`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectOutput {
    pub key_version: u32,
    pub algorithm: String,
    pub ciphertext_len: usize,
    pub salt_len: usize,
    pub nonce_len: usize,
    pub auth_tag_len: usize,
    pub needs_upgrade: bool,
    /// `None` if this build does not know the envelope's version.
    pub kdf: Option<KeyDerivationParams>,
}

/// Run the strength policy against `passphrase`.
pub fn check(passphrase: &str) -> Result<(bool, String)> {
    let report = validate_strength(passphrase);
    if !report.is_valid {
        warn!(issues = report.issues.len(), "passphrase fails strength policy");
    }
    let out = serde_json::to_string_pretty(&CheckOutput::from(&report))
        .context("failed to encode strength report")?;
    Ok((report.is_valid, out))
}

/// Seal the token bundle in `input`.
pub async fn seal(
    sealer: &AsyncSealer,
    passphrase: &[u8],
    input: &str,
    key_version: Option<u32>,
    compact: bool,
) -> Result<String> {
    let tokens: serde_json::Value =
        serde_json::from_str(input).context("stdin is not valid JSON")?;
    let envelope = sealer
        .encrypt_token_bundle(tokens, passphrase, key_version)
        .await?;
    info!(key_version = envelope.key_version, compact, "sealed token bundle");
    render(&envelope, compact)
}

/// Open the envelope in `input` and return the bundle as pretty JSON.
pub async fn open(sealer: &AsyncSealer, passphrase: &[u8], input: &str) -> Result<String> {
    let envelope = EncryptionEnvelope::parse(input)?;
    if sealer.needs_upgrade(&envelope) {
        warn!(
            key_version = envelope.key_version,
            "envelope uses an old key version; consider `sealctl reseal`"
        );
    }
    let bundle = sealer.decrypt_token_bundle(&envelope, passphrase).await?;
    serde_json::to_string_pretty(&bundle).context("failed to encode token bundle")
}

/// Describe the envelope in `input` without decrypting it.
pub fn inspect(sealer: &AsyncSealer, input: &str) -> Result<String> {
    let envelope = EncryptionEnvelope::parse(input)?;
    let out = InspectOutput {
        key_version: envelope.key_version,
        algorithm: envelope.algorithm.to_string(),
        ciphertext_len: envelope.ciphertext.len(),
        salt_len: envelope.salt.len(),
        nonce_len: envelope.nonce.len(),
        auth_tag_len: envelope.auth_tag.len(),
        needs_upgrade: sealer.needs_upgrade(&envelope),
        kdf: sealer
            .sealer()
            .registry()
            .resolve(envelope.key_version)
            .map(|entry| entry.params),
    };
    serde_json::to_string_pretty(&out).context("failed to encode envelope metadata")
}

/// Re-encrypt the envelope in `input` under the current key version.
pub async fn reseal(
    sealer: &AsyncSealer,
    old_passphrase: &[u8],
    new_passphrase: &[u8],
    input: &str,
    compact: bool,
) -> Result<String> {
    let envelope = EncryptionEnvelope::parse(input)?;
    let resealed = sealer
        .reseal(&envelope, old_passphrase, new_passphrase)
        .await?;
    info!(
        from_version = envelope.key_version,
        to_version = resealed.key_version,
        "resealed envelope"
    );
    render(&resealed, compact)
}

fn render(envelope: &EncryptionEnvelope, compact: bool) -> Result<String> {
    if compact {
        Ok(envelope.to_compact())
    } else {
        Ok(envelope.to_json()?)
    }
}
