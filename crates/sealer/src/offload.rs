//! [`AsyncSealer`]: runs sealing work on tokio's blocking pool.
//!
//! Key derivation takes tens of milliseconds to seconds by design. Running it
//! on an async worker thread would stall every other task on that thread, so
//! each call here copies its inputs and hands them to `spawn_blocking`.

use std::sync::Arc;

use common::{EncryptionEnvelope, SealError, SealResult};
use serde_json::Value;
use tokio::task;
use tracing::error;
use zeroize::Zeroizing;

use crate::crypto::Sealer;
use crate::tokens::{self, TokenBundle, TokenSanitizer};

/// Async facade over a shared [`Sealer`].
///
/// Cloning is cheap; clones share the sealer and its key cache.
#[derive(Clone, Debug)]
pub struct AsyncSealer {
    inner: Arc<Sealer>,
    sanitizer: Arc<TokenSanitizer>,
}

impl AsyncSealer {
    /// Wrap `sealer`, using the default token denylist.
    pub fn new(sealer: Sealer) -> Self {
        Self::with_sanitizer(sealer, TokenSanitizer::default())
    }

    /// Wrap `sealer` with a custom token denylist.
    pub fn with_sanitizer(sealer: Sealer, sanitizer: TokenSanitizer) -> Self {
        Self {
            inner: Arc::new(sealer),
            sanitizer: Arc::new(sanitizer),
        }
    }

    /// The wrapped synchronous sealer.
    pub fn sealer(&self) -> &Sealer {
        &self.inner
    }

    /// See [`Sealer::encrypt_with_version`]. `None` uses the default version.
    pub async fn encrypt(
        &self,
        plaintext: &[u8],
        passphrase: &[u8],
        version: Option<u32>,
    ) -> SealResult<EncryptionEnvelope> {
        let plaintext = Zeroizing::new(plaintext.to_vec());
        let passphrase = Zeroizing::new(passphrase.to_vec());
        self.run(move |sealer| {
            let version = version.unwrap_or_else(|| sealer.default_version());
            sealer.encrypt_with_version(&plaintext, &passphrase, version)
        })
        .await
    }

    /// See [`Sealer::decrypt`].
    pub async fn decrypt(
        &self,
        envelope: &EncryptionEnvelope,
        passphrase: &[u8],
    ) -> SealResult<Zeroizing<Vec<u8>>> {
        let envelope = envelope.clone();
        let passphrase = Zeroizing::new(passphrase.to_vec());
        self.run(move |sealer| sealer.decrypt(&envelope, &passphrase).map(Zeroizing::new))
            .await
    }

    /// See [`Sealer::reseal`].
    pub async fn reseal(
        &self,
        envelope: &EncryptionEnvelope,
        old_passphrase: &[u8],
        new_passphrase: &[u8],
    ) -> SealResult<EncryptionEnvelope> {
        let envelope = envelope.clone();
        let old = Zeroizing::new(old_passphrase.to_vec());
        let new = Zeroizing::new(new_passphrase.to_vec());
        self.run(move |sealer| sealer.reseal(&envelope, &old, &new))
            .await
    }

    /// See [`tokens::encrypt_token_bundle_with_version`]. `None` uses the default version.
    pub async fn encrypt_token_bundle(
        &self,
        tokens: Value,
        passphrase: &[u8],
        version: Option<u32>,
    ) -> SealResult<EncryptionEnvelope> {
        let passphrase = Zeroizing::new(passphrase.to_vec());
        let sanitizer = Arc::clone(&self.sanitizer);
        self.run(move |sealer| {
            let version = version.unwrap_or_else(|| sealer.default_version());
            tokens::encrypt_token_bundle_with_version(
                sealer,
                &sanitizer,
                &tokens,
                &passphrase,
                version,
            )
        })
        .await
    }

    /// See [`tokens::decrypt_token_bundle_with`].
    pub async fn decrypt_token_bundle(
        &self,
        envelope: &EncryptionEnvelope,
        passphrase: &[u8],
    ) -> SealResult<TokenBundle> {
        let envelope = envelope.clone();
        let passphrase = Zeroizing::new(passphrase.to_vec());
        let sanitizer = Arc::clone(&self.sanitizer);
        self.run(move |sealer| {
            tokens::decrypt_token_bundle_with(sealer, &sanitizer, &envelope, &passphrase)
        })
        .await
    }

    /// `true` if `envelope` should be resealed under the default version.
    pub fn needs_upgrade(&self, envelope: &EncryptionEnvelope) -> bool {
        self.inner.needs_upgrade(envelope)
    }

    /// Purge cached derived keys.
    pub fn clear_cache(&self) {
        self.inner.clear_cache();
    }

    async fn run<T, F>(&self, f: F) -> SealResult<T>
    where
        F: FnOnce(&Sealer) -> SealResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let sealer = Arc::clone(&self.inner);
        task::spawn_blocking(move || f(&sealer))
            .await
            .map_err(|e| {
                error!(error = %e, "sealing task did not complete");
                SealError::WorkerFailed(e.to_string())
            })?
    }
}

impl From<Sealer> for AsyncSealer {
    fn from(sealer: Sealer) -> Self {
        Self::new(sealer)
    }
}
