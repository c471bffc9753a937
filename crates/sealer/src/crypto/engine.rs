//! [`Sealer`]: passphrase in, [`EncryptionEnvelope`] out, and back.

use std::sync::Arc;

use common::{CipherAlgorithm, EncryptionEnvelope, SealError, SealResult};
use tracing::debug;
use zeroize::Zeroizing;

use super::cipher;
use crate::cache::KeyCache;
use crate::config::SealerConfig;
use crate::kdf::{DerivedKey, KdfEntry, KdfRegistry, CURRENT_KEY_VERSION};

/// Associated data bound into every envelope unless a deployment overrides it.
///
/// Independent of key version, so re-keying never changes what an envelope is for.
pub const DEFAULT_AAD_CONTEXT: &str = "token-seal/oauth-token-bundle";

/// The only cipher this release writes.
pub const ALGORITHM: CipherAlgorithm = CipherAlgorithm::Aes256GcmSiv;

/// Authenticated encryption engine.
///
/// Holds the version registry, the derived-key cache, the version used for new
/// envelopes, and the AAD context. Apart from the cache it is stateless;
/// clones share both the cache and the registry.
#[derive(Clone, Debug)]
pub struct Sealer {
    registry: KdfRegistry,
    cache: KeyCache,
    default_version: u32,
    aad_context: Arc<str>,
}

impl Sealer {
    /// Builtin registry, default-sized cache, [`CURRENT_KEY_VERSION`], [`DEFAULT_AAD_CONTEXT`].
    pub fn new() -> Self {
        Self {
            registry: KdfRegistry::builtin(),
            cache: KeyCache::new(),
            default_version: CURRENT_KEY_VERSION,
            aad_context: Arc::from(DEFAULT_AAD_CONTEXT),
        }
    }

    /// Start building a sealer with a custom registry, cache, version or context.
    pub fn builder() -> SealerBuilder {
        SealerBuilder::default()
    }

    /// Build a sealer from loaded configuration, using the builtin registry.
    ///
    /// # Errors
    ///
    /// Returns [`SealError::InvalidInput`] if the configured default version is
    /// not registered, the cache capacity is zero, or the context is empty.
    pub fn from_config(cfg: &SealerConfig) -> SealResult<Self> {
        Self::builder()
            .cache(KeyCache::with_capacity(cfg.key_cache_capacity)?)
            .default_version(cfg.default_key_version)
            .aad_context(cfg.aad_context.clone())
            .build()
    }

    /// Encrypt under the default key version.
    ///
    /// # Errors
    ///
    /// See [`Sealer::encrypt_with_version`].
    pub fn encrypt(&self, plaintext: &[u8], passphrase: &[u8]) -> SealResult<EncryptionEnvelope> {
        self.encrypt_with_version(plaintext, passphrase, self.default_version)
    }

    /// Encrypt under an explicit key version.
    ///
    /// A fresh salt and nonce are generated on every call, including retries.
    ///
    /// # Errors
    ///
    /// [`SealError::InvalidInput`] for empty plaintext, empty passphrase, or an
    /// unregistered version; [`SealError::KeyDerivationFailed`] if the KDF errors.
    pub fn encrypt_with_version(
        &self,
        plaintext: &[u8],
        passphrase: &[u8],
        version: u32,
    ) -> SealResult<EncryptionEnvelope> {
        if plaintext.is_empty() {
            return Err(SealError::invalid_input("plaintext must not be empty"));
        }
        if passphrase.is_empty() {
            return Err(SealError::invalid_input("passphrase must not be empty"));
        }
        let entry = self
            .registry
            .resolve(version)
            .ok_or_else(|| SealError::invalid_input(format!("unknown key version {version}")))?;

        let salt = cipher::random_salt();
        let key = self.key_for(&entry, passphrase, &salt)?;
        let sealed = cipher::seal(&key, plaintext, self.aad_context.as_bytes())?;

        debug!(key_version = version, algorithm = %ALGORITHM, "sealed envelope");
        Ok(EncryptionEnvelope {
            ciphertext: sealed.ciphertext,
            nonce: sealed.nonce.to_vec(),
            salt: salt.to_vec(),
            auth_tag: sealed.tag.to_vec(),
            key_version: version,
            algorithm: ALGORITHM,
        })
    }

    /// Decrypt an envelope. Does not modify it.
    ///
    /// # Errors
    ///
    /// [`SealError::MalformedEnvelope`] if the envelope is the wrong shape or
    /// names an unregistered version; [`SealError::InvalidInput`] for an empty
    /// passphrase; [`SealError::AuthenticationFailed`] for a wrong passphrase,
    /// corruption, or tampering (indistinguishably).
    pub fn decrypt(&self, envelope: &EncryptionEnvelope, passphrase: &[u8]) -> SealResult<Vec<u8>> {
        envelope.validate_shape()?;
        if passphrase.is_empty() {
            return Err(SealError::invalid_input("passphrase must not be empty"));
        }
        let entry = self.registry.resolve(envelope.key_version).ok_or_else(|| {
            SealError::malformed(format!("unknown key version {}", envelope.key_version))
        })?;

        let key = self.key_for(&entry, passphrase, &envelope.salt)?;
        let plaintext = cipher::open(
            &key,
            &envelope.nonce,
            &envelope.ciphertext,
            &envelope.auth_tag,
            self.aad_context.as_bytes(),
        )?;

        debug!(key_version = envelope.key_version, "opened envelope");
        Ok(plaintext)
    }

    /// `true` if `envelope` was written under a version other than the default.
    pub fn needs_upgrade(&self, envelope: &EncryptionEnvelope) -> bool {
        envelope.key_version != self.default_version
    }

    /// Decrypt with `old_passphrase` and re-encrypt under the default version
    /// with `new_passphrase`. Pass the same passphrase twice to migrate versions only.
    ///
    /// The input envelope is left untouched; the caller persists the result.
    ///
    /// # Errors
    ///
    /// Any error from [`Sealer::decrypt`] or [`Sealer::encrypt`].
    pub fn reseal(
        &self,
        envelope: &EncryptionEnvelope,
        old_passphrase: &[u8],
        new_passphrase: &[u8],
    ) -> SealResult<EncryptionEnvelope> {
        let plaintext = Zeroizing::new(self.decrypt(envelope, old_passphrase)?);
        let resealed = self.encrypt(&plaintext, new_passphrase)?;
        debug!(
            from_version = envelope.key_version,
            to_version = resealed.key_version,
            "resealed envelope"
        );
        Ok(resealed)
    }

    /// Purge every cached derived key.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Version used for new envelopes.
    pub fn default_version(&self) -> u32 {
        self.default_version
    }

    /// AAD context bound into every envelope.
    pub fn aad_context(&self) -> &str {
        &self.aad_context
    }

    /// The version registry.
    pub fn registry(&self) -> &KdfRegistry {
        &self.registry
    }

    /// The derived-key cache.
    pub fn cache(&self) -> &KeyCache {
        &self.cache
    }

    fn key_for(&self, entry: &KdfEntry, passphrase: &[u8], salt: &[u8]) -> SealResult<DerivedKey> {
        self.cache
            .get_or_derive(passphrase, salt, &entry.params, || {
                entry.derive(passphrase, salt)
            })
    }
}

impl Default for Sealer {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for [`Sealer`].
#[derive(Debug, Default)]
pub struct SealerBuilder {
    registry: Option<KdfRegistry>,
    cache: Option<KeyCache>,
    default_version: Option<u32>,
    aad_context: Option<String>,
}

impl SealerBuilder {
    pub fn registry(mut self, registry: KdfRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn cache(mut self, cache: KeyCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn default_version(mut self, version: u32) -> Self {
        self.default_version = Some(version);
        self
    }

    pub fn aad_context(mut self, context: impl Into<String>) -> Self {
        self.aad_context = Some(context.into());
        self
    }

    /// Validate and build.
    ///
    /// Without an explicit default version, the registry's latest version is used.
    ///
    /// # Errors
    ///
    /// Returns [`SealError::InvalidInput`] if the registry is empty, the default
    /// version is not registered, or the context is blank.
    pub fn build(self) -> SealResult<Sealer> {
        let registry = self.registry.unwrap_or_else(KdfRegistry::builtin);
        let default_version = match self.default_version {
            Some(v) => v,
            None => registry
                .latest_version()
                .ok_or_else(|| SealError::invalid_input("KDF registry is empty"))?,
        };
        if !registry.contains(default_version) {
            return Err(SealError::invalid_input(format!(
                "default key version {default_version} is not registered"
            )));
        }
        let aad_context = self
            .aad_context
            .unwrap_or_else(|| DEFAULT_AAD_CONTEXT.to_owned());
        if aad_context.trim().is_empty() {
            return Err(SealError::invalid_input("AAD context must not be empty"));
        }

        Ok(Sealer {
            registry,
            cache: self.cache.unwrap_or_default(),
            default_version,
            aad_context: Arc::from(aad_context),
        })
    }
}
