//! [`KdfRegistry`]: append-only table of key versions.
//!
//! Readers resolve a version on every encrypt/decrypt, so the table lives
//! behind `arc-swap` and lookups never block. Registration copies the table,
//! inserts, and swaps the new map in.

use std::{collections::BTreeMap, fmt, sync::Arc};

use arc_swap::ArcSwap;
use common::{SealError, SealResult};
use tracing::{info, warn};

use super::{
    Argon2idDeriver, DerivedKey, KdfAlgorithm, KeyDerivationParams, KeyDeriver, ScryptDeriver,
    ARGON2ID_V2, SCRYPT_V1,
};

/// A registered version: its parameters and the strategy that runs them.
#[derive(Clone)]
pub struct KdfEntry {
    /// Immutable parameters for this version.
    pub params: KeyDerivationParams,
    deriver: Arc<dyn KeyDeriver>,
}

impl KdfEntry {
    /// Derive a key under this version's parameters.
    pub fn derive(&self, passphrase: &[u8], salt: &[u8]) -> SealResult<DerivedKey> {
        self.deriver.derive(passphrase, salt, &self.params)
    }
}

impl fmt::Debug for KdfEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KdfEntry")
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// Shared, append-only map of key version → [`KdfEntry`].
///
/// Cloning is cheap and clones share the same table.
#[derive(Clone)]
pub struct KdfRegistry {
    inner: Arc<ArcSwap<BTreeMap<u32, KdfEntry>>>,
}

impl KdfRegistry {
    /// A registry with no versions. Mostly useful for tests and custom tables.
    pub fn empty() -> Self {
        Self {
            inner: Arc::new(ArcSwap::new(Arc::new(BTreeMap::new()))),
        }
    }

    /// The builtin table: scrypt v1 and Argon2id v2.
    pub fn builtin() -> Self {
        let map: BTreeMap<u32, KdfEntry> = [SCRYPT_V1, ARGON2ID_V2]
            .into_iter()
            .map(|params| {
                let entry = KdfEntry {
                    params,
                    deriver: default_deriver(params.algorithm),
                };
                (params.version, entry)
            })
            .collect();
        Self {
            inner: Arc::new(ArcSwap::new(Arc::new(map))),
        }
    }

    /// Register a new version using the stock strategy for its algorithm.
    ///
    /// # Errors
    ///
    /// See [`KdfRegistry::register_with`].
    pub fn register(&self, params: KeyDerivationParams) -> SealResult<()> {
        self.register_with(params, default_deriver(params.algorithm))
    }

    /// Register a new version with an explicit strategy.
    ///
    /// # Errors
    ///
    /// Returns [`SealError::InvalidInput`] if the version is already registered
    /// (versions are never replaced), or the error from
    /// [`KeyDerivationParams::validate`] if the primitive rejects the parameters.
    pub fn register_with(
        &self,
        params: KeyDerivationParams,
        deriver: Arc<dyn KeyDeriver>,
    ) -> SealResult<()> {
        params.validate()?;
        if params.is_below_owasp_minimum() {
            warn!(
                key_version = params.version,
                algorithm = %params.algorithm,
                "registering KDF parameters below the OWASP minimum"
            );
        }

        let entry = KdfEntry { params, deriver };
        let mut duplicate = false;
        self.inner.rcu(|current| {
            duplicate = current.contains_key(&params.version);
            if duplicate {
                return Arc::clone(current);
            }
            let mut next = (**current).clone();
            next.insert(params.version, entry.clone());
            Arc::new(next)
        });

        if duplicate {
            return Err(SealError::invalid_input(format!(
                "key version {} is already registered",
                params.version
            )));
        }
        info!(key_version = params.version, algorithm = %params.algorithm, "registered key version");
        Ok(())
    }

    /// Look up a version. Lock-free.
    pub fn resolve(&self, version: u32) -> Option<KdfEntry> {
        self.inner.load().get(&version).cloned()
    }

    /// `true` if `version` is registered.
    pub fn contains(&self, version: u32) -> bool {
        self.inner.load().contains_key(&version)
    }

    /// All registered versions, ascending.
    pub fn versions(&self) -> Vec<u32> {
        self.inner.load().keys().copied().collect()
    }

    /// Highest registered version, if any.
    pub fn latest_version(&self) -> Option<u32> {
        self.inner.load().keys().next_back().copied()
    }

    /// Number of registered versions.
    pub fn len(&self) -> usize {
        self.inner.load().len()
    }

    /// `true` if no versions are registered.
    pub fn is_empty(&self) -> bool {
        self.inner.load().is_empty()
    }
}

impl Default for KdfRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl fmt::Debug for KdfRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KdfRegistry")
            .field("versions", &self.versions())
            .finish()
    }
}

fn default_deriver(algorithm: KdfAlgorithm) -> Arc<dyn KeyDeriver> {
    match algorithm {
        KdfAlgorithm::Argon2id => Arc::new(Argon2idDeriver),
        KdfAlgorithm::Scrypt => Arc::new(ScryptDeriver),
    }
}
