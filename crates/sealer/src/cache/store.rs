//! [`KeyCache`]: bounded, thread-safe cache of derived keys.

use std::collections::{HashMap, VecDeque};
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use common::{SealError, SealResult};
use tracing::{debug, trace};
use zeroize::Zeroizing;

use crate::kdf::{DerivedKey, KeyDerivationParams};

/// Default number of derived keys held before the oldest is evicted.
pub const DEFAULT_CAPACITY: usize = 100;

/// Composite lookup key. Holds the passphrase itself, not a hash of the
/// derived key, so a hit still requires knowing the passphrase.
///
/// The full parameter set is part of the key, not just its version number:
/// two registries may both define a version 2 with different algorithms, and
/// sealers built on them can share one cache.
#[derive(Clone)]
struct CacheKey {
    passphrase: Zeroizing<Vec<u8>>,
    salt: Vec<u8>,
    params: KeyDerivationParams,
}

impl CacheKey {
    fn new(passphrase: &[u8], salt: &[u8], params: &KeyDerivationParams) -> Self {
        Self {
            passphrase: Zeroizing::new(passphrase.to_vec()),
            salt: salt.to_vec(),
            params: *params,
        }
    }
}

impl PartialEq for CacheKey {
    fn eq(&self, other: &Self) -> bool {
        self.params == other.params
            && self.salt == other.salt
            && self.passphrase.as_slice() == other.passphrase.as_slice()
    }
}

impl Eq for CacheKey {}

impl Hash for CacheKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.params.hash(state);
        self.salt.hash(state);
        self.passphrase.as_slice().hash(state);
    }
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<CacheKey, DerivedKey>,
    /// Insertion order, oldest first.
    order: VecDeque<CacheKey>,
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

/// Point-in-time cache counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

/// Bounded cache of derived keys keyed by `(passphrase, salt, params)`.
///
/// Eviction is FIFO by insertion time, not LRU: a cache hit does not move an
/// entry, so a hot key is evicted as soon as `capacity` newer keys have been
/// inserted after it. Tests rely on this ordering.
///
/// The lock is never held while a key is being derived. Two threads missing
/// on the same key at once both derive it; the first to finish is inserted and
/// the second result is returned without being cached again.
///
/// Cloning is cheap and clones share the same entries.
#[derive(Clone)]
pub struct KeyCache {
    inner: Arc<Mutex<CacheState>>,
    counters: Arc<Counters>,
    capacity: usize,
}

impl KeyCache {
    /// Create an empty cache holding at most [`DEFAULT_CAPACITY`] keys.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(CacheState::default())),
            counters: Arc::new(Counters::default()),
            capacity: DEFAULT_CAPACITY,
        }
    }

    /// Create an empty cache holding at most `capacity` keys.
    ///
    /// # Errors
    ///
    /// Returns [`SealError::InvalidInput`] if `capacity` is zero.
    pub fn with_capacity(capacity: usize) -> SealResult<Self> {
        if capacity == 0 {
            return Err(SealError::invalid_input("key cache capacity must be > 0"));
        }
        Ok(Self {
            capacity,
            ..Self::new()
        })
    }

    /// Return the cached key for `(passphrase, salt, params)`, or run `derive`
    /// and cache its result.
    ///
    /// # Errors
    ///
    /// Propagates the error from `derive`; failures are never cached.
    pub fn get_or_derive<F>(
        &self,
        passphrase: &[u8],
        salt: &[u8],
        params: &KeyDerivationParams,
        derive: F,
    ) -> SealResult<DerivedKey>
    where
        F: FnOnce() -> SealResult<DerivedKey>,
    {
        let key = CacheKey::new(passphrase, salt, params);

        if let Some(hit) = self.lock().entries.get(&key).cloned() {
            self.counters.hits.fetch_add(1, Ordering::Relaxed);
            trace!(key_version = params.version, "derived-key cache hit");
            return Ok(hit);
        }

        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        let derived = derive()?;

        let mut state = self.lock();
        if !state.entries.contains_key(&key) {
            while state.entries.len() >= self.capacity {
                let Some(oldest) = state.order.pop_front() else {
                    break;
                };
                state.entries.remove(&oldest);
                self.counters.evictions.fetch_add(1, Ordering::Relaxed);
                debug!(
                    key_version = oldest.params.version,
                    algorithm = %oldest.params.algorithm,
                    "evicted oldest derived key"
                );
            }
            state.order.push_back(key.clone());
            state.entries.insert(key, derived.clone());
        }
        Ok(derived)
    }

    /// `true` if a key for `(passphrase, salt, params)` is cached. Does not
    /// touch the hit/miss counters.
    pub fn contains(
        &self,
        passphrase: &[u8],
        salt: &[u8],
        params: &KeyDerivationParams,
    ) -> bool {
        self.lock()
            .entries
            .contains_key(&CacheKey::new(passphrase, salt, params))
    }

    /// Drop every cached key. Key bytes and passphrases are zeroed as they drop.
    pub fn clear(&self) {
        let mut state = self.lock();
        let purged = state.entries.len();
        state.entries.clear();
        state.order.clear();
        debug!(purged, "derived-key cache cleared");
    }

    /// Number of cached keys.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// `true` if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    /// Maximum number of cached keys.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Snapshot of the hit/miss/eviction counters.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            evictions: self.counters.evictions.load(Ordering::Relaxed),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        // Every mutation leaves the state consistent, so a poisoned lock is still usable.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for KeyCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for KeyCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Entries hold passphrases; only print sizes.
        f.debug_struct("KeyCache")
            .field("len", &self.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kdf::test_params::{FAST_ARGON2ID_V2 as V2, FAST_SCRYPT_V1};
    use crate::kdf::KdfAlgorithm;
    use common::envelope::KEY_LEN;
    use std::cell::Cell;

    fn key(byte: u8) -> DerivedKey {
        DerivedKey::from_bytes([byte; KEY_LEN])
    }

    fn salt(n: u8) -> Vec<u8> {
        vec![n; 32]
    }

    #[test]
    fn miss_then_hit() {
        let cache = KeyCache::new();
        let calls = Cell::new(0);
        for _ in 0..3 {
            let k = cache
                .get_or_derive(b"pass", &salt(1), &V2, || {
                    calls.set(calls.get() + 1);
                    Ok(key(1))
                })
                .unwrap();
            assert_eq!(k, key(1));
        }
        assert_eq!(calls.get(), 1);
        assert_eq!(
            cache.stats(),
            CacheStats {
                hits: 2,
                misses: 1,
                evictions: 0
            }
        );
    }

    #[test]
    fn every_component_of_the_key_matters() {
        let cache = KeyCache::new();
        cache.get_or_derive(b"pass", &salt(1), &V2, || Ok(key(1))).unwrap();
        assert!(cache.contains(b"pass", &salt(1), &V2));
        assert!(!cache.contains(b"pass2", &salt(1), &V2));
        assert!(!cache.contains(b"pass", &salt(2), &V2));
        assert!(!cache.contains(b"pass", &salt(1), &FAST_SCRYPT_V1));
        let same_version_other_kdf = KeyDerivationParams {
            algorithm: KdfAlgorithm::Scrypt,
            memory_cost: 4,
            ..V2
        };
        assert!(!cache.contains(b"pass", &salt(1), &same_version_other_kdf));
    }

    #[test]
    fn evicts_oldest_inserted_first() {
        let cache = KeyCache::with_capacity(2).unwrap();
        cache.get_or_derive(b"a", &salt(1), &V2, || Ok(key(1))).unwrap();
        cache.get_or_derive(b"b", &salt(1), &V2, || Ok(key(2))).unwrap();
        cache.get_or_derive(b"c", &salt(1), &V2, || Ok(key(3))).unwrap();

        assert_eq!(cache.len(), 2);
        assert!(!cache.contains(b"a", &salt(1), &V2));
        assert!(cache.contains(b"b", &salt(1), &V2));
        assert!(cache.contains(b"c", &salt(1), &V2));
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn hits_do_not_refresh_position() {
        let cache = KeyCache::with_capacity(2).unwrap();
        cache.get_or_derive(b"a", &salt(1), &V2, || Ok(key(1))).unwrap();
        cache.get_or_derive(b"b", &salt(1), &V2, || Ok(key(2))).unwrap();
        // A hit on "a" would save it under LRU; FIFO still evicts it next.
        cache.get_or_derive(b"a", &salt(1), &V2, || Ok(key(1))).unwrap();
        cache.get_or_derive(b"c", &salt(1), &V2, || Ok(key(3))).unwrap();

        assert!(!cache.contains(b"a", &salt(1), &V2));
        assert!(cache.contains(b"b", &salt(1), &V2));
    }

    #[test]
    fn evicted_entry_is_derived_again() {
        let cache = KeyCache::with_capacity(1).unwrap();
        let calls = Cell::new(0);
        let derive_a = || {
            calls.set(calls.get() + 1);
            Ok(key(1))
        };
        cache.get_or_derive(b"a", &salt(1), &V2, derive_a).unwrap();
        cache.get_or_derive(b"b", &salt(1), &V2, || Ok(key(2))).unwrap();
        cache.get_or_derive(b"a", &salt(1), &V2, derive_a).unwrap();
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn failures_are_not_cached() {
        let cache = KeyCache::new();
        let err = cache
            .get_or_derive(b"a", &salt(1), &V2, || {
                Err(SealError::KeyDerivationFailed("boom".into()))
            })
            .unwrap_err();
        assert!(matches!(err, SealError::KeyDerivationFailed(_)));
        assert!(cache.is_empty());
    }

    #[test]
    fn clear_purges_everything() {
        let cache = KeyCache::new();
        cache.get_or_derive(b"a", &salt(1), &V2, || Ok(key(1))).unwrap();
        cache.get_or_derive(b"b", &salt(2), &V2, || Ok(key(2))).unwrap();
        cache.clear();
        assert!(cache.is_empty());
        assert!(!cache.contains(b"a", &salt(1), &V2));
    }

    #[test]
    fn zero_capacity_rejected() {
        assert!(matches!(
            KeyCache::with_capacity(0),
            Err(SealError::InvalidInput(_))
        ));
    }

    #[test]
    fn clones_share_entries() {
        let cache = KeyCache::new();
        let clone = cache.clone();
        cache.get_or_derive(b"a", &salt(1), &V2, || Ok(key(1))).unwrap();
        assert!(clone.contains(b"a", &salt(1), &V2));
    }

    #[test]
    fn debug_does_not_print_passphrases() {
        let cache = KeyCache::new();
        cache
            .get_or_derive(b"hunter2-secret", &salt(1), &V2, || Ok(key(1)))
            .unwrap();
        let printed = format!("{cache:?}");
        assert!(!printed.contains("hunter2"));
        assert!(printed.contains("len: 1"));
    }

    #[test]
    fn concurrent_access_stays_bounded() {
        let cache = KeyCache::with_capacity(8).unwrap();
        let handles: Vec<_> = (0..4u8)
            .map(|t| {
                let cache = cache.clone();
                std::thread::spawn(move || {
                    for i in 0..16u8 {
                        let pass = [t, i];
                        cache.get_or_derive(&pass, &salt(i), &V2, || Ok(key(i))).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(cache.len(), 8);
    }
}
