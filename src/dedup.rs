//! Dedup/upsert engine - get-or-create keyed by content hash.
//!
//! Creation is a two-step protocol at the store boundary: attempt the insert
//! under the uniqueness constraint; on losing a concurrent race, re-query by
//! hash and adopt the winner. Either way the returned atom is verified
//! against the candidate content - a hash shared by distinct content is a
//! fatal integrity violation, never a silent merge.
//!
//! Transient store failures are retried with exponential backoff here and
//! only here, because get-or-create is idempotent; no other layer retries.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::store::{AtomStore, PendingAtom, StoreError};
use crate::{Error, Result};

/// Retry policy for transient store failures.
#[derive(Clone, Copy, Debug)]
pub struct DedupConfig {
    pub max_retries: u32,
    pub backoff_base: Duration,
}

impl Default for DedupConfig {
    fn default() -> Self {
        DedupConfig { max_retries: 3, backoff_base: Duration::from_millis(10) }
    }
}

/// Counters kept across the engine's lifetime.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DedupStats {
    /// Candidate content already present (by lookup or lost race).
    pub hits: u64,
    /// Fresh atoms created.
    pub misses: u64,
}

/// Get-or-create wrapper around a backing store.
pub struct DedupEngine<S: AtomStore> {
    store: S,
    config: DedupConfig,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<S: AtomStore> DedupEngine<S> {
    pub fn new(store: S) -> Self {
        Self::with_config(store, DedupConfig::default())
    }

    pub fn with_config(store: S, config: DedupConfig) -> Self {
        DedupEngine { store, config, hits: AtomicU64::new(0), misses: AtomicU64::new(0) }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn stats(&self) -> DedupStats {
        DedupStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    /// At-most-one atom per distinct content, across every caller.
    ///
    /// Returns the id of the already-stored atom when the content exists,
    /// otherwise inserts and returns the fresh id. Concurrent duplicate
    /// inserts collapse onto whichever writer won.
    pub fn get_or_create(&self, pending: PendingAtom) -> Result<crate::atom::AtomId> {
        let hash = pending.hash;

        if let Some(existing) = self.with_retry(|| self.store.lookup_hash(&hash))? {
            self.verify_content(existing, &pending)?;
            self.hits.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(%hash, id = %existing, "dedup hit");
            return Ok(existing);
        }

        match self.insert_with_retry(&pending) {
            Ok(id) => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(%hash, %id, "atom created");
                Ok(id)
            }
            Err(StoreError::Duplicate(winner)) => {
                // Lost the race: another writer created the same content
                // between our lookup and insert. Adopt the winner.
                self.verify_content(winner, &pending)?;
                self.hits.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(%hash, id = %winner, "dedup race lost, adopting winner");
                Ok(winner)
            }
            Err(StoreError::Unavailable(msg)) => Err(Error::StoreUnavailable(msg)),
        }
    }

    /// The stored atom must carry exactly the candidate content. Anything
    /// else means two distinct contents share a digest.
    fn verify_content(&self, id: crate::atom::AtomId, pending: &PendingAtom) -> Result<()> {
        let stored = self
            .with_retry(|| self.store.fetch(id))?
            .ok_or(Error::ReferentialIntegrity { id })?;
        if stored.kind != pending.kind {
            return Err(Error::HashCollision { hash: pending.hash });
        }
        Ok(())
    }

    fn insert_with_retry(&self, pending: &PendingAtom) -> std::result::Result<crate::atom::AtomId, StoreError> {
        let mut attempt = 0;
        loop {
            match self.store.insert_unique(pending.clone()) {
                Err(StoreError::Unavailable(msg)) if attempt < self.config.max_retries => {
                    self.sleep_backoff(attempt, &msg);
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    fn with_retry<T>(
        &self,
        op: impl Fn() -> std::result::Result<T, StoreError>,
    ) -> Result<T> {
        let mut attempt = 0;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(StoreError::Unavailable(msg)) if attempt < self.config.max_retries => {
                    self.sleep_backoff(attempt, &msg);
                    attempt += 1;
                }
                Err(StoreError::Unavailable(msg)) => return Err(Error::StoreUnavailable(msg)),
                Err(StoreError::Duplicate(id)) => {
                    // Read paths cannot produce Duplicate; a store doing so is
                    // misbehaving.
                    return Err(Error::StoreUnavailable(format!(
                        "unexpected duplicate report for {id} on read path"
                    )));
                }
            }
        }
    }

    fn sleep_backoff(&self, attempt: u32, msg: &str) {
        let delay = self.config.backoff_base * 2u32.saturating_pow(attempt);
        tracing::warn!(attempt, ?delay, "store unavailable ({msg}), backing off");
        std::thread::sleep(delay);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atom::AtomKind;
    use crate::hash;
    use crate::hilbert::HilbertIndex;
    use crate::projector::Point;
    use crate::seed::Seed;
    use crate::store::MemoryStore;

    fn pending(seed: Seed) -> PendingAtom {
        PendingAtom {
            point: Point { x: 1.0, y: 0.0, z: 0.0, m: 0.0 },
            index: HilbertIndex::default(),
            hash: hash::hash_constant(&seed),
            kind: AtomKind::Constant { seed },
        }
    }

    #[test]
    fn test_get_or_create_is_idempotent() {
        let engine = DedupEngine::new(MemoryStore::new());
        let first = engine.get_or_create(pending(Seed::from_char('q'))).unwrap();
        let second = engine.get_or_create(pending(Seed::from_char('q'))).unwrap();
        assert_eq!(first, second);
        assert_eq!(engine.store().len(), 1);
        assert_eq!(engine.stats(), DedupStats { hits: 1, misses: 1 });
    }

    #[test]
    fn test_distinct_content_distinct_atoms() {
        let engine = DedupEngine::new(MemoryStore::new());
        let a = engine.get_or_create(pending(Seed::from_char('a'))).unwrap();
        let b = engine.get_or_create(pending(Seed::from_char('b'))).unwrap();
        assert_ne!(a, b);
        assert_eq!(engine.store().len(), 2);
    }

    #[test]
    fn test_forged_duplicate_is_a_collision() {
        // Same hash, different content: the verification step must refuse to
        // merge rather than silently return the stored atom.
        let engine = DedupEngine::new(MemoryStore::new());
        engine.get_or_create(pending(Seed::from_char('a'))).unwrap();
        let mut forged = pending(Seed::from_char('b'));
        forged.hash = hash::hash_constant(&Seed::from_char('a'));
        assert!(matches!(
            engine.get_or_create(forged),
            Err(Error::HashCollision { .. })
        ));
    }
}
