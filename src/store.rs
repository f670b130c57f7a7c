//! Store boundary - the persistence collaborator's contract, plus the
//! in-memory reference implementation.
//!
//! The substrate core needs four capabilities from a backing store: equality
//! lookup on content hash, uniqueness-guarded insert, fetch by id, and a
//! range scan over the Hilbert index. Durable backends live outside this
//! crate; [`MemoryStore`] is the reference implementation used by tests and
//! the CLI, built as a flat arena with derived lookup maps.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use crate::atom::{Atom, AtomId, AtomKind};
use crate::hash::ContentHash;
use crate::hilbert::HilbertIndex;
use crate::projector::Point;

/// Store-level failures. `Duplicate` is the uniqueness constraint doing its
/// job and is handled inside the dedup engine; `Unavailable` is transient.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("content hash already present as {0}")]
    Duplicate(AtomId),
}

/// An atom that has been fully computed but not yet inserted: everything but
/// the surrogate id, which the store issues.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PendingAtom {
    pub point: Point,
    pub index: HilbertIndex,
    pub hash: ContentHash,
    pub kind: AtomKind,
}

/// Persistence collaborator contract.
///
/// Implementations must treat `insert_unique` as racy: two writers may
/// compute the same content concurrently, and exactly one insert wins. The
/// loser observes `StoreError::Duplicate` carrying the winner's id.
pub trait AtomStore {
    fn lookup_hash(&self, hash: &ContentHash) -> Result<Option<AtomId>, StoreError>;

    fn fetch(&self, id: AtomId) -> Result<Option<Atom>, StoreError>;

    fn insert_unique(&self, atom: PendingAtom) -> Result<AtomId, StoreError>;

    /// Ids of atoms whose Hilbert index falls in `lo..=hi`, in index order.
    fn range(&self, lo: HilbertIndex, hi: HilbertIndex) -> Result<Vec<AtomId>, StoreError>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Default)]
struct StoreInner {
    arena: Vec<Atom>,
    by_hash: HashMap<ContentHash, AtomId>,
    by_index: BTreeMap<HilbertIndex, Vec<AtomId>>,
}

/// In-memory reference store: flat arena of records, a hash map enforcing the
/// content-hash uniqueness constraint, and an ordered Hilbert-index map
/// backing range scans.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<StoreInner>,
}

/// Serializable image of a store: just the arena. The lookup maps are
/// derived data and are rebuilt on import.
#[derive(Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub atoms: Vec<Atom>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clone the arena out for snapshot serialization.
    pub fn export(&self) -> Result<StoreSnapshot, StoreError> {
        let inner = self.inner.read().map_err(poisoned)?;
        Ok(StoreSnapshot { atoms: inner.arena.clone() })
    }

    /// Rebuild a store from a snapshot, re-deriving both lookup maps.
    pub fn import(snapshot: StoreSnapshot) -> Self {
        let mut inner = StoreInner { arena: snapshot.atoms, ..Default::default() };
        for atom in &inner.arena {
            inner.by_hash.insert(atom.hash, atom.id);
            inner.by_index.entry(atom.index).or_default().push(atom.id);
        }
        MemoryStore { inner: RwLock::new(inner) }
    }

    /// Count of constant atoms (diagnostics).
    pub fn constant_count(&self) -> usize {
        self.inner
            .read()
            .map(|inner| inner.arena.iter().filter(|a| a.is_constant()).count())
            .unwrap_or(0)
    }
}

fn poisoned<T>(_: std::sync::PoisonError<T>) -> StoreError {
    StoreError::Unavailable("store lock poisoned".into())
}

impl AtomStore for MemoryStore {
    fn lookup_hash(&self, hash: &ContentHash) -> Result<Option<AtomId>, StoreError> {
        let inner = self.inner.read().map_err(poisoned)?;
        Ok(inner.by_hash.get(hash).copied())
    }

    fn fetch(&self, id: AtomId) -> Result<Option<Atom>, StoreError> {
        let inner = self.inner.read().map_err(poisoned)?;
        Ok(inner.arena.get(id.0 as usize).cloned())
    }

    fn insert_unique(&self, atom: PendingAtom) -> Result<AtomId, StoreError> {
        let mut inner = self.inner.write().map_err(poisoned)?;
        if let Some(existing) = inner.by_hash.get(&atom.hash) {
            return Err(StoreError::Duplicate(*existing));
        }
        let id = AtomId(inner.arena.len() as u64);
        inner.by_hash.insert(atom.hash, id);
        inner.by_index.entry(atom.index).or_default().push(id);
        inner.arena.push(Atom {
            id,
            point: atom.point,
            index: atom.index,
            hash: atom.hash,
            kind: atom.kind,
        });
        Ok(id)
    }

    fn range(&self, lo: HilbertIndex, hi: HilbertIndex) -> Result<Vec<AtomId>, StoreError> {
        let inner = self.inner.read().map_err(poisoned)?;
        Ok(inner
            .by_index
            .range(lo..=hi)
            .flat_map(|(_, ids)| ids.iter().copied())
            .collect())
    }

    fn len(&self) -> usize {
        self.inner.read().map(|inner| inner.arena.len()).unwrap_or(0)
    }
}
