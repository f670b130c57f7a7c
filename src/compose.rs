//! Composition building - run-length compression and bottom-up assembly.
//!
//! A composition may only reference children that already exist, which is
//! what makes its Merkle hash well-defined; the builder fetches every child
//! before hashing and fails with a referential-integrity error on any id the
//! store does not know.

use crate::atom::{AtomId, AtomKind, ChildRef};
use crate::dedup::DedupEngine;
use crate::hash;
use crate::hilbert::{self, HilbertConfig};
use crate::projector::Point;
use crate::store::{AtomStore, PendingAtom};
use crate::{Error, Result};

/// Collapse maximal runs of identical ids into `(refs, multiplicities)`.
///
/// # Examples
///
/// ```
/// use atomweave::{compose, AtomId};
///
/// let h = AtomId(0);
/// let e = AtomId(1);
/// let l = AtomId(2);
/// let o = AtomId(3);
/// let (refs, mults) = compose::rle_compress(&[h, e, l, l, o]);
/// assert_eq!(refs, vec![h, e, l, o]);
/// assert_eq!(mults, vec![1, 1, 2, 1]);
/// ```
pub fn rle_compress(ids: &[AtomId]) -> (Vec<AtomId>, Vec<u32>) {
    let mut refs = Vec::new();
    let mut mults: Vec<u32> = Vec::new();
    for &id in ids {
        match refs.last() {
            Some(&last) if last == id => *mults.last_mut().expect("parallel arrays") += 1,
            _ => {
                refs.push(id);
                mults.push(1);
            }
        }
    }
    (refs, mults)
}

/// Inverse of [`rle_compress`].
pub fn rle_expand(refs: &[AtomId], mults: &[u32]) -> Result<Vec<AtomId>> {
    validate_parallel(refs, mults, false)?;
    let mut out = Vec::with_capacity(mults.iter().map(|&m| m as usize).sum());
    for (&id, &m) in refs.iter().zip(mults) {
        for _ in 0..m {
            out.push(id);
        }
    }
    Ok(out)
}

fn validate_parallel(refs: &[AtomId], mults: &[u32], require_nonempty: bool) -> Result<()> {
    if refs.len() != mults.len() {
        return Err(Error::InvalidInput(format!(
            "child list length {} != multiplicity list length {}",
            refs.len(),
            mults.len()
        )));
    }
    if require_nonempty && refs.is_empty() {
        return Err(Error::InvalidInput("empty child sequence".into()));
    }
    if mults.iter().any(|&m| m == 0) {
        return Err(Error::InvalidInput("zero multiplicity".into()));
    }
    Ok(())
}

/// Compose an ordered sequence of existing atoms into one atom.
///
/// The sequence is run-length compressed first. Singleton policy: a sequence
/// that collapses to one reference with multiplicity 1 is represented as the
/// child itself - no trivial wrapper atom is minted. This policy is applied
/// consistently by every caller in the crate, since it participates in
/// content identity.
pub fn compose<S: AtomStore>(
    engine: &DedupEngine<S>,
    cfg: &HilbertConfig,
    ids: &[AtomId],
) -> Result<AtomId> {
    if ids.is_empty() {
        return Err(Error::InvalidInput("empty child sequence".into()));
    }
    let (refs, mults) = rle_compress(ids);
    compose_rle(engine, cfg, &refs, &mults)
}

/// Compose from pre-compressed `(refs, multiplicities)` arrays.
///
/// This is the raw form of [`compose`] for callers that carry explicit
/// multiplicities (edges, re-ingested compositions). The same singleton
/// policy applies.
pub fn compose_rle<S: AtomStore>(
    engine: &DedupEngine<S>,
    cfg: &HilbertConfig,
    refs: &[AtomId],
    mults: &[u32],
) -> Result<AtomId> {
    validate_parallel(refs, mults, true)?;
    if refs.len() == 1 && mults[0] == 1 {
        return Ok(refs[0]);
    }

    let mut children = Vec::with_capacity(refs.len());
    let mut child_hashes = Vec::with_capacity(refs.len());
    let mut centroid = Point { x: 0.0, y: 0.0, z: 0.0, m: 0.0 };
    let mut total_weight = 0.0;

    for (&id, &multiplicity) in refs.iter().zip(mults) {
        let atom = engine
            .store()
            .fetch(id)?
            .ok_or(Error::ReferentialIntegrity { id })?;
        let w = f64::from(multiplicity);
        centroid.x += atom.point.x * w;
        centroid.y += atom.point.y * w;
        centroid.z += atom.point.z * w;
        centroid.m += atom.point.m * w;
        total_weight += w;
        child_hashes.push((atom.hash, multiplicity));
        children.push(ChildRef { id, is_constant: atom.is_constant(), multiplicity });
    }

    // Derived point: multiplicity-weighted centroid. Deliberately not
    // re-normalized onto the sphere surface; composition points are interior.
    centroid.x /= total_weight;
    centroid.y /= total_weight;
    centroid.z /= total_weight;
    centroid.m /= total_weight;

    let index = hilbert::to_index(&centroid, cfg)?;
    let hash = hash::hash_composition(&child_hashes);
    engine.get_or_create(PendingAtom {
        point: centroid,
        index,
        hash,
        kind: AtomKind::Composition { children },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::substrate::Substrate;
    use crate::Seed;

    #[test]
    fn test_rle_round_trip() {
        let seq: Vec<AtomId> = [0u64, 0, 1, 2, 2, 2, 3].iter().map(|&n| AtomId(n)).collect();
        let (refs, mults) = rle_compress(&seq);
        assert_eq!(mults, vec![2, 1, 3, 1]);
        assert_eq!(rle_expand(&refs, &mults).unwrap(), seq);
    }

    #[test]
    fn test_rle_empty_and_single() {
        let (refs, mults) = rle_compress(&[]);
        assert!(refs.is_empty() && mults.is_empty());
        assert_eq!(rle_expand(&refs, &mults).unwrap(), Vec::<AtomId>::new());

        let (refs, mults) = rle_compress(&[AtomId(9)]);
        assert_eq!((refs.as_slice(), mults.as_slice()), ([AtomId(9)].as_slice(), [1u32].as_slice()));
    }

    #[test]
    fn test_rle_rejects_mismatched_arrays() {
        assert!(rle_expand(&[AtomId(1)], &[1, 2]).is_err());
        assert!(rle_expand(&[AtomId(1)], &[0]).is_err());
    }

    #[test]
    fn test_compose_empty_is_invalid() {
        let sub = Substrate::new();
        assert!(matches!(
            compose(sub.engine(), sub.hilbert_config(), &[]),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_singleton_policy() {
        let sub = Substrate::new();
        let a = sub.ingest_constant(Seed::from_char('a')).unwrap();
        let composed = compose(sub.engine(), sub.hilbert_config(), &[a]).unwrap();
        assert_eq!(composed, a);
    }

    #[test]
    fn test_compose_missing_child_fails() {
        let engine = DedupEngine::new(MemoryStore::new());
        let cfg = HilbertConfig::default();
        assert!(matches!(
            compose(&engine, &cfg, &[AtomId(999), AtomId(998)]),
            Err(Error::ReferentialIntegrity { .. })
        ));
    }

    #[test]
    fn test_identical_sequences_dedup() {
        let sub = Substrate::new();
        let a = sub.ingest_constant(Seed::from_char('a')).unwrap();
        let b = sub.ingest_constant(Seed::from_char('b')).unwrap();
        let first = compose(sub.engine(), sub.hilbert_config(), &[a, b, b]).unwrap();
        let second = compose(sub.engine(), sub.hilbert_config(), &[a, b, b]).unwrap();
        assert_eq!(first, second);
    }
}
