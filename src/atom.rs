//! Atom records - the unit of storage.
//!
//! An atom is either a constant (leaf seed) or a composition (ordered child
//! references with parallel multiplicities). All cross-atom references are
//! surrogate ids resolved through the store, never pointers, so one child can
//! safely serve unboundedly many parents.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::hash::ContentHash;
use crate::hilbert::HilbertIndex;
use crate::projector::Point;
use crate::seed::Seed;

/// Surrogate atom id issued by the store. Stable within one store; never
/// meaningful across stores (content hashes are the portable identity).
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct AtomId(pub u64);

impl fmt::Display for AtomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "atom#{}", self.0)
    }
}

/// Ordered child reference inside a composition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildRef {
    pub id: AtomId,
    pub is_constant: bool,
    pub multiplicity: u32,
}

/// Payload of an atom: the part that defines content identity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum AtomKind {
    Constant { seed: Seed },
    Composition { children: Vec<ChildRef> },
}

/// Stored atom record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Atom {
    pub id: AtomId,
    pub point: Point,
    pub index: HilbertIndex,
    pub hash: ContentHash,
    pub kind: AtomKind,
}

impl Atom {
    pub fn is_constant(&self) -> bool {
        matches!(self.kind, AtomKind::Constant { .. })
    }

    pub fn seed(&self) -> Option<Seed> {
        match &self.kind {
            AtomKind::Constant { seed } => Some(*seed),
            AtomKind::Composition { .. } => None,
        }
    }

    pub fn children(&self) -> &[ChildRef] {
        match &self.kind {
            AtomKind::Constant { .. } => &[],
            AtomKind::Composition { children } => children,
        }
    }

    /// View a two-child composition as an edge: `(source, target, weight)`.
    ///
    /// The weight magnitude is the multiplicity, carried identically on both
    /// endpoints by the sparse encoder.
    pub fn as_edge(&self) -> Option<(AtomId, AtomId, u32)> {
        match &self.kind {
            AtomKind::Composition { children } if children.len() == 2 => {
                Some((children[0].id, children[1].id, children[0].multiplicity))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash;

    fn constant(id: u64, seed: Seed) -> Atom {
        Atom {
            id: AtomId(id),
            point: Point { x: 1.0, y: 0.0, z: 0.0, m: 0.0 },
            index: HilbertIndex::default(),
            hash: hash::hash_constant(&seed),
            kind: AtomKind::Constant { seed },
        }
    }

    #[test]
    fn test_constant_accessors() {
        let a = constant(7, Seed::from_char('x'));
        assert!(a.is_constant());
        assert_eq!(a.seed(), Some(Seed::Unicode(120)));
        assert!(a.children().is_empty());
        assert!(a.as_edge().is_none());
    }

    #[test]
    fn test_edge_view() {
        let edge = Atom {
            id: AtomId(3),
            point: Point { x: 0.0, y: 0.0, z: 0.0, m: 0.0 },
            index: HilbertIndex::default(),
            hash: hash::hash_composition(&[]),
            kind: AtomKind::Composition {
                children: vec![
                    ChildRef { id: AtomId(1), is_constant: true, multiplicity: 42 },
                    ChildRef { id: AtomId(2), is_constant: true, multiplicity: 42 },
                ],
            },
        };
        assert_eq!(edge.as_edge(), Some((AtomId(1), AtomId(2), 42)));
    }
}
