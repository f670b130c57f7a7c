//! Atomweave - Content-Addressed Atom Substrate
//!
//! Copyright (c) 2025 Atomweave Contributors
//! Licensed under MIT License
//!
//! A universal substrate that decomposes digital content into two primitives,
//! indivisible constants and hierarchical compositions, stored so identical
//! content deduplicates automatically and reconstructs exactly:
//!
//! - Deterministic projection of primitive values onto a 4D hypersphere
//! - Locality-preserving 128-bit Hilbert index over the quantized manifold
//! - Collision-resistant content addressing forming a Merkle DAG
//! - Run-length and learned-pattern compression during composition
//! - Threshold/quantization sparse encoding for numeric weight matrices
//! - Stack-based reconstruction back to leaf values
//!
//! The persistence backend is a collaborator, not a component: the crate
//! defines the [`store::AtomStore`] contract and ships an in-memory
//! reference implementation.

pub mod atom;
pub mod cli;
pub mod compose;
pub mod dedup;
pub mod hash;
pub mod hilbert;
pub mod projector;
pub mod reconstruct;
pub mod seed;
pub mod store;
pub mod substrate;
pub mod vocab;
pub mod weights;

// Re-export main types for convenience
pub use atom::{Atom, AtomId, AtomKind, ChildRef};
pub use hash::ContentHash;
pub use hilbert::{HilbertConfig, HilbertIndex};
pub use projector::Point;
pub use seed::Seed;
pub use store::{AtomStore, MemoryStore, PendingAtom};
pub use substrate::{CancelToken, Manifest, Substrate, SubstrateConfig};
pub use vocab::{TrainParams, Vocabulary};

/// Radius of the projection hypersphere.
pub const SPHERE_RADIUS: f64 = 1.0;

/// Tolerance on the surface invariant `x² + y² + z² + m² = R²`.
pub const SURFACE_TOLERANCE: f64 = 1e-9;

/// Crate-level error type.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Malformed seed, empty required sequence, mismatched parallel arrays,
    /// non-finite projection input. Local; rejected immediately.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Two distinct contents produced the same digest. Fatal: surfaced
    /// loudly, never treated as a match.
    #[error("content hash collision on {hash}")]
    HashCollision { hash: ContentHash },

    /// A composition references a child the store does not know; bottom-up
    /// construction was violated by the caller.
    #[error("referential integrity violation: {id} not present in store")]
    ReferentialIntegrity { id: AtomId },

    /// A value exceeds representable quantization precision.
    #[error("capacity exceeded: {0}")]
    Capacity(String),

    /// Transient persistence failure, already past the dedup engine's
    /// retry budget.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// A bulk operation observed its cancellation token.
    #[error("operation cancelled")]
    Cancelled,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot codec error: {0}")]
    Snapshot(String),
}

impl From<store::StoreError> for Error {
    fn from(e: store::StoreError) -> Self {
        match e {
            store::StoreError::Unavailable(msg) => Error::StoreUnavailable(msg),
            // Uniqueness violations are consumed by the dedup engine; one
            // escaping to this conversion means a caller bypassed it.
            store::StoreError::Duplicate(id) => {
                Error::StoreUnavailable(format!("unhandled duplicate insert of {id}"))
            }
        }
    }
}

impl From<bincode::Error> for Error {
    fn from(e: bincode::Error) -> Self {
        Error::Snapshot(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Snapshot(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
