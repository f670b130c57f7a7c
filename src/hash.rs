//! Content hashing - collision-resistant addresses for the Merkle DAG.
//!
//! Constants hash their tagged seed bytes; compositions hash the ordered
//! concatenation of child hash + multiplicity, so a composition's address is
//! a function of its full subtree and any change below propagates to every
//! ancestor.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::seed::Seed;

/// Domain separator for constant hashing.
const CONSTANT_DOMAIN: u8 = 0x01;
/// Domain separator for composition hashing.
const COMPOSITION_DOMAIN: u8 = 0x10;

/// 256-bit content address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        ContentHash(bytes)
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0 {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({self})")
    }
}

/// Address of a constant atom.
///
/// The seed's type discriminator byte goes into the digest ahead of the
/// payload, so values sharing a bit representation across kinds (`Integer(1)`
/// vs `FloatBits(1)`) can never share an address.
///
/// # Examples
///
/// ```
/// use atomweave::{hash, Seed};
///
/// assert_eq!(
///     hash::hash_constant(&Seed::from_char('x')),
///     hash::hash_constant(&Seed::from_char('x')),
/// );
/// assert_ne!(
///     hash::hash_constant(&Seed::Integer(1)),
///     hash::hash_constant(&Seed::FloatBits(1)),
/// );
/// ```
pub fn hash_constant(seed: &Seed) -> ContentHash {
    let mut hasher = Sha256::new();
    hasher.update([CONSTANT_DOMAIN, seed.tag()]);
    match *seed {
        Seed::Unicode(cp) => hasher.update(cp.to_le_bytes()),
        Seed::Integer(v) => hasher.update(v.to_le_bytes()),
        Seed::FloatBits(bits) => hasher.update(bits.to_le_bytes()),
        Seed::CompositionMarker => {}
    }
    ContentHash(hasher.finalize().into())
}

/// Address of a composition atom from its ordered children.
///
/// Order-sensitive and multiplicity-sensitive: permuting children or changing
/// a repeat count changes identity.
pub fn hash_composition(children: &[(ContentHash, u32)]) -> ContentHash {
    let mut hasher = Sha256::new();
    hasher.update([COMPOSITION_DOMAIN]);
    for (child, multiplicity) in children {
        hasher.update(child.as_bytes());
        hasher.update(multiplicity.to_le_bytes());
    }
    ContentHash(hasher.finalize().into())
}
