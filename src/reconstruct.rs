//! Reconstruction - top-down traversal from a root atom back to leaf seeds.
//!
//! Traversal is iterative over an explicit work stack: documents and tensors
//! produce deep, wide composition trees, and call recursion would overflow
//! long before the substrate ran out of memory. Fetched atoms are memoized
//! for the duration of one traversal, since shared children (that is the
//! whole point of deduplication) get visited many times.

use std::collections::HashMap;

use crate::atom::{Atom, AtomId, AtomKind};
use crate::seed::Seed;
use crate::store::AtomStore;
use crate::{Error, Result};

/// Expand a root atom into its ordered sequence of leaf seeds.
///
/// Lossless for discrete content: the emitted seeds are exactly the sequence
/// that was ingested. A child id the store does not know is a
/// referential-integrity failure (the DAG was not built bottom-up).
pub fn reconstruct<S: AtomStore>(store: &S, root: AtomId) -> Result<Vec<Seed>> {
    let mut out = Vec::new();
    visit_constants(store, root, |atom| {
        if let AtomKind::Constant { seed } = atom.kind {
            out.push(seed);
        }
    })?;
    Ok(out)
}

/// Expand a root atom into the ordered ids of its leaf constants.
///
/// Shared with the vocabulary decoder, which needs ids rather than seeds.
pub fn expand_to_constants<S: AtomStore>(store: &S, root: AtomId) -> Result<Vec<AtomId>> {
    let mut out = Vec::new();
    visit_constants(store, root, |atom| out.push(atom.id))?;
    Ok(out)
}

fn visit_constants<S: AtomStore>(
    store: &S,
    root: AtomId,
    mut emit: impl FnMut(&Atom),
) -> Result<()> {
    let mut cache: HashMap<AtomId, Atom> = HashMap::new();
    let mut stack: Vec<(AtomId, u32)> = vec![(root, 1)];

    while let Some((id, count)) = stack.pop() {
        if !cache.contains_key(&id) {
            let atom = store
                .fetch(id)?
                .ok_or(Error::ReferentialIntegrity { id })?;
            cache.insert(id, atom);
        }
        let atom = &cache[&id];
        match &atom.kind {
            AtomKind::Constant { .. } => {
                for _ in 0..count {
                    emit(atom);
                }
            }
            AtomKind::Composition { children } => {
                // One reversed pass per repetition keeps emission order
                // identical to ingestion order.
                for _ in 0..count {
                    for child in children.iter().rev() {
                        stack.push((child.id, child.multiplicity));
                    }
                }
            }
        }
    }
    Ok(())
}

/// Decode a reconstructed seed sequence back into text.
///
/// Composition markers elide (they are structural, not content); any
/// non-Unicode seed means the root was not a text document.
pub fn seeds_to_text(seeds: &[Seed]) -> Result<String> {
    let mut out = String::with_capacity(seeds.len());
    for seed in seeds {
        match seed {
            Seed::Unicode(cp) => {
                let c = char::from_u32(*cp).ok_or_else(|| {
                    Error::InvalidInput(format!("codepoint U+{cp:X} is not a Unicode scalar"))
                })?;
                out.push(c);
            }
            Seed::CompositionMarker => {}
            other => {
                return Err(Error::InvalidInput(format!(
                    "non-text seed {other:?} in text reconstruction"
                )))
            }
        }
    }
    Ok(out)
}
