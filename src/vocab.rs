//! Pattern vocabulary - learned adjacent-pair merges over atom ids.
//!
//! Byte-pair-encoding lifted onto the substrate: the trainer repeatedly
//! merges the most frequent adjacent pair of atoms in a corpus into a fresh
//! composition atom and records the merge order. Because merge rules are
//! recorded as content hashes (never store-local ids), a vocabulary trained
//! anywhere encodes identical text to identical atoms everywhere.
//!
//! A vocabulary is an explicit, passable value: two vocabularies coexist in
//! one process without interference, and tests run in isolation.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use crate::atom::AtomId;
use crate::compose;
use crate::dedup::DedupEngine;
use crate::hash::ContentHash;
use crate::hilbert::HilbertConfig;
use crate::reconstruct;
use crate::store::AtomStore;
use crate::{Error, Result};

/// One recorded merge: the pair's content hashes and the hash of the merged
/// composition, portable across stores.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeRule {
    pub left: ContentHash,
    pub right: ContentHash,
    pub merged: ContentHash,
}

/// Ordered merge table. Application order is part of the contract: `encode`
/// replays the rules in exactly the order training recorded them.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vocabulary {
    pub merges: Vec<MergeRule>,
}

impl Vocabulary {
    pub fn len(&self) -> usize {
        self.merges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.merges.is_empty()
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Ok(serde_json::from_reader(file)?)
    }
}

/// Training knobs.
#[derive(Clone, Copy, Debug)]
pub struct TrainParams {
    /// Stop after this many merges.
    pub max_merges: usize,
    /// Ignore pairs seen fewer times than this.
    pub min_frequency: usize,
}

impl Default for TrainParams {
    fn default() -> Self {
        TrainParams { max_merges: 256, min_frequency: 2 }
    }
}

/// Learn a merge table from a corpus of already-atomized sequences.
///
/// Each round counts all adjacent pairs across all working sequences, picks
/// the most frequent one (ties broken by content-hash order so independently
/// initialized substrates agree), mints the pair's composition atom, and
/// rewrites every non-overlapping occurrence left to right.
pub fn train<S: AtomStore>(
    engine: &DedupEngine<S>,
    cfg: &HilbertConfig,
    corpus: &[Vec<AtomId>],
    params: TrainParams,
) -> Result<Vocabulary> {
    let mut sequences: Vec<Vec<AtomId>> = corpus.to_vec();
    let mut hashes: HashMap<AtomId, ContentHash> = HashMap::new();
    let mut vocabulary = Vocabulary::default();

    while vocabulary.len() < params.max_merges {
        let mut counts: HashMap<(AtomId, AtomId), usize> = HashMap::new();
        for seq in &sequences {
            for pair in seq.windows(2) {
                *counts.entry((pair[0], pair[1])).or_insert(0) += 1;
            }
        }

        let mut best: Option<((AtomId, AtomId), usize, (ContentHash, ContentHash))> = None;
        for (&pair, &count) in &counts {
            if count < params.min_frequency {
                continue;
            }
            let key = (hash_of(engine, &mut hashes, pair.0)?, hash_of(engine, &mut hashes, pair.1)?);
            let better = match &best {
                None => true,
                Some((_, best_count, best_key)) => {
                    count > *best_count || (count == *best_count && key < *best_key)
                }
            };
            if better {
                best = Some((pair, count, key));
            }
        }

        let Some(((left, right), count, (left_hash, right_hash))) = best else {
            break;
        };

        let merged_id = compose::compose(engine, cfg, &[left, right])?;
        let merged_hash = hash_of(engine, &mut hashes, merged_id)?;
        vocabulary.merges.push(MergeRule { left: left_hash, right: right_hash, merged: merged_hash });
        tracing::debug!(merge = vocabulary.len(), count, %merged_hash, "vocabulary merge");

        for seq in &mut sequences {
            replace_pair(seq, left, right, merged_id);
        }
    }

    Ok(vocabulary)
}

/// Re-apply a vocabulary's merges, in order, to a fresh sequence.
///
/// Merge atoms are resolved (or re-created) by content hash through the
/// dedup engine, so the output ids are the same atoms the trainer produced.
pub fn encode<S: AtomStore>(
    engine: &DedupEngine<S>,
    cfg: &HilbertConfig,
    vocabulary: &Vocabulary,
    sequence: &[AtomId],
) -> Result<Vec<AtomId>> {
    let mut seq = sequence.to_vec();
    for rule in &vocabulary.merges {
        let (Some(left), Some(right)) = (
            engine.store().lookup_hash(&rule.left)?,
            engine.store().lookup_hash(&rule.right)?,
        ) else {
            // The pair's parts do not exist here, so the pair cannot occur.
            continue;
        };
        if !has_pair(&seq, left, right) {
            continue;
        }
        let merged = compose::compose(engine, cfg, &[left, right])?;
        debug_assert_eq!(
            engine.store().fetch(merged)?.map(|a| a.hash),
            Some(rule.merged),
            "merge atom hash drifted from recorded rule",
        );
        replace_pair(&mut seq, left, right, merged);
    }
    Ok(seq)
}

/// Expand every merged atom in a sequence back to leaf constants.
pub fn decode<S: AtomStore>(store: &S, sequence: &[AtomId]) -> Result<Vec<AtomId>> {
    let mut out = Vec::with_capacity(sequence.len());
    for &id in sequence {
        out.extend(reconstruct::expand_to_constants(store, id)?);
    }
    Ok(out)
}

fn hash_of<S: AtomStore>(
    engine: &DedupEngine<S>,
    cache: &mut HashMap<AtomId, ContentHash>,
    id: AtomId,
) -> Result<ContentHash> {
    if let Some(&h) = cache.get(&id) {
        return Ok(h);
    }
    let atom = engine
        .store()
        .fetch(id)?
        .ok_or(Error::ReferentialIntegrity { id })?;
    cache.insert(id, atom.hash);
    Ok(atom.hash)
}

fn has_pair(seq: &[AtomId], left: AtomId, right: AtomId) -> bool {
    seq.windows(2).any(|w| w[0] == left && w[1] == right)
}

/// Replace non-overlapping `(left, right)` occurrences, left to right.
fn replace_pair(seq: &mut Vec<AtomId>, left: AtomId, right: AtomId, merged: AtomId) {
    let mut out = Vec::with_capacity(seq.len());
    let mut i = 0;
    while i < seq.len() {
        if i + 1 < seq.len() && seq[i] == left && seq[i + 1] == right {
            out.push(merged);
            i += 2;
        } else {
            out.push(seq[i]);
            i += 1;
        }
    }
    *seq = out;
}
