//! Substrate facade - the core's boundary operations.
//!
//! Everything external collaborators touch goes through here: constant and
//! composition ingestion, text and numeric-trajectory helpers, vocabulary
//! training, sparse weight encoding, reconstruction, bulk parallel
//! ingestion, and snapshot/manifest persistence.
//!
//! Bulk ingestion is a fork-join: a pure, rayon-parallel scan phase extracts
//! seed sequences per document, then a serialized commit phase funnels them
//! through the dedup engine so write contention on the uniqueness constraint
//! stays bounded. Commits check a cooperative cancellation token at document
//! boundaries, never mid-computation.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::atom::AtomId;
use crate::compose;
use crate::dedup::{DedupConfig, DedupEngine, DedupStats};
use crate::hilbert::{self, HilbertConfig, HilbertIndex};
use crate::projector;
use crate::reconstruct;
use crate::seed::Seed;
use crate::store::{AtomStore, MemoryStore, PendingAtom, StoreSnapshot};
use crate::vocab::{self, TrainParams, Vocabulary};
use crate::weights;
use crate::{Error, Result};

/// Cooperative cancellation for bulk operations. Cloned freely; any holder
/// can cancel.
#[derive(Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// One ingested document, as recorded in the manifest.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DocumentEntry {
    pub path: String,
    pub root: AtomId,
    pub codepoints: usize,
}

/// Manifest of ingested documents; the JSON sidecar of a snapshot.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Manifest {
    pub documents: Vec<DocumentEntry>,
    pub total_atoms: usize,
}

impl Manifest {
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

/// Substrate-wide counters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubstrateStats {
    pub atoms: usize,
    pub constants: usize,
    pub compositions: usize,
    pub dedup: DedupStats,
}

/// Tunables for a substrate instance.
#[derive(Clone, Copy, Debug, Default)]
pub struct SubstrateConfig {
    pub hilbert: HilbertConfig,
    pub dedup: DedupConfig,
}

#[derive(Serialize, Deserialize)]
struct SubstrateSnapshot {
    hilbert: HilbertConfig,
    store: StoreSnapshot,
}

/// The atom substrate over the in-memory reference store.
pub struct Substrate {
    engine: DedupEngine<MemoryStore>,
    hilbert: HilbertConfig,
}

impl Default for Substrate {
    fn default() -> Self {
        Self::new()
    }
}

impl Substrate {
    pub fn new() -> Self {
        Self::with_config(SubstrateConfig::default())
    }

    pub fn with_config(config: SubstrateConfig) -> Self {
        Substrate {
            engine: DedupEngine::with_config(MemoryStore::new(), config.dedup),
            hilbert: config.hilbert,
        }
    }

    pub fn engine(&self) -> &DedupEngine<MemoryStore> {
        &self.engine
    }

    pub fn hilbert_config(&self) -> &HilbertConfig {
        &self.hilbert
    }

    /// Get-or-create the constant atom for a seed.
    ///
    /// # Examples
    ///
    /// ```
    /// use atomweave::{Seed, Substrate};
    ///
    /// let sub = Substrate::new();
    /// let first = sub.ingest_constant(Seed::from_char('x')).unwrap();
    /// let second = sub.ingest_constant(Seed::from_char('x')).unwrap();
    /// assert_eq!(first, second);
    /// ```
    pub fn ingest_constant(&self, seed: Seed) -> Result<AtomId> {
        seed.validate()?;
        let point = projector::project(&seed)?;
        let index = hilbert::to_index(&point, &self.hilbert)?;
        let hash = crate::hash::hash_constant(&seed);
        self.engine.get_or_create(PendingAtom {
            point,
            index,
            hash,
            kind: crate::atom::AtomKind::Constant { seed },
        })
    }

    /// Get-or-create a composition from explicit child/multiplicity arrays.
    pub fn ingest_composition(&self, children: &[AtomId], multiplicities: &[u32]) -> Result<AtomId> {
        compose::compose_rle(&self.engine, &self.hilbert, children, multiplicities)
    }

    /// Get-or-create a composition from an ordered sequence (RLE applied).
    pub fn ingest_sequence(&self, ids: &[AtomId]) -> Result<AtomId> {
        compose::compose(&self.engine, &self.hilbert, ids)
    }

    /// Ingest a string as a character -> token -> document hierarchy.
    ///
    /// Tokens partition the codepoint sequence exactly (whitespace runs are
    /// tokens too), so reconstruction is lossless. The empty string roots at
    /// the composition marker.
    pub fn ingest_text(&self, text: &str) -> Result<AtomId> {
        self.commit_document(&scan_text(text))
    }

    /// Ingest a numeric trajectory: one constant per value, composed in
    /// order. Exact (bit-pattern) round trip.
    pub fn ingest_vector(&self, values: &[f64]) -> Result<AtomId> {
        if values.is_empty() {
            return Err(Error::InvalidInput("empty vector".into()));
        }
        let ids = values
            .iter()
            .map(|&v| self.ingest_constant(Seed::from_f64(v)))
            .collect::<Result<Vec<_>>>()?;
        self.ingest_sequence(&ids)
    }

    /// Bulk-ingest documents: parallel scan, serialized commit.
    ///
    /// On cancellation, already-committed documents and their shared child
    /// atoms remain valid; the remaining documents simply have no roots.
    pub fn ingest_documents(
        &self,
        docs: &[(String, String)],
        cancel: &CancelToken,
    ) -> Result<Vec<DocumentEntry>> {
        // Scan phase: pure per-document seed extraction, order-preserving.
        let scanned: Vec<Vec<Vec<Seed>>> =
            docs.par_iter().map(|(_, text)| scan_text(text)).collect();

        // Commit phase: serial, cancellable at document boundaries.
        let mut entries = Vec::with_capacity(docs.len());
        for ((path, text), token_seeds) in docs.iter().zip(&scanned) {
            if cancel.is_cancelled() {
                tracing::info!(committed = entries.len(), "bulk ingestion cancelled");
                return Err(Error::Cancelled);
            }
            let root = self.commit_document(token_seeds)?;
            tracing::info!(path = %path, %root, "document committed");
            entries.push(DocumentEntry {
                path: path.clone(),
                root,
                codepoints: text.chars().count(),
            });
        }
        Ok(entries)
    }

    fn commit_document(&self, token_seeds: &[Vec<Seed>]) -> Result<AtomId> {
        if token_seeds.is_empty() {
            return self.ingest_constant(Seed::CompositionMarker);
        }
        let mut token_ids = Vec::with_capacity(token_seeds.len());
        for seeds in token_seeds {
            let char_ids = seeds
                .iter()
                .map(|&s| self.ingest_constant(s))
                .collect::<Result<Vec<_>>>()?;
            token_ids.push(self.ingest_sequence(&char_ids)?);
        }
        self.ingest_sequence(&token_ids)
    }

    /// Expand a root atom back to its leaf seeds.
    pub fn reconstruct(&self, id: AtomId) -> Result<Vec<Seed>> {
        reconstruct::reconstruct(self.engine.store(), id)
    }

    /// Reconstruct a text document exactly.
    pub fn reconstruct_text(&self, id: AtomId) -> Result<String> {
        reconstruct::seeds_to_text(&self.reconstruct(id)?)
    }

    /// Reconstruct a numeric trajectory exactly.
    pub fn reconstruct_vector(&self, id: AtomId) -> Result<Vec<f64>> {
        self.reconstruct(id)?
            .iter()
            .map(|seed| {
                seed.as_f64().ok_or_else(|| {
                    Error::InvalidInput(format!("non-numeric seed {seed:?} in vector"))
                })
            })
            .collect()
    }

    /// Train a pattern vocabulary over already-atomized sequences.
    pub fn train_vocabulary(
        &self,
        corpus: &[Vec<AtomId>],
        params: TrainParams,
    ) -> Result<Vocabulary> {
        vocab::train(&self.engine, &self.hilbert, corpus, params)
    }

    /// Apply a vocabulary's merges to a fresh sequence.
    pub fn encode_with_vocabulary(
        &self,
        vocabulary: &Vocabulary,
        sequence: &[AtomId],
    ) -> Result<Vec<AtomId>> {
        vocab::encode(&self.engine, &self.hilbert, vocabulary, sequence)
    }

    /// Expand merged atoms back to leaf constants.
    pub fn decode_sequence(&self, sequence: &[AtomId]) -> Result<Vec<AtomId>> {
        vocab::decode(self.engine.store(), sequence)
    }

    /// Encode a dense matrix as thresholded edges.
    pub fn encode_weights(
        &self,
        matrix: &[Vec<f64>],
        row_atoms: &[AtomId],
        col_atoms: &[AtomId],
        threshold: f64,
    ) -> Result<Vec<AtomId>> {
        weights::encode_weights(&self.engine, &self.hilbert, matrix, row_atoms, col_atoms, threshold)
    }

    /// Rebuild a dense matrix from edges (zeros where no edge survived).
    pub fn reconstruct_matrix(
        &self,
        edges: &[AtomId],
        row_atoms: &[AtomId],
        col_atoms: &[AtomId],
    ) -> Result<Vec<Vec<f64>>> {
        weights::reconstruct_matrix(self.engine.store(), edges, row_atoms, col_atoms)
    }

    /// Atoms whose Hilbert index falls within `window` of the seed's own
    /// index: the 1D approximation of spatial proximity.
    pub fn neighbors(&self, seed: Seed, window: u128) -> Result<Vec<AtomId>> {
        seed.validate()?;
        let point = projector::project(&seed)?;
        let center = hilbert::to_index(&point, &self.hilbert)?;
        let ids = self
            .engine
            .store()
            .range(center.saturating_sub(window), center.saturating_add(window))?;
        Ok(ids)
    }

    /// Range scan over raw Hilbert bounds.
    pub fn range(&self, lo: HilbertIndex, hi: HilbertIndex) -> Result<Vec<AtomId>> {
        Ok(self.engine.store().range(lo, hi)?)
    }

    pub fn stats(&self) -> SubstrateStats {
        let atoms = self.engine.store().len();
        let constants = self.engine.store().constant_count();
        SubstrateStats {
            atoms,
            constants,
            compositions: atoms - constants,
            dedup: self.engine.stats(),
        }
    }

    /// Serialize the substrate (config + every atom) to a binary snapshot.
    pub fn save_snapshot<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let snapshot = SubstrateSnapshot {
            hilbert: self.hilbert,
            store: self.engine.store().export()?,
        };
        let encoded = bincode::serialize(&snapshot)?;
        fs::write(path, encoded)?;
        Ok(())
    }

    /// Restore a substrate from a snapshot, byte-identical to the original.
    pub fn load_snapshot<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = fs::read(path)?;
        let snapshot: SubstrateSnapshot = bincode::deserialize(&data)?;
        Ok(Substrate {
            engine: DedupEngine::new(MemoryStore::import(snapshot.store)),
            hilbert: snapshot.hilbert,
        })
    }
}

/// Pure scan phase: a document's seeds, grouped by token.
///
/// Tokens alternate between whitespace runs and non-whitespace runs, so the
/// groups concatenate back to the exact codepoint sequence.
pub fn scan_text(text: &str) -> Vec<Vec<Seed>> {
    let mut tokens: Vec<Vec<Seed>> = Vec::new();
    let mut current: Vec<Seed> = Vec::new();
    let mut current_is_ws = false;
    for c in text.chars() {
        let ws = c.is_whitespace();
        if current.is_empty() || ws == current_is_ws {
            current_is_ws = ws;
            current.push(Seed::from_char(c));
        } else {
            tokens.push(std::mem::take(&mut current));
            current_is_ws = ws;
            current.push(Seed::from_char(c));
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}
