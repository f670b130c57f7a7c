//! CLI interface for Atomweave
//!
//! Provides command-line access to the substrate:
//! - Ingesting text corpora into a substrate snapshot
//! - Reconstructing (extracting) ingested documents
//! - Training pattern vocabularies
//! - Encoding weight matrices as sparse edges
//! - Probing Hilbert-index neighborhoods and snapshot statistics

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::fs;
use std::path::PathBuf;
use walkdir::WalkDir;

use crate::store::AtomStore;
use crate::substrate::{CancelToken, Manifest, Substrate};
use crate::vocab::TrainParams;
use crate::Seed;

#[derive(Parser)]
#[command(name = "atomweave")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Content-addressed atom substrate")]
#[command(
    long_about = "Atomweave - a content-addressed substrate that decomposes digital content\n\
    into constants and compositions on a 4D manifold.\n\n\
    Identical content deduplicates automatically (one atom per distinct content,\n\
    substrate-wide) and every discrete ingestion reconstructs exactly.\n\n\
    Examples:\n\
      atomweave ingest -i ./corpus -s corpus.atoms -m manifest.json -v\n\
      atomweave extract -s corpus.atoms -m manifest.json -o ./restored -v\n\
      atomweave train-vocab -s corpus.atoms -m manifest.json -o vocab.json\n\
      atomweave neighbors -s corpus.atoms -c q -w 4294967296"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Ingest a directory of text files into a substrate snapshot
    #[command(
        long_about = "Ingest a directory of text files into a substrate snapshot\n\n\
        Every file is decomposed into character constants, token compositions and a\n\
        document root. Identical characters, tokens and sub-sequences anywhere in the\n\
        corpus collapse to single atoms. Non-UTF-8 files are skipped.\n\n\
        Outputs a binary snapshot of the atom store plus a JSON manifest mapping each\n\
        file path to its document root atom."
    )]
    Ingest {
        /// Input directory (recursively processed)
        #[arg(short, long, value_name = "DIR")]
        input: PathBuf,

        /// Output substrate snapshot
        #[arg(short, long, default_value = "substrate.atoms", value_name = "FILE")]
        snapshot: PathBuf,

        /// Output manifest with document roots
        #[arg(short, long, default_value = "manifest.json", value_name = "FILE")]
        manifest: PathBuf,

        /// Verbose progress output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Reconstruct ingested documents from a snapshot
    #[command(
        long_about = "Reconstruct ingested documents from a snapshot\n\n\
        Walks each manifest entry's composition tree down to its leaf constants and\n\
        writes the exact original text under the output directory. Reconstruction is\n\
        lossless for every ingested document."
    )]
    Extract {
        /// Substrate snapshot to read
        #[arg(short, long, default_value = "substrate.atoms", value_name = "FILE")]
        snapshot: PathBuf,

        /// Manifest with document roots
        #[arg(short, long, default_value = "manifest.json", value_name = "FILE")]
        manifest: PathBuf,

        /// Output directory for reconstructed files
        #[arg(short, long, value_name = "DIR")]
        output_dir: PathBuf,

        /// Verbose progress output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Train a pattern vocabulary over the ingested corpus
    #[command(
        long_about = "Train a pattern vocabulary over the ingested corpus\n\n\
        Learns frequently recurring adjacent-pair merges (byte-pair-encoding style,\n\
        over atom ids) across every document in the manifest, minting one composition\n\
        atom per merge. The vocabulary is written as portable JSON keyed by content\n\
        hashes; the snapshot is re-saved because training creates atoms."
    )]
    TrainVocab {
        /// Substrate snapshot to read and update
        #[arg(short, long, default_value = "substrate.atoms", value_name = "FILE")]
        snapshot: PathBuf,

        /// Manifest with document roots
        #[arg(short, long, default_value = "manifest.json", value_name = "FILE")]
        manifest: PathBuf,

        /// Output vocabulary file
        #[arg(short, long, default_value = "vocab.json", value_name = "FILE")]
        output: PathBuf,

        /// Maximum number of merges to learn
        #[arg(long, default_value_t = 256)]
        max_merges: usize,

        /// Minimum pair frequency for a merge
        #[arg(long, default_value_t = 2)]
        min_frequency: usize,

        /// Verbose progress output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Encode a weight matrix as sparse edges
    #[command(
        long_about = "Encode a weight matrix as sparse edges\n\n\
        Reads a JSON matrix {\"row_labels\": [..], \"col_labels\": [..], \"rows\": [[..]]},\n\
        normalizes magnitudes against the matrix maximum, discards cells below the\n\
        threshold and stores the rest as edge atoms whose multiplicity carries the\n\
        quantized magnitude. Lossy by design: sub-threshold cells reconstruct as zero."
    )]
    EncodeWeights {
        /// Substrate snapshot to read and update
        #[arg(short, long, default_value = "substrate.atoms", value_name = "FILE")]
        snapshot: PathBuf,

        /// JSON matrix file
        #[arg(long, value_name = "FILE")]
        matrix: PathBuf,

        /// Normalized magnitude threshold (0.0..=1.0)
        #[arg(short, long, default_value_t = 0.1)]
        threshold: f64,

        /// Verbose progress output
        #[arg(short, long)]
        verbose: bool,
    },

    /// List atoms near a character on the Hilbert curve
    Neighbors {
        /// Substrate snapshot to read
        #[arg(short, long, default_value = "substrate.atoms", value_name = "FILE")]
        snapshot: PathBuf,

        /// Probe character
        #[arg(short, long)]
        character: char,

        /// Index window on each side of the probe
        #[arg(short, long, default_value_t = 1u64 << 32)]
        window: u64,
    },

    /// Print substrate statistics
    Stats {
        /// Substrate snapshot to read
        #[arg(short, long, default_value = "substrate.atoms", value_name = "FILE")]
        snapshot: PathBuf,
    },
}

#[derive(serde::Deserialize)]
struct MatrixFile {
    row_labels: Vec<String>,
    col_labels: Vec<String>,
    rows: Vec<Vec<f64>>,
}

pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Ingest { input, snapshot, manifest, verbose } => {
            if verbose {
                println!("Atomweave v{} - Ingestion", env!("CARGO_PKG_VERSION"));
                println!("==========================");
            }

            let mut files: Vec<PathBuf> = Vec::new();
            for entry in WalkDir::new(&input).follow_links(false) {
                let entry = entry.context("walking input directory")?;
                if entry.file_type().is_file() {
                    files.push(entry.path().to_path_buf());
                }
            }
            files.sort();

            let mut docs: Vec<(String, String)> = Vec::new();
            for path in files {
                let data = fs::read(&path)
                    .with_context(|| format!("reading {}", path.display()))?;
                let Ok(text) = String::from_utf8(data) else {
                    if verbose {
                        println!("Skipping non-UTF-8 file: {}", path.display());
                    }
                    continue;
                };
                let logical = path
                    .strip_prefix(&input)
                    .unwrap_or(&path)
                    .to_string_lossy()
                    .to_string();
                if verbose {
                    println!("Queued {}: {} chars", logical, text.chars().count());
                }
                docs.push((logical, text));
            }

            let substrate = Substrate::new();
            let documents = substrate.ingest_documents(&docs, &CancelToken::new())?;
            let stats = substrate.stats();

            substrate.save_snapshot(&snapshot)?;
            Manifest { documents, total_atoms: stats.atoms }.save(&manifest)?;

            if verbose {
                println!("\nIngestion complete!");
                println!("  Snapshot: {}", snapshot.display());
                println!("  Manifest: {}", manifest.display());
                println!("  Documents: {}", docs.len());
                println!(
                    "  Atoms: {} ({} constants, {} compositions)",
                    stats.atoms, stats.constants, stats.compositions
                );
                println!("  Dedup: {} hits / {} misses", stats.dedup.hits, stats.dedup.misses);
            }

            Ok(())
        }

        Commands::Extract { snapshot, manifest, output_dir, verbose } => {
            if verbose {
                println!("Atomweave v{} - Extraction", env!("CARGO_PKG_VERSION"));
                println!("===========================");
            }

            let substrate = Substrate::load_snapshot(&snapshot)?;
            let manifest = Manifest::load(&manifest)?;

            for doc in &manifest.documents {
                let text = substrate.reconstruct_text(doc.root)?;
                let out_path = output_dir.join(&doc.path);
                if let Some(parent) = out_path.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::write(&out_path, text)?;
                if verbose {
                    println!("Extracted: {}", doc.path);
                }
            }

            if verbose {
                println!("\nExtraction complete!");
                println!("  Output: {}", output_dir.display());
            }

            Ok(())
        }

        Commands::TrainVocab { snapshot, manifest, output, max_merges, min_frequency, verbose } => {
            if verbose {
                println!("Atomweave v{} - Vocabulary Training", env!("CARGO_PKG_VERSION"));
                println!("====================================");
            }

            let substrate = Substrate::load_snapshot(&snapshot)?;
            let manifest = Manifest::load(&manifest)?;

            // Token-level training corpus: each document root expanded one
            // level back into its ordered token sequence.
            let mut corpus = Vec::with_capacity(manifest.documents.len());
            for doc in &manifest.documents {
                let atom = substrate
                    .engine()
                    .store()
                    .fetch(doc.root)?
                    .context("manifest root missing from snapshot")?;
                let refs: Vec<_> = atom.children().iter().map(|c| c.id).collect();
                let mults: Vec<_> = atom.children().iter().map(|c| c.multiplicity).collect();
                if refs.is_empty() {
                    // Single-token or empty document: the root is its own sequence.
                    corpus.push(vec![doc.root]);
                } else {
                    corpus.push(crate::compose::rle_expand(&refs, &mults)?);
                }
            }

            let vocabulary =
                substrate.train_vocabulary(&corpus, TrainParams { max_merges, min_frequency })?;
            vocabulary.save(&output)?;
            // Training mints merge atoms; persist them.
            substrate.save_snapshot(&snapshot)?;

            if verbose {
                println!("\nTraining complete!");
                println!("  Merges learned: {}", vocabulary.len());
                println!("  Vocabulary: {}", output.display());
            }

            Ok(())
        }

        Commands::EncodeWeights { snapshot, matrix, threshold, verbose } => {
            if verbose {
                println!("Atomweave v{} - Sparse Weight Encoding", env!("CARGO_PKG_VERSION"));
                println!("=======================================");
            }

            let substrate = Substrate::load_snapshot(&snapshot)?;
            let file = fs::File::open(&matrix)
                .with_context(|| format!("opening {}", matrix.display()))?;
            let parsed: MatrixFile = serde_json::from_reader(file).context("parsing matrix JSON")?;

            let row_atoms = parsed
                .row_labels
                .iter()
                .map(|label| substrate.ingest_text(label))
                .collect::<crate::Result<Vec<_>>>()?;
            let col_atoms = parsed
                .col_labels
                .iter()
                .map(|label| substrate.ingest_text(label))
                .collect::<crate::Result<Vec<_>>>()?;

            let edges = substrate.encode_weights(&parsed.rows, &row_atoms, &col_atoms, threshold)?;
            substrate.save_snapshot(&snapshot)?;

            let cells = parsed.rows.len() * parsed.col_labels.len();
            println!("Encoded {} edges from {cells} cells (threshold {threshold})", edges.len());
            if verbose {
                for id in &edges {
                    let atom = substrate
                        .engine()
                        .store()
                        .fetch(*id)?
                        .context("edge missing after creation")?;
                    if let Some((source, target, weight)) = atom.as_edge() {
                        println!("  {id}: {source} -> {target} weight {weight}");
                    }
                }
            }

            Ok(())
        }

        Commands::Neighbors { snapshot, character, window } => {
            let substrate = Substrate::load_snapshot(&snapshot)?;
            let ids = substrate.neighbors(Seed::from_char(character), u128::from(window))?;

            println!("Atoms within {window} of {character:?} on the Hilbert curve:");
            for id in ids {
                let atom = substrate
                    .engine()
                    .store()
                    .fetch(id)?
                    .context("range hit missing from store")?;
                match atom.seed() {
                    Some(seed) => println!("  {id}  {}  {seed:?}", atom.index),
                    None => println!("  {id}  {}  composition", atom.index),
                }
            }

            Ok(())
        }

        Commands::Stats { snapshot } => {
            let substrate = Substrate::load_snapshot(&snapshot)?;
            let stats = substrate.stats();

            println!("Atoms:        {}", stats.atoms);
            println!("  constants:    {}", stats.constants);
            println!("  compositions: {}", stats.compositions);
            println!("Dedup hits:   {}", stats.dedup.hits);
            println!("Dedup misses: {}", stats.dedup.misses);

            Ok(())
        }
    }
}
