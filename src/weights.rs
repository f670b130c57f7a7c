//! Sparse weight encoding - dense numeric matrices as thresholded edges.
//!
//! Each surviving cell becomes an edge composition between its row and
//! column endpoint atoms, with the normalized magnitude quantized into an
//! integer multiplicity. Cells below the threshold produce nothing at all:
//! absence of an edge means "no relationship", not a stored zero. This is
//! lossy by design; sub-threshold values are unrecoverable as anything but
//! zero, and sign is never stored on the edge.

use crate::atom::AtomId;
use crate::compose;
use crate::dedup::DedupEngine;
use crate::hilbert::HilbertConfig;
use crate::store::AtomStore;
use crate::{Error, Result};

/// Quantization scale: multiplicities span `1..=WEIGHT_SCALE`.
pub const WEIGHT_SCALE: u32 = 100;

/// Encode a matrix as edges between row and column endpoint atoms.
///
/// Magnitudes normalize against the matrix's maximum absolute value;
/// anything below `threshold` (in normalized units, `0.0..=1.0`) is
/// discarded. An all-zero matrix produces no edges.
pub fn encode_weights<S: AtomStore>(
    engine: &DedupEngine<S>,
    cfg: &HilbertConfig,
    matrix: &[Vec<f64>],
    row_atoms: &[AtomId],
    col_atoms: &[AtomId],
    threshold: f64,
) -> Result<Vec<AtomId>> {
    if !(0.0..=1.0).contains(&threshold) {
        return Err(Error::InvalidInput(format!(
            "threshold {threshold} outside 0.0..=1.0"
        )));
    }
    if matrix.len() != row_atoms.len() {
        return Err(Error::InvalidInput(format!(
            "{} matrix rows but {} row atoms",
            matrix.len(),
            row_atoms.len()
        )));
    }
    let mut max_abs = 0.0f64;
    for row in matrix {
        if row.len() != col_atoms.len() {
            return Err(Error::InvalidInput(format!(
                "row of width {} but {} column atoms",
                row.len(),
                col_atoms.len()
            )));
        }
        for &v in row {
            if !v.is_finite() {
                return Err(Error::InvalidInput("non-finite matrix value".into()));
            }
            max_abs = max_abs.max(v.abs());
        }
    }
    if max_abs == 0.0 {
        return Ok(Vec::new());
    }

    let mut edges = Vec::new();
    for (row, &row_atom) in matrix.iter().zip(row_atoms) {
        for (&value, &col_atom) in row.iter().zip(col_atoms) {
            let normalized = value.abs() / max_abs;
            if normalized < threshold {
                continue;
            }
            let multiplicity = quantize_magnitude(normalized);
            // Exactly two children; the magnitude rides as the multiplicity
            // on both endpoints, never as a separate value atom.
            let edge = compose::compose_rle(
                engine,
                cfg,
                &[row_atom, col_atom],
                &[multiplicity, multiplicity],
            )?;
            edges.push(edge);
        }
    }
    tracing::debug!(
        edges = edges.len(),
        cells = matrix.len() * col_atoms.len(),
        "sparse weight encoding"
    );
    Ok(edges)
}

/// Quantize a normalized magnitude onto the integer scale.
fn quantize_magnitude(normalized: f64) -> u32 {
    ((normalized * f64::from(WEIGHT_SCALE)).round() as u32).clamp(1, WEIGHT_SCALE)
}

/// Rebuild a dense matrix from edges.
///
/// Non-edge cells fill with zero. Connection strength between a pair of
/// endpoints is the sum of multiplicities across all their edges, so
/// distinct-weight duplicates accumulate.
pub fn reconstruct_matrix<S: AtomStore>(
    store: &S,
    edges: &[AtomId],
    row_atoms: &[AtomId],
    col_atoms: &[AtomId],
) -> Result<Vec<Vec<f64>>> {
    let row_of: std::collections::HashMap<AtomId, usize> =
        row_atoms.iter().enumerate().map(|(i, &id)| (id, i)).collect();
    let col_of: std::collections::HashMap<AtomId, usize> =
        col_atoms.iter().enumerate().map(|(i, &id)| (id, i)).collect();

    let mut matrix = vec![vec![0.0f64; col_atoms.len()]; row_atoms.len()];
    for &edge_id in edges {
        let atom = store
            .fetch(edge_id)?
            .ok_or(Error::ReferentialIntegrity { id: edge_id })?;
        let (source, target, weight) = atom.as_edge().ok_or_else(|| {
            Error::InvalidInput(format!("{edge_id} is not an edge composition"))
        })?;
        let (Some(&i), Some(&j)) = (row_of.get(&source), col_of.get(&target)) else {
            return Err(Error::InvalidInput(format!(
                "edge {edge_id} endpoints are not among the given row/column atoms"
            )));
        };
        matrix[i][j] += f64::from(weight) / f64::from(WEIGHT_SCALE);
    }
    Ok(matrix)
}
