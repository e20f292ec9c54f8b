//! Neighbor-Joining trees from pairwise distance matrices.
//!
//! Given a symmetric matrix of evolutionary distances between taxa, this crate
//! builds an unrooted binary tree by repeatedly joining the pair of active taxa
//! that minimizes the neighbor-joining criterion
//! `Q(i, j) = d(i, j) - (r[i] + r[j]) / (n - 2)`, where `r` is the net
//! divergence (row sum) over the `n` taxa still active.
//!
//! # Components
//!
//! - [`DistanceMatrix`]
//!   - Lower-triangular storage packed into a flat `Vec`, one label per row.
//!     `get(i, j)` and `get(j, i)` read the same cell; the diagonal is zero.
//!   - Overwritten in place as taxa merge; the tree, not the matrix, is the
//!     result of a run.
//!
//! - [`ActiveSetMapper`]
//!   - Maps logical positions `0..n` of the active taxa onto fixed matrix
//!     slots. Removing a taxon shifts the tail of the mapping instead of
//!     moving matrix contents.
//!
//! - [`CandidateIndex`]
//!   - For each matrix column, the rows above it keyed by distance (scaled to
//!     integers). Every matrix write made by the engine is mirrored into the
//!     index with one removal and one insertion, so the next minimum search
//!     can walk each column from the closest partner outwards and stop early.
//!   - A removal that does not find its pairing means the index and matrix
//!     have drifted apart; the run fails with [`NJError::IndexDesync`].
//!
//! - [`NeighborJoining`]
//!   - The merge loop. The pair search is pluggable ([`Strategy::Naive`] or
//!     [`Strategy::Indexed`]); both resolve ties identically, lowest column
//!     first, then closest distance, then lowest row, so they always build
//!     the same tree.
//!   - Branch lengths can be rounded half-up to a fixed number of digits and
//!     negative lengths, which appear on non-additive input, are clamped to
//!     zero unless [`NegativeLengths::Keep`] is set.
//!   - [`NeighborJoining::execute_batch`] runs independent matrices on the
//!     rayon pool.
//!
//! - [`TreeBuilder`] / [`Tree`]
//!   - Accumulate the joins and produce an unrooted tree whose root has two
//!     interchangeable children. [`Tree::to_newick`] renders it.
//!
//! # Examples
//!
//! ```
//! use nj::{nj, EngineOptions, NJConfig};
//!
//! let conf = NJConfig {
//!     labels: vec!["A".into(), "B".into(), "C".into(), "D".into()],
//!     distances: vec![
//!         vec![0.0, 5.0, 9.0, 9.0],
//!         vec![5.0, 0.0, 10.0, 10.0],
//!         vec![9.0, 10.0, 0.0, 8.0],
//!         vec![9.0, 10.0, 8.0, 0.0],
//!     ],
//!     options: EngineOptions::default(),
//!     hide_internal: true,
//! };
//! let newick = nj(conf).expect("NJ failed");
//! assert_eq!(newick, "(((A:2.000,B:3.000):3.000,C:4.000):2.000,D:2.000);");
//! ```
//!
//! # Errors
//!
//! Input problems (too few taxa, label/row mismatch, ragged or asymmetric
//! rows, negative or non-finite distances, precision outside 1..=9) are
//! reported before any join is made. Internal bookkeeping failures abort the
//! run; no partial tree is returned.
mod active;
mod candidates;
mod config;
mod engine;
mod error;
mod matrix;
pub mod phylip;
mod strategy;
mod tree;

pub use crate::active::ActiveSetMapper;
pub use crate::candidates::{key_of, CandidateIndex, KEY_SCALE};
pub use crate::config::{EngineOptions, NJConfig, NegativeLengths, Precision, Strategy};
pub use crate::engine::NeighborJoining;
pub use crate::error::{NJError, Result};
pub use crate::matrix::{DistanceMatrix, MIN_TAXA};
pub use crate::strategy::{IndexedScan, NaiveScan, PairSelector, SearchContext, Selection};
pub use crate::tree::{Tree, TreeBuilder, TreeNode};

use rayon::prelude::*;

/// Builds a tree from raw square rows.
///
/// Two taxa are joined directly at half their distance; three or more go
/// through [`NeighborJoining`].
pub fn build_tree(labels: Vec<String>, rows: &[Vec<f64>], options: &EngineOptions) -> Result<Tree> {
    if let [a, b] = labels.as_slice() {
        matrix::check_rows(&labels, rows)?;
        let half = options.round(rows[1][0] / 2.0);
        return Ok(TreeBuilder::join_pair(a.clone(), b.clone(), half));
    }
    if labels.len() < 2 {
        return Err(NJError::TooFewTaxa {
            min: 2,
            found: labels.len(),
        });
    }
    let dist = DistanceMatrix::from_rows(labels, rows)?;
    NeighborJoining::new(options.clone()).execute(dist)
}

/// Runs neighbor joining on the configured matrix and returns the Newick string.
pub fn nj(conf: NJConfig) -> Result<String> {
    let decimals = conf.options.newick_decimals();
    let tree = build_tree(conf.labels, &conf.distances, &conf.options)?;
    Ok(tree.to_newick(conf.hide_internal, decimals))
}

/// [`nj`] over independent configurations, in parallel, results in input order.
pub fn nj_batch(confs: Vec<NJConfig>) -> Vec<Result<String>> {
    confs.into_par_iter().map(nj).collect()
}
