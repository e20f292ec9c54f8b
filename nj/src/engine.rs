//! The neighbor-joining merge loop.
//!
//! Each iteration recomputes net divergences, asks the configured
//! [`PairSelector`] for the pair minimizing the criterion, hangs both under a
//! new node, rewrites the merged node's distances in place and drops the
//! second taxon from the active set. Two taxa left means the root is made.

use rayon::prelude::*;
use tracing::{debug, info, trace};

use crate::active::ActiveSetMapper;
use crate::candidates::CandidateIndex;
use crate::config::{EngineOptions, NegativeLengths};
use crate::error::{NJError, Result};
use crate::matrix::DistanceMatrix;
use crate::strategy::{selector_for, SearchContext};
use crate::tree::{Tree, TreeBuilder};

/// Matrix, candidate index and active set for one run.
///
/// Matrix cells are only written through [`Workspace::rewrite`] and
/// [`Workspace::retire`], which keep the index in step.
struct Workspace {
    matrix: DistanceMatrix,
    index: CandidateIndex,
    active: ActiveSetMapper,
}

impl Workspace {
    fn new(matrix: DistanceMatrix) -> Self {
        Self {
            index: CandidateIndex::initialize(&matrix),
            active: ActiveSetMapper::new(matrix.size()),
            matrix,
        }
    }

    fn slot(&self, i: usize) -> usize {
        self.active.to_storage(i)
    }

    fn distance(&self, i: usize, j: usize) -> f64 {
        self.matrix.get(self.slot(i), self.slot(j))
    }

    fn context<'a>(&'a self, r: &'a [f64]) -> SearchContext<'a> {
        SearchContext {
            matrix: &self.matrix,
            index: &self.index,
            active: &self.active,
            r,
        }
    }

    /// Sum of distances from each active taxon to all others, by logical index.
    fn net_divergences(&self, r: &mut Vec<f64>) {
        let slots = self.active.slots();
        r.clear();
        r.extend(slots.iter().map(|&a| {
            slots
                .iter()
                .filter(|&&b| b != a)
                .map(|&b| self.matrix.get(a, b))
                .sum::<f64>()
        }));
    }

    /// Overwrites the distance between two storage slots.
    fn rewrite(&mut self, a: usize, b: usize, value: f64) -> Result<()> {
        let (lo, hi) = if a < b { (a, b) } else { (b, a) };
        self.index.remove_pairing(self.matrix.get(lo, hi), lo, hi)?;
        self.index.add_pairing(value, lo, hi)?;
        self.matrix.set(lo, hi, value);
        Ok(())
    }

    /// Drops the pairing of a cell that is about to leave the active set.
    fn retire(&mut self, a: usize, b: usize) -> Result<()> {
        let (lo, hi) = if a < b { (a, b) } else { (b, a) };
        self.index.remove_pairing(self.matrix.get(lo, hi), lo, hi)
    }

    /// Replaces logical `i` by the node joining `i` and `j`, then removes `j`.
    fn merge(&mut self, i: usize, j: usize) -> Result<()> {
        let (si, sj) = (self.slot(i), self.slot(j));
        let d_ij = self.matrix.get(si, sj);
        for k in 0..self.active.len() {
            if k == i || k == j {
                continue;
            }
            let sk = self.slot(k);
            let d_new = 0.5 * (self.matrix.get(si, sk) + self.matrix.get(sj, sk) - d_ij);
            self.rewrite(si, sk, d_new)?;
            self.retire(sj, sk)?;
        }
        self.retire(si, sj)?;
        self.active.remove(j);
        Ok(())
    }
}

/// Neighbor-joining tree builder.
///
/// Options are fixed at construction, so one instance can serve any number
/// of runs, including concurrent ones through [`NeighborJoining::execute_batch`].
#[derive(Clone, Debug, Default)]
pub struct NeighborJoining {
    options: EngineOptions,
}

impl NeighborJoining {
    pub fn new(options: EngineOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Builds the tree for `matrix`, consuming it.
    ///
    /// # Errors
    /// Returns an error if the matrix fails validation (fewer than three taxa,
    /// negative or non-finite distances) or if the candidate index and the
    /// matrix disagree at any point, in which case no tree is produced.
    pub fn execute(&self, matrix: DistanceMatrix) -> Result<Tree> {
        matrix.validate()?;
        let n0 = matrix.size();
        debug!(taxa = n0, strategy = ?self.options.strategy, "starting neighbor joining");

        let selector = selector_for(self.options.strategy);
        let mut builder = TreeBuilder::new(matrix.labels());
        let mut ws = Workspace::new(matrix);
        let mut r = Vec::with_capacity(n0);

        while ws.active.len() > 2 {
            let n = ws.active.len();
            ws.net_divergences(&mut r);
            let sel = selector
                .select(&ws.context(&r))
                .ok_or(NJError::NoCandidate(n))?;
            let d = ws.distance(sel.i, sel.j);
            let (len_i, len_j) = self.branch_lengths(d, r[sel.i], r[sel.j], n);

            let node = builder.join(ws.slot(sel.i), ws.slot(sel.j), len_i, len_j);
            if let Some([a, b]) = &node.children {
                self.log_join(&a.name, &b.name, d, &node.name);
            }
            ws.merge(sel.i, sel.j)?;
        }

        let d = ws.distance(0, 1);
        let len = self.clamp(self.options.round(d / 2.0));
        let tree = builder.finalize_root(ws.slot(0), ws.slot(1), len);
        if let Some([a, b]) = &tree.root().children {
            self.log_join(&a.name, &b.name, d, &tree.root().name);
        }
        debug!(taxa = n0, "neighbor joining finished");
        Ok(tree)
    }

    /// Runs every matrix independently on the rayon pool.
    ///
    /// Results come back in input order; a failing matrix does not affect
    /// the others.
    pub fn execute_batch(&self, matrices: Vec<DistanceMatrix>) -> Vec<Result<Tree>> {
        matrices.into_par_iter().map(|m| self.execute(m)).collect()
    }

    /// Lengths of the branches from the new node to `i` and to `j`.
    ///
    /// The second length is derived from the first after rounding, so the two
    /// still add up to `d`.
    fn branch_lengths(&self, d: f64, r_i: f64, r_j: f64, n: usize) -> (f64, f64) {
        let raw_i = 0.5 * d + (r_i - r_j) / (2.0 * (n - 2) as f64);
        let len_i = self.clamp(self.options.round(raw_i));
        let len_j = self.clamp(self.options.round(d - len_i));
        (len_i, len_j)
    }

    fn clamp(&self, len: f64) -> f64 {
        match self.options.negative_lengths {
            NegativeLengths::Clamp => len.max(0.0),
            NegativeLengths::Keep => len,
        }
    }

    fn log_join(&self, a: &str, b: &str, d: f64, node: &str) {
        if self.options.verbose {
            info!("{a} joins {b} at distance {d} -> {node}");
        } else {
            trace!("{a} joins {b} at distance {d} -> {node}");
        }
    }
}
