//! Minimum-criterion search over the active pairs.
//!
//! Both searches minimize `Q(i, j) = d(i, j) - (r[i] + r[j]) / (n - 2)` and
//! resolve ties the same way: lowest column `j`, then lowest distance key,
//! then lowest row `i` (all logical). Swapping one for the other never changes
//! the resulting tree.

use std::ops::ControlFlow;

use crate::active::ActiveSetMapper;
use crate::candidates::{key_of, CandidateIndex};
use crate::config::Strategy;
use crate::matrix::DistanceMatrix;

/// Pair chosen for the next join, in logical indices with `i < j`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Selection {
    pub i: usize,
    pub j: usize,
    pub q: f64,
}

/// Read-only view of one iteration's state.
pub struct SearchContext<'a> {
    pub matrix: &'a DistanceMatrix,
    pub index: &'a CandidateIndex,
    pub active: &'a ActiveSetMapper,
    /// Net divergence per logical index.
    pub r: &'a [f64],
}

impl SearchContext<'_> {
    pub fn n(&self) -> usize {
        self.active.len()
    }

    pub fn distance(&self, i: usize, j: usize) -> f64 {
        self.matrix
            .get(self.active.to_storage(i), self.active.to_storage(j))
    }

    /// Neighbor-joining criterion for logical pair `(i, j)` at distance `d`.
    pub fn criterion(&self, i: usize, j: usize, d: f64) -> f64 {
        d - (self.r[i] + self.r[j]) / (self.n() - 2) as f64
    }
}

pub trait PairSelector: Send + Sync {
    fn select(&self, ctx: &SearchContext<'_>) -> Option<Selection>;
}

/// Evaluates every active pair.
#[derive(Clone, Copy, Debug, Default)]
pub struct NaiveScan;

impl PairSelector for NaiveScan {
    fn select(&self, ctx: &SearchContext<'_>) -> Option<Selection> {
        let mut best: Option<(Selection, i64)> = None;
        for j in 1..ctx.n() {
            for i in 0..j {
                let d = ctx.distance(i, j);
                let q = ctx.criterion(i, j, d);
                let key = key_of(d);
                let better = match &best {
                    None => true,
                    Some((b, b_key)) => q < b.q || (q == b.q && b.j == j && key < *b_key),
                };
                if better {
                    best = Some((Selection { i, j, q }, key));
                }
            }
        }
        best.map(|(s, _)| s)
    }
}

/// Walks each column of the candidate index from the closest partner
/// outwards and abandons the column once even the most favourable
/// divergence cannot beat the current best.
#[derive(Clone, Copy, Debug, Default)]
pub struct IndexedScan;

impl PairSelector for IndexedScan {
    fn select(&self, ctx: &SearchContext<'_>) -> Option<Selection> {
        let n_minus_2 = (ctx.n() - 2) as f64;
        let r_max = ctx.r.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mut best: Option<Selection> = None;
        for j in 1..ctx.n() {
            let slot_j = ctx.active.to_storage(j);
            let r_j = ctx.r[j];
            let global = best.map_or(f64::INFINITY, |b| b.q);
            let found = ctx.index.minimum_over_column(slot_j, |slot_i, floor, so_far| {
                if floor - (r_max + r_j) / n_minus_2 > so_far.min(global) {
                    return ControlFlow::Break(());
                }
                let i = ctx.active.to_logical(slot_i);
                ControlFlow::Continue(ctx.criterion(i, j, ctx.matrix.get(slot_i, slot_j)))
            });
            if let Some((slot_i, q)) = found {
                if q < global {
                    best = Some(Selection {
                        i: ctx.active.to_logical(slot_i),
                        j,
                        q,
                    });
                }
            }
        }
        best
    }
}

pub fn selector_for(strategy: Strategy) -> &'static dyn PairSelector {
    match strategy {
        Strategy::Naive => &NaiveScan,
        Strategy::Indexed => &IndexedScan,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn random_matrix(n: usize, seed: u64, grid: Option<f64>) -> DistanceMatrix {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut m = DistanceMatrix::new((0..n).map(|i| format!("T{i}")).collect()).unwrap();
        for i in 1..n {
            for j in 0..i {
                let v: f64 = rng.gen_range(0.0..1.0);
                // coarse grids force many ties
                let v = grid.map_or(v, |g| (v / g).round() * g);
                m.set(i, j, v);
            }
        }
        m
    }

    fn net_divergences(m: &DistanceMatrix, active: &ActiveSetMapper) -> Vec<f64> {
        let slots = active.slots();
        slots
            .iter()
            .map(|&a| {
                slots
                    .iter()
                    .filter(|&&b| b != a)
                    .map(|&b| m.get(a, b))
                    .sum()
            })
            .collect()
    }

    fn check_agreement(m: &DistanceMatrix, active: &ActiveSetMapper) {
        let mut index = CandidateIndex::initialize(m);
        // drop pairings of removed slots so the index mirrors the active set
        for j in 0..m.size() {
            for i in 0..j {
                if !active.is_occupied(i) || !active.is_occupied(j) {
                    index.remove_pairing(m.get(i, j), i, j).unwrap();
                }
            }
        }
        index.check_against(m, active).unwrap();
        let r = net_divergences(m, active);
        let ctx = SearchContext {
            matrix: m,
            index: &index,
            active,
            r: &r,
        };
        let naive = NaiveScan.select(&ctx).unwrap();
        let indexed = IndexedScan.select(&ctx).unwrap();
        assert_eq!(naive, indexed);
        assert_eq!(naive.q, ctx.criterion(naive.i, naive.j, ctx.distance(naive.i, naive.j)));
    }

    #[test]
    fn test_classic_four_taxa_selects_first_cherry() {
        let labels = ["A", "B", "C", "D"].iter().map(|s| s.to_string()).collect();
        let rows = vec![
            vec![0.0, 5.0, 9.0, 9.0],
            vec![5.0, 0.0, 10.0, 10.0],
            vec![9.0, 10.0, 0.0, 8.0],
            vec![9.0, 10.0, 8.0, 0.0],
        ];
        let m = DistanceMatrix::from_rows(labels, &rows).unwrap();
        let active = ActiveSetMapper::new(4);
        let index = CandidateIndex::initialize(&m);
        let r = net_divergences(&m, &active);
        assert_eq!(r, vec![23.0, 25.0, 27.0, 27.0]);
        let ctx = SearchContext {
            matrix: &m,
            index: &index,
            active: &active,
            r: &r,
        };
        // (A, B) and (C, D) both reach -19; the lower column wins
        for selector in [selector_for(Strategy::Naive), selector_for(Strategy::Indexed)] {
            let s = selector.select(&ctx).unwrap();
            assert_eq!((s.i, s.j, s.q), (0, 1, -19.0));
        }
    }

    #[test]
    fn test_strategies_agree_on_random_matrices() {
        for seed in 0..40 {
            let n = 3 + (seed as usize % 12);
            check_agreement(&random_matrix(n, seed, None), &ActiveSetMapper::new(n));
        }
    }

    #[test]
    fn test_strategies_agree_with_ties() {
        for seed in 0..40 {
            let n = 4 + (seed as usize % 9);
            check_agreement(&random_matrix(n, seed, Some(0.25)), &ActiveSetMapper::new(n));
        }
    }

    #[test]
    fn test_strategies_agree_on_compacted_active_set() {
        let m = random_matrix(10, 7, Some(0.1));
        let mut active = ActiveSetMapper::new(10);
        active.remove(3);
        active.remove(0);
        active.remove(5);
        check_agreement(&m, &active);
    }

    #[test]
    fn test_uniform_matrix_picks_first_pair() {
        let m = DistanceMatrix::new((0..6).map(|i| format!("T{i}")).collect()).unwrap();
        let active = ActiveSetMapper::new(6);
        let index = CandidateIndex::initialize(&m);
        let r = vec![0.0; 6];
        let ctx = SearchContext {
            matrix: &m,
            index: &index,
            active: &active,
            r: &r,
        };
        let s = IndexedScan.select(&ctx).unwrap();
        assert_eq!((s.i, s.j), (0, 1));
    }
}
