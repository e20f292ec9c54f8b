//! Per-column sorted index of pairwise distances.
//!
//! Column `j` holds every active row `i < j` keyed by `d(i, j)`. Keys are
//! distances scaled by [`KEY_SCALE`] and rounded to integers so equal
//! distances share a bucket. Walking a column in key order visits candidate
//! partners from closest to farthest, which lets the search stop early once
//! no remaining bucket can beat the best criterion value found so far.

use std::collections::BTreeMap;
use std::ops::ControlFlow;

use crate::active::ActiveSetMapper;
use crate::error::{NJError, Result};
use crate::matrix::DistanceMatrix;

pub const KEY_SCALE: f64 = 1_000_000.0;

/// Integer key for a distance. Monotone in `value`.
pub fn key_of(value: f64) -> i64 {
    (value * KEY_SCALE).round() as i64
}

/// A distance no larger than any value that maps to `key`.
pub fn key_floor(key: i64) -> f64 {
    (key - 1) as f64 / KEY_SCALE
}

#[derive(Clone, Debug, Default)]
pub struct CandidateIndex {
    columns: Vec<BTreeMap<i64, Vec<usize>>>,
}

impl CandidateIndex {
    /// Indexes the whole lower triangle of `matrix`.
    pub fn initialize(matrix: &DistanceMatrix) -> Self {
        let columns = (0..matrix.size())
            .map(|j| {
                let mut col: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
                for i in 0..j {
                    col.entry(key_of(matrix.get(i, j))).or_default().push(i);
                }
                col
            })
            .collect();
        Self { columns }
    }

    /// Records that row `partner` sits at distance `value` in `column`.
    ///
    /// Partners within a key stay sorted. Adding a pairing that is already
    /// present means the index has drifted from the matrix and is an error.
    pub fn add_pairing(&mut self, value: f64, partner: usize, column: usize) -> Result<()> {
        let key = key_of(value);
        let partners = self.columns[column].entry(key).or_default();
        match partners.binary_search(&partner) {
            Ok(_) => Err(NJError::IndexDesync {
                column,
                key,
                partner,
            }),
            Err(pos) => {
                partners.insert(pos, partner);
                Ok(())
            }
        }
    }

    /// Removes an existing pairing; the key and partner must both be present.
    pub fn remove_pairing(&mut self, value: f64, partner: usize, column: usize) -> Result<()> {
        let key = key_of(value);
        let desync = || NJError::IndexDesync {
            column,
            key,
            partner,
        };
        let col = &mut self.columns[column];
        let partners = col.get_mut(&key).ok_or_else(desync)?;
        let pos = partners.binary_search(&partner).map_err(|_| desync())?;
        partners.remove(pos);
        if partners.is_empty() {
            col.remove(&key);
        }
        Ok(())
    }

    /// Scans `column` in ascending key order and returns the row with the
    /// smallest value produced by `value_fn`, along with that value.
    ///
    /// `value_fn(row, floor, best)` receives the lowest distance the current
    /// bucket can hold and the best value seen so far in this column. It
    /// returns `Continue(value)` to score the row or `Break(())` to end the
    /// scan. Ties keep the first row reached.
    pub fn minimum_over_column<F>(&self, column: usize, mut value_fn: F) -> Option<(usize, f64)>
    where
        F: FnMut(usize, f64, f64) -> ControlFlow<(), f64>,
    {
        let mut best: Option<(usize, f64)> = None;
        for (&key, partners) in &self.columns[column] {
            let floor = key_floor(key);
            for &row in partners {
                let so_far = best.map_or(f64::INFINITY, |(_, v)| v);
                match value_fn(row, floor, so_far) {
                    ControlFlow::Continue(v) if v < so_far => best = Some((row, v)),
                    ControlFlow::Continue(_) => {}
                    ControlFlow::Break(()) => return best,
                }
            }
        }
        best
    }

    /// Entries of `column` as `(key, partners)` in ascending key order.
    pub fn entries(&self, column: usize) -> impl Iterator<Item = (i64, &[usize])> + '_ {
        self.columns[column].iter().map(|(&k, v)| (k, v.as_slice()))
    }

    pub fn pairing_count(&self) -> usize {
        self.columns
            .iter()
            .flat_map(|c| c.values())
            .map(|v| v.len())
            .sum()
    }

    /// Verifies the index mirrors `matrix` over the active slots exactly:
    /// every active pair is present under its current key, and nothing else is.
    pub fn check_against(&self, matrix: &DistanceMatrix, active: &ActiveSetMapper) -> Result<()> {
        let slots = active.slots();
        for (b, &j) in slots.iter().enumerate() {
            for &i in &slots[..b] {
                let key = key_of(matrix.get(i, j));
                let found = self.columns[j]
                    .get(&key)
                    .map_or(false, |p| p.binary_search(&i).is_ok());
                if !found {
                    return Err(NJError::IndexDesync {
                        column: j,
                        key,
                        partner: i,
                    });
                }
            }
        }
        for (j, col) in self.columns.iter().enumerate() {
            for (&key, partners) in col {
                let stale = partners.iter().find(|&&i| {
                    i >= j
                        || !active.is_occupied(i)
                        || !active.is_occupied(j)
                        || key_of(matrix.get(i, j)) != key
                });
                if let Some(&partner) = stale {
                    return Err(NJError::IndexDesync {
                        column: j,
                        key,
                        partner,
                    });
                }
            }
        }
        Ok(())
    }
}
