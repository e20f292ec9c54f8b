//! Symmetric distance matrix with one label per row.

use crate::error::{NJError, Result};

/// Smallest matrix the engine accepts; two taxa are joined directly by the caller.
pub const MIN_TAXA: usize = 3;

const SYMMETRY_TOLERANCE: f64 = 1e-9;

/// Lower-triangular distance matrix.
///
/// Only the `i > j` entries are stored, packed into a flat `Vec`; `get(i, j)`
/// and `get(j, i)` read the same cell so callers never have to pick a half.
/// The size is fixed at construction. During a run the engine overwrites cells
/// in place as taxa merge.
#[derive(Clone, Debug)]
pub struct DistanceMatrix {
    data: Vec<f64>,
    labels: Vec<String>,
}

impl DistanceMatrix {
    /// An all-zero matrix for the given taxa.
    pub fn new(labels: Vec<String>) -> Result<Self> {
        let n = labels.len();
        if n < MIN_TAXA {
            return Err(NJError::TooFewTaxa {
                min: MIN_TAXA,
                found: n,
            });
        }
        Ok(Self {
            data: vec![0.0; n * (n - 1) / 2],
            labels,
        })
    }

    /// Builds a matrix from full square rows, validating shape, symmetry and values.
    pub fn from_rows(labels: Vec<String>, rows: &[Vec<f64>]) -> Result<Self> {
        check_rows(&labels, rows)?;
        let mut m = Self::new(labels)?;
        for (i, row) in rows.iter().enumerate() {
            for (j, &value) in row.iter().enumerate().take(i) {
                m.set(i, j, value);
            }
        }
        Ok(m)
    }

    pub fn size(&self) -> usize {
        self.labels.len()
    }

    pub fn label(&self, i: usize) -> &str {
        &self.labels[i]
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    fn idx(&self, i: usize, j: usize) -> usize {
        let (i, j) = if i > j { (i, j) } else { (j, i) };
        i * (i - 1) / 2 + j
    }

    /// Distance between `i` and `j`; the diagonal reads as zero.
    pub fn get(&self, i: usize, j: usize) -> f64 {
        if i == j {
            0.0
        } else {
            self.data[self.idx(i, j)]
        }
    }

    /// Overwrites the distance between `i` and `j`.
    ///
    /// # Panics
    /// Panics if `i == j`.
    pub fn set(&mut self, i: usize, j: usize, val: f64) {
        assert!(i != j, "attempt to set diagonal entry ({i}, {i})");
        let index = self.idx(i, j);
        self.data[index] = val;
    }

    /// Checks every off-diagonal value is finite and non-negative.
    pub fn validate(&self) -> Result<()> {
        if self.size() < MIN_TAXA {
            return Err(NJError::TooFewTaxa {
                min: MIN_TAXA,
                found: self.size(),
            });
        }
        for i in 1..self.size() {
            for j in 0..i {
                check_value(i, j, self.get(i, j))?;
            }
        }
        Ok(())
    }

    /// Square PHYLIP rendering: size line, then one padded label and row per taxon.
    ///
    /// # Errors
    /// Fails on an empty label or one containing whitespace, which the
    /// format cannot represent.
    pub fn to_phylip(&self) -> Result<String> {
        let n = self.size();
        let mut out = format!("    {n}\n");
        for (row, label) in self.labels.iter().enumerate() {
            if label.is_empty() || label.contains(char::is_whitespace) {
                return Err(NJError::UnwritableLabel {
                    row,
                    label: label.clone(),
                });
            }
            out.push_str(&format!("{label:<10}  "));
            let values: Vec<String> = (0..n).map(|col| format!("{:.6}", self.get(row, col))).collect();
            out.push_str(&values.join("  "));
            out.push('\n');
        }
        Ok(out)
    }
}

/// Shape, symmetry and value checks shared by every way of supplying raw rows.
pub(crate) fn check_rows(labels: &[String], rows: &[Vec<f64>]) -> Result<()> {
    if labels.len() != rows.len() {
        return Err(NJError::LabelCountMismatch {
            labels: labels.len(),
            rows: rows.len(),
        });
    }
    let n = rows.len();
    if let Some(row) = rows.iter().position(|r| r.len() != n) {
        return Err(NJError::NotSquare {
            row,
            len: rows[row].len(),
            expected: n,
        });
    }
    for (i, row) in rows.iter().enumerate() {
        for j in 0..i {
            let (a, b) = (row[j], rows[j][i]);
            check_value(i, j, a)?;
            check_value(j, i, b)?;
            if (a - b).abs() > SYMMETRY_TOLERANCE * a.abs().max(1.0) {
                return Err(NJError::Asymmetric { i, j, a, b });
            }
        }
        if row[i] != 0.0 {
            return Err(NJError::InvalidDistance {
                i,
                j: i,
                value: row[i],
            });
        }
    }
    Ok(())
}

pub(crate) fn check_value(i: usize, j: usize, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(NJError::InvalidDistance { i, j, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(n: &[&str]) -> Vec<String> {
        n.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_distmat_set_get_and_size() {
        let mut m = DistanceMatrix::new(names(&["A", "B", "C"])).unwrap();
        assert_eq!(m.size(), 3);
        assert_eq!(m.get(0, 1), 0.0);
        m.set(0, 1, 0.25);
        m.set(2, 1, 0.75);
        assert_eq!(m.get(0, 1), 0.25);
        assert_eq!(m.get(1, 0), 0.25);
        assert_eq!(m.get(2, 1), 0.75);
        assert_eq!(m.get(1, 2), 0.75);
        assert_eq!(m.get(1, 1), 0.0);
        assert_eq!(m.label(2), "C");
    }

    #[test]
    fn test_too_small_rejected() {
        let err = DistanceMatrix::new(names(&["A", "B"])).unwrap_err();
        assert!(matches!(err, NJError::TooFewTaxa { min: 3, found: 2 }));
    }

    #[test]
    #[should_panic]
    fn test_set_diagonal_panics() {
        let mut m = DistanceMatrix::new(names(&["A", "B", "C"])).unwrap();
        m.set(1, 1, 0.5);
    }

    #[test]
    fn test_from_rows() {
        let rows = vec![
            vec![0.0, 5.0, 9.0],
            vec![5.0, 0.0, 10.0],
            vec![9.0, 10.0, 0.0],
        ];
        let m = DistanceMatrix::from_rows(names(&["A", "B", "C"]), &rows).unwrap();
        assert_eq!(m.get(0, 2), 9.0);
        assert_eq!(m.get(2, 1), 10.0);
    }

    #[test]
    fn test_from_rows_rejects_bad_input() {
        let labels = names(&["A", "B", "C"]);
        let asym = vec![
            vec![0.0, 5.0, 9.0],
            vec![5.5, 0.0, 10.0],
            vec![9.0, 10.0, 0.0],
        ];
        assert!(matches!(
            DistanceMatrix::from_rows(labels.clone(), &asym),
            Err(NJError::Asymmetric { i: 1, j: 0, .. })
        ));

        let ragged = vec![vec![0.0, 5.0, 9.0], vec![5.0, 0.0], vec![9.0, 10.0, 0.0]];
        assert!(matches!(
            DistanceMatrix::from_rows(labels.clone(), &ragged),
            Err(NJError::NotSquare { row: 1, .. })
        ));

        let negative = vec![
            vec![0.0, -1.0, 9.0],
            vec![-1.0, 0.0, 10.0],
            vec![9.0, 10.0, 0.0],
        ];
        assert!(matches!(
            DistanceMatrix::from_rows(labels.clone(), &negative),
            Err(NJError::InvalidDistance { .. })
        ));

        let nan = vec![
            vec![0.0, 1.0, f64::NAN],
            vec![1.0, 0.0, 10.0],
            vec![f64::NAN, 10.0, 0.0],
        ];
        assert!(matches!(
            DistanceMatrix::from_rows(labels.clone(), &nan),
            Err(NJError::InvalidDistance { .. })
        ));

        let diagonal = vec![
            vec![0.0, 1.0, 2.0],
            vec![1.0, 0.3, 10.0],
            vec![2.0, 10.0, 0.0],
        ];
        assert!(matches!(
            DistanceMatrix::from_rows(labels, &diagonal),
            Err(NJError::InvalidDistance { i: 1, j: 1, .. })
        ));

        let square = vec![vec![0.0; 3]; 3];
        assert!(matches!(
            DistanceMatrix::from_rows(names(&["A", "B"]), &square),
            Err(NJError::LabelCountMismatch { labels: 2, rows: 3 })
        ));
    }

    #[test]
    fn test_validate_catches_values_set_directly() {
        let mut m = DistanceMatrix::new(names(&["A", "B", "C"])).unwrap();
        m.set(2, 0, f64::INFINITY);
        assert!(m.validate().is_err());
        m.set(2, 0, 1.0);
        assert!(m.validate().is_ok());
    }

    #[test]
    fn test_to_phylip() {
        let mut m = DistanceMatrix::new(names(&["A", "B", "C"])).unwrap();
        m.set(0, 1, 0.5);
        let s = m.to_phylip().unwrap();
        let lines: Vec<&str> = s.lines().collect();
        assert_eq!(lines[0], "    3");
        assert_eq!(lines[1], "A           0.000000  0.500000  0.000000");
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn test_to_phylip_rejects_unwritable_labels() {
        let m = DistanceMatrix::new(names(&["A", "", "C"])).unwrap();
        assert!(matches!(
            m.to_phylip(),
            Err(NJError::UnwritableLabel { row: 1, .. })
        ));

        let m = DistanceMatrix::new(names(&["A", "B", "Homo sapiens"])).unwrap();
        assert!(matches!(
            m.to_phylip(),
            Err(NJError::UnwritableLabel { row: 2, .. })
        ));
    }
}
