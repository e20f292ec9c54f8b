//! Reader for square PHYLIP distance matrices.
//!
//! The first token is the number of taxa; each taxon then contributes its
//! label followed by one distance per taxon. Labels cannot contain
//! whitespace, and rows may wrap over several lines.

use crate::error::{NJError, Result};

/// Labels and full square rows, as read; validation happens when a
/// [`crate::DistanceMatrix`] is built from them.
#[derive(Clone, Debug, PartialEq)]
pub struct PhylipMatrix {
    pub labels: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

pub fn parse(input: &str) -> Result<PhylipMatrix> {
    let mut tokens = input.split_whitespace();
    let n: usize = tokens
        .next()
        .ok_or_else(|| NJError::Parse("input is empty".into()))?
        .parse()
        .map_err(|e| NJError::Parse(format!("invalid taxon count: {e}")))?;

    // The count is untrusted until the rows are read.
    let mut labels = Vec::new();
    let mut rows = Vec::new();
    for row in 0..n {
        let label = tokens
            .next()
            .ok_or_else(|| NJError::Parse(format!("expected {n} rows, found {row}")))?;
        let values = (0..n)
            .map(|col| {
                let tok = tokens.next().ok_or_else(|| {
                    NJError::Parse(format!("row {row} ({label}) has only {col} values"))
                })?;
                tok.parse::<f64>().map_err(|_| {
                    NJError::Parse(format!("row {row} ({label}): '{tok}' is not a number"))
                })
            })
            .collect::<Result<Vec<f64>>>()?;
        labels.push(label.to_string());
        rows.push(values);
    }
    if let Some(extra) = tokens.next() {
        return Err(NJError::Parse(format!("unexpected trailing token '{extra}'")));
    }
    Ok(PhylipMatrix { labels, rows })
}
