//! Error type shared by every stage of tree construction.

use thiserror::Error;

/// Everything that can go wrong while building a tree.
///
/// Caller-side problems (bad input, bad options) are reported before any
/// merge happens. [`NJError::IndexDesync`] is different: it means the
/// candidate index stopped mirroring the distance matrix, and the run that
/// produced it must be discarded.
#[derive(Error, Debug)]
pub enum NJError {
    #[error("at least {min} taxa are required, found {found}")]
    TooFewTaxa { min: usize, found: usize },

    #[error("{labels} labels supplied for a matrix with {rows} rows")]
    LabelCountMismatch { labels: usize, rows: usize },

    #[error("row {row} has {len} values, expected {expected}")]
    NotSquare { row: usize, len: usize, expected: usize },

    #[error("matrix is not symmetric at ({i}, {j}): {a} != {b}")]
    Asymmetric { i: usize, j: usize, a: f64, b: f64 },

    #[error("invalid distance {value} at ({i}, {j})")]
    InvalidDistance { i: usize, j: usize, value: f64 },

    #[error("rounding precision must be between 1 and 9 fractional digits, got {0}")]
    PrecisionOutOfRange(u8),

    #[error("candidate index out of sync with distance matrix: column {column} key {key} partner {partner}")]
    IndexDesync { column: usize, key: i64, partner: usize },

    #[error("no joinable pair among {0} active taxa")]
    NoCandidate(usize),

    #[error("label {label:?} of row {row} cannot be written as PHYLIP: empty or contains whitespace")]
    UnwritableLabel { row: usize, label: String },

    #[error("PHYLIP parse error: {0}")]
    Parse(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl NJError {
    /// True for bookkeeping failures inside the engine rather than bad input.
    pub fn is_internal(&self) -> bool {
        matches!(self, NJError::IndexDesync { .. } | NJError::NoCandidate(_))
    }
}

impl From<toml::de::Error> for NJError {
    fn from(err: toml::de::Error) -> Self {
        NJError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, NJError>;
