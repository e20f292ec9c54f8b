use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{NJError, Result};

/// Number of fractional digits kept on branch lengths, rounding half-up.
#[derive(Clone, Copy, Debug, PartialEq, Eq, TS, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[ts(export, export_to = "../../wasm/types/lib_types.ts", type = "number")]
pub struct Precision(u8);

impl Precision {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 9;

    pub fn new(digits: u8) -> Result<Self> {
        if (Self::MIN..=Self::MAX).contains(&digits) {
            Ok(Self(digits))
        } else {
            Err(NJError::PrecisionOutOfRange(digits))
        }
    }

    pub fn digits(self) -> u8 {
        self.0
    }

    /// Rounds half away from zero, which for branch lengths (almost always
    /// non-negative) is round-half-up.
    pub fn round(self, value: f64) -> f64 {
        let scale = 10f64.powi(self.0 as i32);
        (value * scale).round() / scale
    }
}

impl TryFrom<u8> for Precision {
    type Error = NJError;

    fn try_from(digits: u8) -> Result<Self> {
        Precision::new(digits)
    }
}

impl From<Precision> for u8 {
    fn from(p: Precision) -> u8 {
        p.0
    }
}

/// How the minimizing pair is searched for at each merge.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, TS, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "../../wasm/types/lib_types.ts")]
pub enum Strategy {
    /// Rescan every active pair.
    Naive,
    /// Walk the per-column sorted candidate index, stopping early per column.
    #[default]
    Indexed,
}

/// What to do with negative branch lengths produced on non-additive input.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, TS, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "../../wasm/types/lib_types.ts")]
pub enum NegativeLengths {
    #[default]
    Clamp,
    Keep,
}

/// Run options; immutable for the duration of a run and shared by batch workers.
#[derive(Clone, Debug, Default, PartialEq, TS, Serialize, Deserialize)]
#[serde(default)]
#[ts(export, export_to = "../../wasm/types/lib_types.ts")]
pub struct EngineOptions {
    pub precision: Option<Precision>,
    pub strategy: Strategy,
    pub negative_lengths: NegativeLengths,
    pub verbose: bool,
}

impl EngineOptions {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Applies the rounding policy, if any.
    pub fn round(&self, value: f64) -> f64 {
        match self.precision {
            Some(p) => p.round(value),
            None => value,
        }
    }

    /// Decimals used when printing branch lengths.
    pub fn newick_decimals(&self) -> usize {
        self.precision.map_or(3, |p| p.digits() as usize)
    }
}

/// Input payload for [`crate::nj`], shared with the wasm and python bindings.
#[derive(Serialize, Deserialize, TS, Clone, Debug)]
#[ts(export, export_to = "../../wasm/types/lib_types.ts")]
pub struct NJConfig {
    pub labels: Vec<String>,
    /// Full square matrix, row-major.
    pub distances: Vec<Vec<f64>>,
    #[serde(default)]
    pub options: EngineOptions,
    #[serde(default)]
    pub hide_internal: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precision_exports_as_number() {
        assert_eq!(Precision::inline(), "number");
    }

    #[test]
    fn test_precision_bounds() {
        assert!(Precision::new(0).is_err());
        assert!(Precision::new(10).is_err());
        assert_eq!(Precision::new(1).unwrap().digits(), 1);
        assert_eq!(Precision::new(9).unwrap().digits(), 9);
    }

    #[test]
    fn test_precision_rounds_half_up() {
        let p = Precision::new(1).unwrap();
        assert_eq!(p.round(0.25), 0.3);
        assert_eq!(p.round(0.24), 0.2);
        assert_eq!(p.round(2.0), 2.0);
        let p = Precision::new(3).unwrap();
        assert!((p.round(1.23456) - 1.235).abs() < 1e-12);
    }

    #[test]
    fn test_options_default() {
        let o = EngineOptions::default();
        assert_eq!(o.precision, None);
        assert_eq!(o.strategy, Strategy::Indexed);
        assert_eq!(o.negative_lengths, NegativeLengths::Clamp);
        assert!(!o.verbose);
        assert_eq!(o.round(0.123456), 0.123456);
        assert_eq!(o.newick_decimals(), 3);
    }

    #[test]
    fn test_options_from_toml() {
        let o = EngineOptions::from_toml_str(
            "precision = 4\nstrategy = \"naive\"\nnegative_lengths = \"keep\"\nverbose = true\n",
        )
        .unwrap();
        assert_eq!(o.precision, Some(Precision::new(4).unwrap()));
        assert_eq!(o.strategy, Strategy::Naive);
        assert_eq!(o.negative_lengths, NegativeLengths::Keep);
        assert!(o.verbose);
        assert_eq!(o.newick_decimals(), 4);
    }

    #[test]
    fn test_options_toml_partial_uses_defaults() {
        let o = EngineOptions::from_toml_str("verbose = true\n").unwrap();
        assert_eq!(o.strategy, Strategy::Indexed);
        assert_eq!(o.precision, None);
    }

    #[test]
    fn test_options_toml_rejects_bad_precision() {
        let err = EngineOptions::from_toml_str("precision = 11\n").unwrap_err();
        assert!(matches!(err, NJError::Config(_)));
    }
}
