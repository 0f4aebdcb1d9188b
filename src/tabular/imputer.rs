use serde::{Deserialize, Serialize};

use super::check_width;
use crate::error::TransformError;

/// Replaces missing numeric values with a per-column statistic (mean, median...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericImputer {
    /// How the statistics were computed at fit time; informational only
    #[serde(default)]
    pub strategy: Option<String>,
    pub statistics: Vec<f64>,
}

impl NumericImputer {
    pub fn n_features(&self) -> usize {
        self.statistics.len()
    }

    /// `None` and NaN entries are filled
    pub fn transform(&self, row: &[Option<f64>]) -> Result<Vec<f64>, TransformError> {
        check_width("NumericImputer", self.n_features(), row.len())?;
        row.iter()
            .zip(&self.statistics)
            .enumerate()
            .map(|(column, (value, fill))| match value {
                Some(v) if !v.is_nan() => Ok(*v),
                _ if fill.is_nan() => Err(TransformError::MissingValue { column }),
                _ => Ok(*fill),
            })
            .collect()
    }
}

/// Replaces missing categorical values with a per-column fill value
/// (usually the most frequent category)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalImputer {
    #[serde(default)]
    pub strategy: Option<String>,
    pub statistics: Vec<String>,
}

impl CategoricalImputer {
    pub fn n_features(&self) -> usize {
        self.statistics.len()
    }

    pub fn transform(&self, row: &[Option<String>]) -> Result<Vec<String>, TransformError> {
        check_width("CategoricalImputer", self.n_features(), row.len())?;
        Ok(row
            .iter()
            .zip(&self.statistics)
            .map(|(value, fill)| value.clone().unwrap_or_else(|| fill.clone()))
            .collect())
    }
}
