use serde::{Deserialize, Serialize};

use super::check_width;
use crate::error::TransformError;

/// What a one-hot encoder does with a category it was not fitted on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandleUnknown {
    #[default]
    Error,
    /// Encode as an all-zero block
    Ignore,
}

/// One indicator column per fitted category, per input column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OneHotEncoder {
    pub categories: Vec<Vec<String>>,
    #[serde(default)]
    pub handle_unknown: HandleUnknown,
}

impl OneHotEncoder {
    pub fn n_features(&self) -> usize {
        self.categories.len()
    }

    /// Width of the encoded output
    pub fn n_outputs(&self) -> usize {
        self.categories.iter().map(Vec::len).sum()
    }

    pub fn transform(&self, row: &[String]) -> Result<Vec<f64>, TransformError> {
        check_width("OneHotEncoder", self.n_features(), row.len())?;

        let mut out = Vec::with_capacity(self.n_outputs());
        for (column, (value, categories)) in row.iter().zip(&self.categories).enumerate() {
            let position = categories.iter().position(|c| c == value);
            if position.is_none() && self.handle_unknown == HandleUnknown::Error {
                return Err(TransformError::UnknownCategory {
                    column,
                    value: value.clone(),
                });
            }
            out.extend((0..categories.len()).map(|i| if Some(i) == position { 1.0 } else { 0.0 }));
        }
        Ok(out)
    }
}

/// Maps class indices back to class labels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelEncoder {
    pub classes: Vec<String>,
}

impl LabelEncoder {
    pub fn inverse_transform(&self, index: usize) -> Result<&str, TransformError> {
        self.classes
            .get(index)
            .map(String::as_str)
            .ok_or(TransformError::UnknownLabel {
                index,
                classes: self.classes.len(),
            })
    }
}
