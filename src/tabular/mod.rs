//! Fitted preprocessing transforms for tabular input.
//!
//! Each artifact is a JSON document holding the statistics a transformer
//! learned at fit time. Applying one is a pure function of that state and
//! the input row.

mod encoder;
mod imputer;
mod record;
mod scaler;

pub use encoder::{HandleUnknown, LabelEncoder, OneHotEncoder};
pub use imputer::{CategoricalImputer, NumericImputer};
pub use record::{parse_categorical, parse_numeric, FeatureSchema, Record};
pub use scaler::Scaler;

use crate::error::TransformError;

pub(crate) fn check_width(
    transformer: &'static str,
    expected: usize,
    found: usize,
) -> Result<(), TransformError> {
    if expected != found {
        return Err(TransformError::FeatureCount {
            transformer,
            expected,
            found,
        });
    }
    Ok(())
}
