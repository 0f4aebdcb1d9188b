#![allow(dead_code)]

mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from modelserve for tests
pub use modelserve::config::{Config, DigitsConfig, RegressionConfig, ServerConfig, SizeFitConfig};
pub use modelserve::detection::{DigitReader, SegmentationParams};
pub use modelserve::server::{router, Service};
pub use modelserve::services::{
    DigitsService, RegressionArtifacts, RegressionService, SizeFitArtifacts, SizeFitService, Upload,
};
pub use modelserve::tabular::{
    CategoricalImputer, FeatureSchema, HandleUnknown, LabelEncoder, NumericImputer, OneHotEncoder,
    Scaler,
};
pub use modelserve::{Model, TransformError};
