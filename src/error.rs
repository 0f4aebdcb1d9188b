use thiserror::Error;

/// Failures applying a fitted preprocessing artifact to input data
#[derive(Error, Debug, PartialEq)]
pub enum TransformError {
    #[error("X has {found} features, but {transformer} is expecting {expected} features as input")]
    FeatureCount {
        transformer: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("Found unknown category '{value}' in column {column} during transform")]
    UnknownCategory { column: usize, value: String },

    #[error("Input contains NaN in column {column} and no fill value is available")]
    MissingValue { column: usize },

    #[error("y contains previously unseen label index {index} ({classes} classes known)")]
    UnknownLabel { index: usize, classes: usize },

    #[error("could not convert string to float: '{0}'")]
    NotANumber(String),

    #[error("{field}: {message}")]
    InvalidField { field: String, message: String },
}

/// Outcome of a failed prediction request
#[derive(Error, Debug)]
pub enum ServiceError {
    /// One or more artifacts failed to load at startup
    #[error("{0}")]
    NotLoaded(&'static str),

    /// Anything that went wrong while parsing, transforming or predicting
    #[error(transparent)]
    Prediction(#[from] anyhow::Error),
}

impl From<TransformError> for ServiceError {
    fn from(err: TransformError) -> Self {
        ServiceError::Prediction(err.into())
    }
}
