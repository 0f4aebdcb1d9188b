pub mod config;
pub mod detection;
pub mod error;
pub mod inference;
pub mod logging;
pub mod models;
pub mod pipeline;
pub mod server;
pub mod services;
pub mod tabular;

pub use config::Config;
pub use detection::{DigitReader, SegmentationParams};
pub use error::{ServiceError, TransformError};
pub use inference::{Model, RtenModel};
pub use models::{Contour, DigitPrediction, DigitReading};
pub use pipeline::{
    BoundingBox, DebugConfig, MetadataValue, Pipeline, PipelineContext, PipelineData,
    PipelineExecutor, PipelineStep, WorkItem,
};
pub use services::ServiceKind;
