//! The three prediction services, independent of the HTTP layer.
//!
//! Each service loads its artifacts once. If any artifact is missing or
//! invalid the service still starts, but every prediction fails with
//! [`ServiceError::NotLoaded`](crate::error::ServiceError::NotLoaded).

mod digits;
mod regression;
mod size_fit;

pub use digits::{DigitsService, Upload};
pub use regression::{RegressionArtifacts, RegressionInput, RegressionPrediction, RegressionService};
pub use size_fit::{SizeFitArtifacts, SizeFitPrediction, SizeFitService};

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use serde::de::DeserializeOwned;

use crate::inference::{Model, RtenModel};
use crate::tabular::Scaler;

/// Which service a process runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ServiceKind {
    /// Garment size-fit classifier over a JSON record
    SizeFit,
    /// Log-target regression over a JSON feature vector
    Regression,
    /// Handwritten digit reader over an uploaded image
    Digits,
}

/// Read a JSON artifact into its typed form
pub fn load_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Failed to parse {}", path.display()))
}

pub fn load_scaler(path: &Path) -> anyhow::Result<Scaler> {
    let scaler: Scaler = load_json(path)?;
    scaler.validate()?;
    Ok(scaler)
}

pub fn load_model(path: &Path) -> anyhow::Result<Arc<dyn Model>> {
    Ok(Arc::new(RtenModel::load(path)?))
}

/// Load one component, logging the outcome. Failures are reported and
/// swallowed so the remaining components are still attempted.
pub(crate) fn load_component<T>(
    label: &str,
    path: &Path,
    load: impl FnOnce(&Path) -> anyhow::Result<T>,
) -> Option<T> {
    if !path.exists() {
        tracing::warn!("{} not found at '{}'", label, path.display());
        return None;
    }
    match load(path) {
        Ok(component) => {
            tracing::info!("{} loaded from '{}'", label, path.display());
            Some(component)
        }
        Err(e) => {
            tracing::error!("{} failed to load: {:#}", label, e);
            None
        }
    }
}

/// Run CPU-bound prediction work off the async runtime
pub(crate) async fn run_blocking<T, F>(f: F) -> Result<T, crate::error::ServiceError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, crate::error::ServiceError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| crate::error::ServiceError::Prediction(e.into()))?
}
