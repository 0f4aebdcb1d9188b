use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use super::{load_component, load_json, load_model, load_scaler};
use crate::config::RegressionConfig;
use crate::error::ServiceError;
use crate::inference::Model;
use crate::tabular::Scaler;

pub struct RegressionArtifacts {
    pub model: Arc<dyn Model>,
    pub scaler_x: Scaler,
    pub scaler_y: Scaler,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RegressionInput {
    pub features: Vec<f64>,
}

/// One row of predicted targets per input row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegressionPrediction {
    pub prediction: Vec<Vec<f64>>,
}

/// Regression over a scaled feature vector with a log-transformed target
pub struct RegressionService {
    artifacts: Option<RegressionArtifacts>,
    input_file: Option<PathBuf>,
    apply_expm1: bool,
}

impl RegressionService {
    pub const NOT_LOADED: &'static str = "Model or scalers not loaded.";

    pub fn new(artifacts: Option<RegressionArtifacts>) -> Self {
        Self {
            artifacts,
            input_file: None,
            apply_expm1: true,
        }
    }

    pub fn with_input_file(mut self, path: Option<PathBuf>) -> Self {
        self.input_file = path;
        self
    }

    pub fn with_expm1(mut self, apply: bool) -> Self {
        self.apply_expm1 = apply;
        self
    }

    pub fn load(config: &RegressionConfig) -> Self {
        let model = load_component("Regression model", &config.model, load_model);
        let scaler_x = load_component("Feature scaler", &config.scaler_x, load_scaler);
        let scaler_y = load_component("Target scaler", &config.scaler_y, load_scaler);

        let artifacts = match (model, scaler_x, scaler_y) {
            (Some(model), Some(scaler_x), Some(scaler_y)) => {
                tracing::info!("regression model and scalers loaded");
                Some(RegressionArtifacts {
                    model,
                    scaler_x,
                    scaler_y,
                })
            }
            _ => None,
        };

        Self::new(artifacts)
            .with_input_file(config.input_file.clone())
            .with_expm1(config.apply_expm1)
    }

    pub fn is_ready(&self) -> bool {
        self.artifacts.is_some()
    }

    /// Parse the request body, falling back to the configured input file
    /// when the body is empty
    fn read_input(&self, body: &[u8]) -> anyhow::Result<RegressionInput> {
        if body.iter().all(u8::is_ascii_whitespace) {
            if let Some(path) = &self.input_file {
                tracing::debug!("empty body; reading input from {}", path.display());
                return load_json(path);
            }
        }
        serde_json::from_slice(body).context("Failed to decode JSON input")
    }

    pub fn predict(&self, body: &[u8]) -> Result<RegressionPrediction, ServiceError> {
        let artifacts = self
            .artifacts
            .as_ref()
            .ok_or(ServiceError::NotLoaded(Self::NOT_LOADED))?;

        let input = self.read_input(body)?;
        let scaled = artifacts.scaler_x.transform(&input.features)?;

        let features: Vec<f32> = scaled.iter().map(|&v| v as f32).collect();
        let output = artifacts.model.predict(&[1, features.len()], features)?;

        let output: Vec<f64> = output.into_iter().map(f64::from).collect();
        let mut prediction = artifacts.scaler_y.inverse_transform(&output)?;
        if self.apply_expm1 {
            prediction.iter_mut().for_each(|v| *v = v.exp_m1());
        }

        tracing::debug!(?prediction, "regression prediction");
        Ok(RegressionPrediction {
            prediction: vec![prediction],
        })
    }
}
