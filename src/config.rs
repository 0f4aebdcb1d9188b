use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::detection::SegmentationParams;
use crate::tabular::FeatureSchema;

/// Service configuration, usually read from a TOML file.
/// Every field has a default, so an empty file is valid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub size_fit: SizeFitConfig,
    pub regression: RegressionConfig,
    pub digits: DigitsConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    /// Answer cross-origin requests from any origin
    pub cors: bool,
    pub max_upload_bytes: usize,
    /// Emit logs as JSON lines instead of the compact text format
    pub json_logs: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 5000)),
            cors: true,
            max_upload_bytes: 10 * 1024 * 1024,
            json_logs: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SizeFitConfig {
    pub num_imputer: PathBuf,
    pub num_scaler: PathBuf,
    pub cat_imputer: PathBuf,
    pub cat_onehot: PathBuf,
    pub label_encoder: PathBuf,
    pub model: PathBuf,
    /// Request fields fed to the model
    pub schema: FeatureSchema,
}

impl Default for SizeFitConfig {
    fn default() -> Self {
        Self {
            num_imputer: "num_imputer.json".into(),
            num_scaler: "num_scaler.json".into(),
            cat_imputer: "cat_imputer.json".into(),
            cat_onehot: "cat_onehot.json".into(),
            label_encoder: "label_encoder.json".into(),
            model: "keras_model.rten".into(),
            schema: FeatureSchema::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegressionConfig {
    pub model: PathBuf,
    pub scaler_x: PathBuf,
    pub scaler_y: PathBuf,
    /// Read `{"features": [...]}` from this file when a request has no body
    pub input_file: Option<PathBuf>,
    /// Undo the `log1p` applied to the target at training time
    pub apply_expm1: bool,
}

impl Default for RegressionConfig {
    fn default() -> Self {
        Self {
            model: "modelos/modelo_baleares71R2.rten".into(),
            scaler_x: "modelos/scaler_X.json".into(),
            scaler_y: "modelos/scaler_y.json".into(),
            input_file: None,
            apply_expm1: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DigitsConfig {
    pub model: PathBuf,
    pub allowed_extensions: Vec<String>,
    pub segmentation: SegmentationParams,
}

impl Default for DigitsConfig {
    fn default() -> Self {
        Self {
            model: "modelCNNnum.rten".into(),
            allowed_extensions: vec!["png".into(), "jpg".into(), "jpeg".into()],
            segmentation: SegmentationParams::default(),
        }
    }
}

impl Config {
    /// Load from a TOML file, or use the defaults when no path is given
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_toml(text: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(text)?)
    }
}
