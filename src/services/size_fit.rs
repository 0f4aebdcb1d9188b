use std::sync::Arc;

use serde::Serialize;

use super::{load_component, load_json, load_model, load_scaler};
use crate::config::SizeFitConfig;
use crate::error::ServiceError;
use crate::inference::{self, Model};
use crate::tabular::{
    CategoricalImputer, FeatureSchema, LabelEncoder, NumericImputer, OneHotEncoder, Record, Scaler,
};

pub struct SizeFitArtifacts {
    pub num_imputer: NumericImputer,
    pub num_scaler: Scaler,
    pub cat_imputer: CategoricalImputer,
    pub cat_onehot: OneHotEncoder,
    pub label_encoder: LabelEncoder,
    pub model: Arc<dyn Model>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SizeFitPrediction {
    #[serde(rename = "feedback_ajuste")]
    pub fit_feedback: String,
}

/// Predicts how a garment will fit from body measurements and usual sizes
pub struct SizeFitService {
    artifacts: Option<SizeFitArtifacts>,
    schema: FeatureSchema,
}

impl SizeFitService {
    pub const NOT_LOADED: &'static str =
        "Model or encoders not loaded. Make sure every artifact file exists and is valid.";
    /// Extra context returned alongside a 400
    pub const INPUT_HINT: &'static str =
        "An error occurred during prediction. Make sure the input data is correct and complete.";

    pub fn new(artifacts: Option<SizeFitArtifacts>, schema: FeatureSchema) -> Self {
        Self { artifacts, schema }
    }

    pub fn load(config: &SizeFitConfig) -> Self {
        let num_imputer = load_component("Numeric imputer", &config.num_imputer, load_json::<NumericImputer>);
        let num_scaler = load_component("Numeric scaler", &config.num_scaler, load_scaler);
        let cat_imputer = load_component("Categorical imputer", &config.cat_imputer, load_json::<CategoricalImputer>);
        let cat_onehot = load_component("One-hot encoder", &config.cat_onehot, load_json::<OneHotEncoder>);
        let label_encoder = load_component("Label encoder", &config.label_encoder, load_json::<LabelEncoder>);
        let model = load_component("Size-fit model", &config.model, load_model);

        let artifacts = match (num_imputer, num_scaler, cat_imputer, cat_onehot, label_encoder, model) {
            (Some(num_imputer), Some(num_scaler), Some(cat_imputer), Some(cat_onehot), Some(label_encoder), Some(model)) => {
                tracing::info!("all size-fit components loaded; model ready");
                Some(SizeFitArtifacts {
                    num_imputer,
                    num_scaler,
                    cat_imputer,
                    cat_onehot,
                    label_encoder,
                    model,
                })
            }
            _ => None,
        };

        Self::new(artifacts, config.schema.clone())
    }

    pub fn is_ready(&self) -> bool {
        self.artifacts.is_some()
    }

    /// Predict from a raw request body (a JSON object of attributes)
    pub fn predict(&self, body: &[u8]) -> Result<SizeFitPrediction, ServiceError> {
        let artifacts = self
            .artifacts
            .as_ref()
            .ok_or(ServiceError::NotLoaded(Self::NOT_LOADED))?;

        let value: serde_json::Value = serde_json::from_slice(body)
            .map_err(|e| anyhow::anyhow!("Failed to decode JSON object: {}", e))?;
        let record = Record::from_json(&value, &self.schema)?;

        let numeric = artifacts.num_imputer.transform(&record.numeric)?;
        let numeric = artifacts.num_scaler.transform(&numeric)?;
        let categorical = artifacts.cat_imputer.transform(&record.categorical)?;
        let encoded = artifacts.cat_onehot.transform(&categorical)?;

        let features: Vec<f32> = numeric.iter().chain(&encoded).map(|&v| v as f32).collect();
        let probabilities = artifacts.model.predict(&[1, features.len()], features)?;
        let (class_index, probability) = inference::argmax(&probabilities)
            .ok_or_else(|| anyhow::anyhow!("Model returned no class probabilities"))?;
        let label = artifacts.label_encoder.inverse_transform(class_index)?;

        tracing::debug!(class_index, probability, label, "size-fit prediction");
        Ok(SizeFitPrediction {
            fit_feedback: label.to_string(),
        })
    }
}
