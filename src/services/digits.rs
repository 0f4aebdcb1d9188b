use std::path::Path;
use std::sync::Arc;

use image::DynamicImage;

use super::{load_component, load_model};
use crate::config::DigitsConfig;
use crate::detection::{DigitReader, SegmentationParams};
use crate::error::ServiceError;
use crate::inference::Model;
use crate::models::DigitReading;

/// An uploaded file as received from the client
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Reads handwritten digit sequences from uploaded images
pub struct DigitsService {
    reader: Option<DigitReader>,
    allowed_extensions: Vec<String>,
}

impl DigitsService {
    pub const NOT_LOADED: &'static str = "Model not loaded.";

    pub fn new(model: Option<Arc<dyn Model>>, params: &SegmentationParams) -> Self {
        Self {
            reader: model.map(|m| DigitReader::new(params, m)),
            allowed_extensions: DigitsConfig::default().allowed_extensions,
        }
    }

    pub fn with_allowed_extensions(mut self, extensions: Vec<String>) -> Self {
        self.allowed_extensions = extensions;
        self
    }

    pub fn load(config: &DigitsConfig) -> Self {
        let model = load_component("Digit classifier", &config.model, load_model);
        Self::new(model, &config.segmentation)
            .with_allowed_extensions(config.allowed_extensions.clone())
    }

    pub fn is_ready(&self) -> bool {
        self.reader.is_some()
    }

    pub fn is_allowed_file(&self, file_name: &str) -> bool {
        Path::new(file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                self.allowed_extensions
                    .iter()
                    .any(|allowed| allowed.eq_ignore_ascii_case(ext))
            })
    }

    fn decode_upload(&self, upload: Option<Upload>) -> anyhow::Result<DynamicImage> {
        let Some(upload) = upload else {
            anyhow::bail!("No file part");
        };
        if upload.file_name.is_empty() {
            anyhow::bail!("No selected file");
        }
        if !self.is_allowed_file(&upload.file_name) {
            anyhow::bail!("File type not allowed");
        }
        image::load_from_memory(&upload.bytes).map_err(|e| {
            tracing::debug!("failed to decode '{}': {}", upload.file_name, e);
            anyhow::anyhow!("Could not load the image.")
        })
    }

    pub fn predict(&self, upload: Option<Upload>) -> Result<DigitReading, ServiceError> {
        let reader = self
            .reader
            .as_ref()
            .ok_or(ServiceError::NotLoaded(Self::NOT_LOADED))?;
        let img = self.decode_upload(upload)?;
        tracing::debug!("decoded upload: {}x{}", img.width(), img.height());
        Ok(reader.read(img)?)
    }
}
