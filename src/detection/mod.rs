pub mod preprocessing;
pub mod contours;
pub mod steps;

use std::io::Cursor;
use std::sync::Arc;

use anyhow::Result;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use image::{DynamicImage, ImageFormat};
use serde::{Deserialize, Serialize};

use crate::inference::Model;
use crate::models::{DigitPrediction, DigitReading};
use crate::pipeline::{Pipeline, PipelineData};

/// Tunables of the digit segmentation pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationParams {
    /// Images brighter than this on average are inverted
    pub background_intensity_threshold: f64,
    pub binary_threshold: u8,
    pub min_contour_area: f64,
    pub confidence_threshold: f32,
    /// Border added around each region, as a fraction of its shorter side
    pub padding_ratio: f32,
    /// Side of the square classifier input
    pub target_size: u32,
    /// Feed the model `[1, H, W, 1]` (true) or `[1, 1, H, W]` (false)
    pub channels_last: bool,
}

impl Default for SegmentationParams {
    fn default() -> Self {
        Self {
            background_intensity_threshold: 128.0,
            binary_threshold: 127,
            min_contour_area: 10.0,
            confidence_threshold: 0.50,
            padding_ratio: 0.8,
            target_size: 28,
            channels_last: true,
        }
    }
}

/// Build the segmentation + classification pipeline
pub fn build_digit_pipeline(params: &SegmentationParams, model: Arc<dyn Model>) -> Pipeline {
    use steps::*;

    Pipeline::new()
        .add_step(Arc::new(GrayscaleStep))
        .add_step(Arc::new(PolarityNormalizationStep {
            background_threshold: params.background_intensity_threshold,
        }))
        .add_step(Arc::new(BinaryThresholdStep {
            threshold: params.binary_threshold,
        }))
        .add_step(Arc::new(ContourDetectionStep {
            min_area: params.min_contour_area,
        }))
        .add_step(Arc::new(PaddingStep {
            ratio: params.padding_ratio,
        }))
        .add_step(Arc::new(ResizeStep {
            target_size: params.target_size,
        }))
        .add_step(Arc::new(ClassificationStep::new(model, params.channels_last)))
        .add_step(Arc::new(ConfidenceFilterStep {
            threshold: params.confidence_threshold,
        }))
}

/// Reads the digits in an image, left to right
#[derive(Clone)]
pub struct DigitReader {
    pipeline: Pipeline,
    use_executor: bool,
}

impl DigitReader {
    pub fn new(params: &SegmentationParams, model: Arc<dyn Model>) -> Self {
        Self {
            pipeline: build_digit_pipeline(params, model),
            use_executor: false,
        }
    }

    /// Write every intermediate image under `dir`, named by lineage
    pub fn with_debug(mut self, dir: std::path::PathBuf) -> Result<Self> {
        self.pipeline = self.pipeline.with_debug(dir)?;
        self.use_executor = true;
        Ok(self)
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn read(&self, img: DynamicImage) -> Result<DigitReading> {
        let results = if self.use_executor {
            self.pipeline.run_with_executor(img)?
        } else {
            self.pipeline.run(img)?
        };

        let predictions = results
            .iter()
            .map(to_prediction)
            .collect::<Result<Vec<_>>>()?;

        let reading = DigitReading::from_predictions(predictions);
        tracing::info!("read '{}' from {} regions", reading.prediction, reading.digits.len());
        Ok(reading)
    }
}

fn to_prediction(item: &PipelineData) -> Result<DigitPrediction> {
    let digit = item
        .get_int(steps::DIGIT)
        .ok_or_else(|| anyhow::anyhow!("Missing digit for region"))?;
    let confidence = item
        .get_float(steps::CONFIDENCE)
        .ok_or_else(|| anyhow::anyhow!("Missing confidence for region"))?;
    let x_position = item.bbox.as_ref().map(|b| b.x).unwrap_or(0);

    Ok(DigitPrediction {
        digit: u32::try_from(digit)?,
        confidence,
        x_position,
        // The classifier saw `image / 255`; the PNG keeps the 0..=255 pixels as-is
        processed_image: encode_png_base64(&item.image)?,
    })
}

/// PNG-encode an image and return it as standard base64
pub fn encode_png_base64(img: &DynamicImage) -> Result<String> {
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png)
        .map_err(|e| anyhow::anyhow!("Failed to encode region as PNG: {}", e))?;
    Ok(BASE64.encode(buf.into_inner()))
}
