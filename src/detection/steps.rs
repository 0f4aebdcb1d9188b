use crate::pipeline::{PipelineData, PipelineStep, PipelineContext, BoundingBox, MetadataValue};
use crate::detection::{preprocessing, contours};
use crate::inference::{self, Model};
use anyhow::Result;
use image::DynamicImage;
use std::sync::Arc;

/// Whether the polarity step inverted the image
pub const INVERTED: &str = "inverted";
pub const CONTOUR_AREA: &str = "contour_area";
pub const DIGIT: &str = "digit";
pub const CONFIDENCE: &str = "confidence";

/// Convert image to grayscale
pub struct GrayscaleStep;

impl PipelineStep for GrayscaleStep {
    fn process(&self, data: Vec<PipelineData>, _context: &PipelineContext) -> Result<Vec<PipelineData>> {
        Ok(data
            .into_iter()
            .map(|item| {
                let gray = preprocessing::to_grayscale(&item.image);
                item.with_image(DynamicImage::ImageLuma8(gray))
            })
            .collect())
    }

    fn name(&self) -> &str {
        "Grayscale Conversion"
    }
}

/// Invert bright-background images so digits are light on dark.
/// The normalised image also becomes the source that regions are cropped from.
pub struct PolarityNormalizationStep {
    pub background_threshold: f64,
}

impl PipelineStep for PolarityNormalizationStep {
    fn process(&self, data: Vec<PipelineData>, _context: &PipelineContext) -> Result<Vec<PipelineData>> {
        let mut result = Vec::with_capacity(data.len());
        for item in data {
            let gray = item.image.to_luma8();
            let mean = preprocessing::mean_intensity(&gray);
            let inverted = mean > self.background_threshold;
            let normalized = DynamicImage::ImageLuma8(
                preprocessing::normalize_polarity(&gray, self.background_threshold),
            );
            tracing::debug!(mean_intensity = mean, inverted, "polarity normalised");

            let mut new_item = item
                .with_image(normalized.clone())
                .with_metadata(INVERTED, MetadataValue::Bool(inverted));
            new_item.source = Arc::new(normalized);
            result.push(new_item);
        }
        Ok(result)
    }

    fn name(&self) -> &str {
        "Polarity Normalization"
    }
}

/// Binary threshold
pub struct BinaryThresholdStep {
    pub threshold: u8,
}

impl PipelineStep for BinaryThresholdStep {
    fn process(&self, data: Vec<PipelineData>, _context: &PipelineContext) -> Result<Vec<PipelineData>> {
        Ok(data
            .into_iter()
            .map(|item| {
                let binary = preprocessing::binary_threshold(&item.image.to_luma8(), self.threshold);
                item.with_image(DynamicImage::ImageLuma8(binary))
            })
            .collect())
    }

    fn name(&self) -> &str {
        "Binary Threshold"
    }
}

/// Find external contours in the binary image - splits one image into one item per region.
/// Each region is cropped from the source image, not the binary one.
pub struct ContourDetectionStep {
    pub min_area: f64,
}

impl PipelineStep for ContourDetectionStep {
    fn process(&self, data: Vec<PipelineData>, _context: &PipelineContext) -> Result<Vec<PipelineData>> {
        let mut result = Vec::new();

        for item in data {
            let binary = item.image.to_luma8();
            let detected = contours::find_external_contours(&binary, self.min_area);
            tracing::debug!("found {} contours with area >= {}", detected.len(), self.min_area);

            for contour in detected {
                let bbox = BoundingBox {
                    x: contour.min_x,
                    y: contour.min_y,
                    width: contour.width(),
                    height: contour.height(),
                };
                let cropped = item.source.crop_imm(bbox.x, bbox.y, bbox.width, bbox.height);

                let mut region = PipelineData::from_region(
                    DynamicImage::ImageLuma8(cropped.to_luma8()),
                    item.source.clone(),
                    bbox,
                );
                // Regions inherit what earlier steps learned about the whole image
                region.metadata = item.metadata.clone();
                result.push(region.with_metadata(CONTOUR_AREA, MetadataValue::Float(contour.area() as f32)));
            }
        }

        Ok(result)
    }

    fn name(&self) -> &str {
        "Contour Detection"
    }
}

/// Add a constant black border proportional to the region's shorter side
pub struct PaddingStep {
    pub ratio: f32,
}

impl PipelineStep for PaddingStep {
    fn process(&self, data: Vec<PipelineData>, _context: &PipelineContext) -> Result<Vec<PipelineData>> {
        Ok(data
            .into_iter()
            .map(|item| {
                let gray = item.image.to_luma8();
                let padding = preprocessing::region_padding(gray.width(), gray.height(), self.ratio);
                let padded = preprocessing::pad_region(&gray, padding);
                item.with_image(DynamicImage::ImageLuma8(padded))
            })
            .collect())
    }

    fn name(&self) -> &str {
        "Padding"
    }
}

/// Resize each region to a fixed square size
pub struct ResizeStep {
    pub target_size: u32,
}

impl PipelineStep for ResizeStep {
    fn process(&self, data: Vec<PipelineData>, _context: &PipelineContext) -> Result<Vec<PipelineData>> {
        let mut result = Vec::with_capacity(data.len());
        for item in data {
            let gray = item.image.to_luma8();
            if gray.width() == 0 || gray.height() == 0 {
                tracing::warn!("skipping empty region at {:?}", item.bbox);
                continue;
            }
            let resized = preprocessing::resize_region(&gray, self.target_size);
            result.push(item.with_image(DynamicImage::ImageLuma8(resized)));
        }
        Ok(result)
    }

    fn name(&self) -> &str {
        "Resize"
    }
}

/// Run the digit classifier on each region
pub struct ClassificationStep {
    model: Arc<dyn Model>,
    channels_last: bool,
}

impl ClassificationStep {
    pub fn new(model: Arc<dyn Model>, channels_last: bool) -> Self {
        Self { model, channels_last }
    }
}

impl PipelineStep for ClassificationStep {
    fn process(&self, data: Vec<PipelineData>, _context: &PipelineContext) -> Result<Vec<PipelineData>> {
        let mut result = Vec::with_capacity(data.len());

        for item in data {
            let gray = item.image.to_luma8();
            let (w, h) = (gray.width() as usize, gray.height() as usize);
            let shape = if self.channels_last {
                [1, h, w, 1]
            } else {
                [1, 1, h, w]
            };

            let scores = self.model.predict(&shape, preprocessing::normalize_pixels(&gray))?;
            let (digit, confidence) = inference::argmax(&scores)
                .ok_or_else(|| anyhow::anyhow!("Model returned no scores"))?;

            tracing::debug!(digit, confidence, x = item.bbox.as_ref().map(|b| b.x), "classified region");

            result.push(
                item.with_metadata(DIGIT, MetadataValue::Int(digit as i64))
                    .with_metadata(CONFIDENCE, MetadataValue::Float(confidence)),
            );
        }

        Ok(result)
    }

    fn name(&self) -> &str {
        "Digit Classification"
    }
}

/// Keep only regions classified with at least `threshold` confidence
pub struct ConfidenceFilterStep {
    pub threshold: f32,
}

impl PipelineStep for ConfidenceFilterStep {
    fn process(&self, data: Vec<PipelineData>, _context: &PipelineContext) -> Result<Vec<PipelineData>> {
        let before = data.len();
        let kept: Vec<PipelineData> = data
            .into_iter()
            .filter(|item| item.get_float(CONFIDENCE).is_some_and(|c| c >= self.threshold))
            .collect();
        tracing::debug!("kept {} of {} regions at confidence >= {}", kept.len(), before, self.threshold);
        Ok(kept)
    }

    fn name(&self) -> &str {
        "Confidence Filtering"
    }
}
