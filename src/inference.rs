use std::path::Path;

use anyhow::{Context, Result};
use rten_tensor::prelude::*;
use rten_tensor::Tensor;

/// A trained model treated as a black box: a float tensor in, a float tensor out.
pub trait Model: Send + Sync {
    /// Run inference on `data` laid out row-major in `shape`.
    /// Returns the flattened output tensor.
    fn predict(&self, shape: &[usize], data: Vec<f32>) -> Result<Vec<f32>>;
}

/// Model graph executed with the rten runtime
pub struct RtenModel {
    model: rten::Model,
}

impl RtenModel {
    pub fn load(path: &Path) -> Result<Self> {
        let model = rten::Model::load_file(path)
            .with_context(|| format!("Failed to load model from {}", path.display()))?;
        Ok(Self { model })
    }
}

impl Model for RtenModel {
    fn predict(&self, shape: &[usize], data: Vec<f32>) -> Result<Vec<f32>> {
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            anyhow::bail!(
                "Input has {} values but shape {:?} needs {}",
                data.len(),
                shape,
                expected
            );
        }

        let input = Tensor::from_data(shape, data);
        let output = self.model.run_one(input.view().into(), None)?;
        let output: Tensor<f32> = output
            .try_into()
            .map_err(|e| anyhow::anyhow!("Model output is not a float tensor: {:?}", e))?;
        Ok(output.to_vec())
    }
}

/// Index and value of the largest score. None for an empty slice.
/// Ties resolve to the first maximum; a NaN counts as the maximum, so the
/// first NaN wins.
pub fn argmax(scores: &[f32]) -> Option<(usize, f32)> {
    let mut best: Option<(usize, f32)> = None;
    for (idx, &score) in scores.iter().enumerate() {
        match best {
            Some((_, best_score)) if best_score.is_nan() => break,
            Some((_, best_score)) if !score.is_nan() && score <= best_score => {}
            _ => best = Some((idx, score)),
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argmax_picks_first_maximum() {
        assert_eq!(argmax(&[0.1, 0.7, 0.7, 0.2]), Some((1, 0.7)));
        assert_eq!(argmax(&[]), None);
    }

    #[test]
    fn argmax_stops_at_first_nan() {
        let (idx, score) = argmax(&[0.2, f32::NAN, 0.9, f32::NAN]).unwrap();
        assert_eq!(idx, 1);
        assert!(score.is_nan());

        let (idx, _) = argmax(&[f32::NAN, 0.5]).unwrap();
        assert_eq!(idx, 0);
    }
}
