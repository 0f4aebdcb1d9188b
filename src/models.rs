use serde::Serialize;

/// Outer border of a connected foreground region
#[derive(Debug, Clone)]
pub struct Contour {
    /// Border points in tracing order
    pub points: Vec<(u32, u32)>,
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
}

impl Contour {
    /// Build a contour from traced border points, computing the bounding box.
    /// Returns None for an empty point list.
    pub fn from_points(points: Vec<(u32, u32)>) -> Option<Self> {
        let &(first_x, first_y) = points.first()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first_x, first_y, first_x, first_y);
        for &(x, y) in &points {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
        Some(Self {
            points,
            min_x,
            min_y,
            max_x,
            max_y,
        })
    }

    pub fn width(&self) -> u32 {
        self.max_x - self.min_x + 1
    }

    pub fn height(&self) -> u32 {
        self.max_y - self.min_y + 1
    }

    /// Polygon area enclosed by the border points (shoelace formula)
    pub fn area(&self) -> f64 {
        if self.points.len() < 3 {
            return 0.0;
        }
        let mut twice_area = 0.0;
        for (i, &(x0, y0)) in self.points.iter().enumerate() {
            let (x1, y1) = self.points[(i + 1) % self.points.len()];
            twice_area += x0 as f64 * y1 as f64 - x1 as f64 * y0 as f64;
        }
        (twice_area / 2.0).abs()
    }
}

/// One recognised digit in an uploaded image
#[derive(Debug, Clone, Serialize)]
pub struct DigitPrediction {
    pub digit: u32,
    pub confidence: f32,
    /// Left edge of the digit's bounding box in the source image
    pub x_position: u32,
    /// The normalised region fed to the classifier, as base64 PNG
    pub processed_image: String,
}

/// All digits read from an image, left to right
#[derive(Debug, Clone, Serialize)]
pub struct DigitReading {
    pub prediction: String,
    pub digits: Vec<DigitPrediction>,
}

impl DigitReading {
    /// Order detections by horizontal position and join their labels
    pub fn from_predictions(mut digits: Vec<DigitPrediction>) -> Self {
        digits.sort_by_key(|d| d.x_position);
        let prediction = digits.iter().map(|d| d.digit.to_string()).collect();
        Self { prediction, digits }
    }
}
