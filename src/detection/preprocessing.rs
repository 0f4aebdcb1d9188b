use image::{DynamicImage, GrayImage, Luma};
use image::imageops::{self, FilterType};

/// Convert image to grayscale
pub fn to_grayscale(img: &DynamicImage) -> GrayImage {
    img.to_luma8()
}

/// Mean pixel intensity (0 for an empty image)
pub fn mean_intensity(img: &GrayImage) -> f64 {
    let count = img.width() as u64 * img.height() as u64;
    if count == 0 {
        return 0.0;
    }
    let sum: u64 = img.pixels().map(|p| p[0] as u64).sum();
    sum as f64 / count as f64
}

/// Make digits light on a dark background: images whose mean intensity is
/// above `background_threshold` are inverted
pub fn normalize_polarity(img: &GrayImage, background_threshold: f64) -> GrayImage {
    let mut out = img.clone();
    if mean_intensity(img) > background_threshold {
        imageops::invert(&mut out);
    }
    out
}

/// Pixels strictly above `threshold` become 255, everything else 0
pub fn binary_threshold(img: &GrayImage, threshold: u8) -> GrayImage {
    GrayImage::from_fn(img.width(), img.height(), |x, y| {
        if img.get_pixel(x, y)[0] > threshold {
            Luma([255u8])
        } else {
            Luma([0u8])
        }
    })
}

/// Padding for a digit region: a fraction of the shorter side
pub fn region_padding(width: u32, height: u32, ratio: f32) -> u32 {
    let shorter = if width > height { height } else { width };
    (ratio * shorter as f32).floor().max(0.0) as u32
}

/// Surround the region with a constant black border of `padding` pixels
pub fn pad_region(region: &GrayImage, padding: u32) -> GrayImage {
    let mut canvas = GrayImage::new(region.width() + 2 * padding, region.height() + 2 * padding);
    imageops::replace(&mut canvas, region, padding as i64, padding as i64);
    canvas
}

/// Resize to a square of `size` pixels. Shrinking in both directions
/// averages source areas; any enlargement interpolates bilinearly.
pub fn resize_region(img: &GrayImage, size: u32) -> GrayImage {
    if img.width() >= size && img.height() >= size {
        imageops::thumbnail(img, size, size)
    } else {
        imageops::resize(img, size, size, FilterType::Triangle)
    }
}

/// Scale pixels to [0, 1], row-major
pub fn normalize_pixels(img: &GrayImage) -> Vec<f32> {
    img.pixels().map(|p| p[0] as f32 / 255.0).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bright_background_is_inverted() {
        let img = GrayImage::from_pixel(4, 4, Luma([200u8]));
        let out = normalize_polarity(&img, 128.0);
        assert_eq!(out.get_pixel(0, 0)[0], 55);

        let dark = GrayImage::from_pixel(4, 4, Luma([128u8]));
        assert_eq!(normalize_polarity(&dark, 128.0).get_pixel(0, 0)[0], 128);
    }

    #[test]
    fn threshold_is_strict() {
        let img = GrayImage::from_fn(3, 1, |x, _| Luma([[127u8, 128, 0][x as usize]]));
        let out = binary_threshold(&img, 127);
        assert_eq!(out.as_raw(), &vec![0u8, 255, 0]);
    }

    #[test]
    fn padding_uses_shorter_side() {
        // wide region pads by height
        assert_eq!(region_padding(30, 10, 0.8), 8);
        // tall or square region pads by width
        assert_eq!(region_padding(7, 20, 0.8), 5);
        assert_eq!(region_padding(1, 1, 0.8), 0);
    }

    #[test]
    fn pad_then_resize_yields_square() {
        let region = GrayImage::from_pixel(6, 12, Luma([255u8]));
        let padded = pad_region(&region, 4);
        assert_eq!(padded.dimensions(), (14, 20));
        assert_eq!(padded.get_pixel(0, 0)[0], 0);
        assert_eq!(padded.get_pixel(4, 4)[0], 255);

        let resized = resize_region(&padded, 28);
        assert_eq!(resized.dimensions(), (28, 28));

        let shrunk = resize_region(&GrayImage::new(56, 40), 28);
        assert_eq!(shrunk.dimensions(), (28, 28));
    }
}
