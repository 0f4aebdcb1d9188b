use image::GrayImage;
use imageproc::contours::{find_contours, BorderType};
use crate::models::Contour;

/// Find the outermost borders of foreground regions in a binary image.
/// Borders nested inside another region's hole are not returned.
/// Contours enclosing less than `min_area` are dropped.
pub fn find_external_contours(binary: &GrayImage, min_area: f64) -> Vec<Contour> {
    find_contours::<u32>(binary)
        .into_iter()
        .filter(|c| matches!(c.border_type, BorderType::Outer) && c.parent.is_none())
        .filter_map(|c| Contour::from_points(c.points.into_iter().map(|p| (p.x, p.y)).collect()))
        .filter(|c| c.area() >= min_area)
        .collect()
}
