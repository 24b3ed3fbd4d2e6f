//! Centered cropping to a target aspect ratio

use crate::spatial::grid::Rect;
use image::DynamicImage;

/// Largest centered region of a `width × height` image with the desired ratio
///
/// `desired_ratio` is width / height. Images that are relatively taller lose
/// rows evenly from top and bottom; relatively wider images lose columns evenly
/// from left and right. For odd remainders the far edge loses one pixel more.
/// Every output dimension is at least one pixel, and non-finite or non-positive
/// ratios leave the image uncropped.
pub fn fit_region(width: u32, height: u32, desired_ratio: f64) -> Rect {
    let width = width.max(1);
    let height = height.max(1);

    if !desired_ratio.is_finite() || desired_ratio <= 0.0 {
        return Rect::new(0, 0, width, height);
    }

    let current_ratio = f64::from(width) / f64::from(height);
    if current_ratio < desired_ratio {
        // Too tall
        let target_height = clamp_dimension(f64::from(width) / desired_ratio, height);
        let top = (height - target_height) / 2;
        Rect::new(0, top, width, target_height)
    } else {
        // Too wide, or already fitting
        let target_width = clamp_dimension(f64::from(height) * desired_ratio, width);
        let left = (width - target_width) / 2;
        Rect::new(left, 0, target_width, height)
    }
}

fn clamp_dimension(value: f64, max: u32) -> u32 {
    (value.round() as u32).clamp(1, max)
}

/// Center-crop an image to the desired width / height ratio without resizing
pub fn crop_to_fit(image: &DynamicImage, desired_ratio: f64) -> DynamicImage {
    let region = fit_region(image.width(), image.height(), desired_ratio);
    if region.width == image.width() && region.height == image.height() {
        return image.clone();
    }
    image.crop_imm(region.x, region.y, region.width, region.height)
}
