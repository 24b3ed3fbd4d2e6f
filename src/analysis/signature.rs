//! Compact color signatures of candidate images and target cells
//!
//! A signature is the row-major readout of an image downsampled to an
//! `accuracy × accuracy` grid. Candidates and target cells are reduced the same
//! way so their signatures can be compared sample by sample.

use crate::math::color::{ColorSample, distance};
use image::imageops::FilterType;
use image::{DynamicImage, RgbaImage};
use serde::{Deserialize, Serialize};

/// Deterministic resampling filter shared by every signature computation
pub const SIGNATURE_FILTER: FilterType = FilterType::Triangle;

/// Ordered sequence of color samples describing an image
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Signature(Vec<ColorSample>);

impl Signature {
    /// Wrap an existing sample sequence
    pub const fn new(samples: Vec<ColorSample>) -> Self {
        Self(samples)
    }

    /// Signature where every sample is the same color
    pub fn uniform(sample: ColorSample, accuracy: u32) -> Self {
        Self(vec![sample; expected_len(accuracy)])
    }

    /// Downsample a whole image to `accuracy × accuracy` and read it row-major
    ///
    /// An accuracy of zero is treated as one.
    pub fn from_image(image: &DynamicImage, accuracy: u32) -> Self {
        let accuracy = accuracy.max(1);
        let reduced = image
            .resize_exact(accuracy, accuracy, SIGNATURE_FILTER)
            .to_rgba8();
        Self(reduced.pixels().map(|&pixel| pixel.into()).collect())
    }

    /// Read the `accuracy × accuracy` block at (`x`, `y`) of an already-reduced image
    ///
    /// Pixels outside the image are skipped, so a block hanging over the edge
    /// yields a short signature that will fail length checks downstream.
    pub fn from_block(image: &RgbaImage, x: u32, y: u32, accuracy: u32) -> Self {
        let mut samples = Vec::with_capacity(expected_len(accuracy));
        for row in y..y.saturating_add(accuracy) {
            for col in x..x.saturating_add(accuracy) {
                if let Some(&pixel) = image.get_pixel_checked(col, row) {
                    samples.push(pixel.into());
                }
            }
        }
        Self(samples)
    }

    /// Color samples in row-major order
    pub fn samples(&self) -> &[ColorSample] {
        &self.0
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the signature holds no samples
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether this signature was built with the given accuracy
    pub fn matches_accuracy(&self, accuracy: u32) -> bool {
        self.len() == expected_len(accuracy)
    }

    /// Total positional distance to another signature
    ///
    /// The sum of per-sample color distances, not the mean. Returns `None` when
    /// the lengths differ.
    pub fn score(&self, other: &Self) -> Option<f64> {
        (self.len() == other.len()).then(|| {
            self.0
                .iter()
                .zip(&other.0)
                .map(|(&a, &b)| distance(a, b))
                .sum()
        })
    }
}

/// Reduce an image to its signature at the given accuracy
pub fn extract(image: &DynamicImage, accuracy: u32) -> Signature {
    Signature::from_image(image, accuracy)
}

/// Number of samples in a signature of the given accuracy
pub const fn expected_len(accuracy: u32) -> usize {
    let side = if accuracy == 0 { 1 } else { accuracy as usize };
    side * side
}
