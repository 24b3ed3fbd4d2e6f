//! Photomosaic generation from perceptual color signatures
//!
//! Every candidate image and every cell of the target grid is reduced to a small
//! grid of color samples. Cells are matched to candidates with a redmean color
//! distance and a threshold-expanding randomized search that trades a little
//! per-tile fidelity for visual variety, then the chosen candidates are cropped
//! to the cell aspect ratio and composited.

#![forbid(unsafe_code)]

/// Signature storage, matching and mosaic assembly
pub mod algorithm;
/// Reduction of images into color signatures
pub mod analysis;
/// Input/output operations and error handling
pub mod io;
/// Color samples and perceptual distance
pub mod math;
/// Grid geometry and aspect-preserving cropping
pub mod spatial;

pub use io::error::{MosaicError, Result};
