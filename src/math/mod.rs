//! Mathematical utilities for color comparison

/// Color samples and the perceptual distance metric
pub mod color;
