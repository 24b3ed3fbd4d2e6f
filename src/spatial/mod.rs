//! Spatial layout of the mosaic
//!
//! This module contains the geometry shared by matching and compositing:
//! - Grid layout with remainder absorption in the last row and column
//! - Centered aspect-ratio cropping of tiles

/// Aspect-preserving centered cropping
pub mod crop;
/// Grid geometry and cell rectangles
pub mod grid;

pub use grid::{GridGeometry, Rect};
