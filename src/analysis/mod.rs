//! Image reduction into comparable color signatures

/// Signature extraction from whole images and downsampled blocks
pub mod signature;

pub use signature::{Signature, extract};
