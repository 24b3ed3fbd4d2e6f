//! Input/output operations, configuration and error handling

/// Signature persistence and candidate cropping cache
pub mod cache;
/// Command-line parsing and run orchestration
pub mod cli;
/// Default values and limits
pub mod configuration;
/// Error types and context helpers
pub mod error;
/// Image decoding, encoding and tile resolution
pub mod image;
/// Tracing subscriber setup
pub mod logging;
/// Progress bars for long-running phases
pub mod progress;
