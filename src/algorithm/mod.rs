/// Grid traversal, matching orchestration and compositing
pub mod assembler;
/// Threshold-expanding randomized candidate selection
pub mod matcher;
/// Candidate signature storage and persistence format
pub mod store;
