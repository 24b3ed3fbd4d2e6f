//! Error types and context management for mosaic operations

use std::fmt;
use std::path::PathBuf;

/// Main error type for all mosaic operations
#[derive(Debug)]
pub enum MosaicError {
    /// Failed to decode an image from the filesystem
    ImageLoad {
        /// Path to the image file
        path: PathBuf,
        /// Underlying image loading error
        source: image::ImageError,
    },

    /// Failed to save an image to disk
    ImageExport {
        /// Path where export was attempted
        path: PathBuf,
        /// Underlying image export error
        source: image::ImageError,
    },

    /// Configuration validation failed
    InvalidParameter {
        /// Name of the invalid parameter
        parameter: &'static str,
        /// Provided value that failed validation
        value: String,
        /// Explanation of why the value is invalid
        reason: String,
    },

    /// The matcher could not gather enough qualifying candidates
    ///
    /// Occurs when either:
    /// - Fewer candidates are available than the required pool size
    /// - The threshold was relaxed `retries` times without enough candidates qualifying
    PoolExhausted {
        /// Number of candidates that were available for matching
        pool_size: usize,
        /// Threshold expansions performed before giving up
        retries: usize,
        /// Last threshold that was tried
        final_threshold: f64,
        /// Grid cell (column, row) being matched, when known
        cell: Option<(u32, u32)>,
    },

    /// A signature length disagrees with the configured accuracy
    SignatureMismatch {
        /// Identifier of the offending candidate
        id: String,
        /// Expected number of color samples
        expected: usize,
        /// Number of color samples found
        found: usize,
    },

    /// Candidate identifier inserted twice into the same store
    DuplicateCandidate {
        /// The repeated identifier
        id: String,
    },

    /// Candidate index does not exist in the store
    UnknownCandidate {
        /// The invalid index
        index: usize,
        /// Number of entries in the store
        store_size: usize,
    },

    /// Persisted signature data could not be read or written
    CacheFormat {
        /// Path of the metadata file
        path: PathBuf,
        /// Underlying serialization error
        source: serde_json::Error,
    },

    /// General file system operation failure
    FileSystem {
        /// Path involved in the operation
        path: PathBuf,
        /// Description of the operation that failed
        operation: &'static str,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// Assembly was aborted between cells
    Cancelled {
        /// Cells matched before the abort was observed
        completed: usize,
        /// Total cells in the grid
        total: usize,
    },
}

impl fmt::Display for MosaicError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ImageLoad { path, source } => {
                write!(f, "Failed to load image '{}': {source}", path.display())
            }
            Self::ImageExport { path, source } => {
                write!(
                    f,
                    "Failed to export image to '{}': {source}",
                    path.display()
                )
            }
            Self::InvalidParameter {
                parameter,
                value,
                reason,
            } => {
                write!(f, "Invalid parameter '{parameter}' = '{value}': {reason}")
            }
            Self::PoolExhausted {
                pool_size,
                retries,
                final_threshold,
                cell,
            } => {
                write!(
                    f,
                    "Candidate pool exhausted after {retries} threshold expansions \
                     (pool size {pool_size}, final threshold {final_threshold})"
                )?;
                if let Some((col, row)) = cell {
                    write!(f, " at cell ({col}, {row})")?;
                }
                Ok(())
            }
            Self::SignatureMismatch {
                id,
                expected,
                found,
            } => {
                write!(
                    f,
                    "Signature of '{id}' has {found} samples, expected {expected}"
                )
            }
            Self::DuplicateCandidate { id } => {
                write!(f, "Candidate '{id}' is already present in the store")
            }
            Self::UnknownCandidate { index, store_size } => {
                write!(
                    f,
                    "Candidate index {index} is out of bounds (store size: {store_size})"
                )
            }
            Self::CacheFormat { path, source } => {
                write!(
                    f,
                    "Malformed signature cache '{}': {source}",
                    path.display()
                )
            }
            Self::FileSystem {
                path,
                operation,
                source,
            } => {
                write!(
                    f,
                    "File system error during {operation} on '{}': {source}",
                    path.display()
                )
            }
            Self::Cancelled { completed, total } => {
                write!(f, "Assembly cancelled after {completed} of {total} cells")
            }
        }
    }
}

impl std::error::Error for MosaicError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ImageLoad { source, .. } | Self::ImageExport { source, .. } => Some(source),
            Self::FileSystem { source, .. } => Some(source),
            Self::CacheFormat { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Convenience type alias for mosaic results
pub type Result<T> = std::result::Result<T, MosaicError>;

/// Attaches the grid cell being processed to errors that carry one
pub trait WithCell<T> {
    /// Record the (column, row) of the cell on cell-aware errors
    ///
    /// # Errors
    ///
    /// Propagates the original error with the cell location applied
    fn at_cell(self, col: u32, row: u32) -> Result<T>;
}

impl<T, E> WithCell<T> for std::result::Result<T, E>
where
    E: Into<MosaicError>,
{
    fn at_cell(self, col: u32, row: u32) -> Result<T> {
        self.map_err(|e| {
            let mut error = e.into();
            // Only pool exhaustion is reported per cell
            if let MosaicError::PoolExhausted { cell, .. } = &mut error {
                *cell = Some((col, row));
            }
            error
        })
    }
}

impl From<image::ImageError> for MosaicError {
    fn from(err: image::ImageError) -> Self {
        Self::ImageLoad {
            path: PathBuf::from("<unknown>"),
            source: err,
        }
    }
}

impl From<std::io::Error> for MosaicError {
    fn from(err: std::io::Error) -> Self {
        Self::FileSystem {
            path: PathBuf::from("<unknown>"),
            operation: "unknown",
            source: err,
        }
    }
}

/// Create an invalid parameter error
pub fn invalid_parameter(
    parameter: &'static str,
    value: &impl ToString,
    reason: &impl ToString,
) -> MosaicError {
    MosaicError::InvalidParameter {
        parameter,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Create a file system error bound to a path
pub fn file_system_error(
    path: impl Into<PathBuf>,
    operation: &'static str,
    source: std::io::Error,
) -> MosaicError {
    MosaicError::FileSystem {
        path: path.into(),
        operation,
        source,
    }
}

