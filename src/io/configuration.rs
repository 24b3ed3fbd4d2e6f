//! Matching constants and runtime configuration defaults

// Color metric constants
/// Channel sum (both samples, RGB only) above which a pair counts as light
pub const BRIGHTNESS_THRESHOLD: u32 = 200 * 6;
/// Score reduction applied to light sample pairs
pub const LIGHT_HANDICAP: f64 = 50.0;

// Matcher defaults
/// Initial score threshold for the qualifying pool
pub const DEFAULT_THRESHOLD: f64 = 250.0;
/// Amount the threshold grows on each retry
pub const DEFAULT_THRESHOLD_STEP: f64 = 100.0;
/// Minimum number of qualifying candidates before a random pick is made
pub const DEFAULT_MIN_POOL: usize = 3;

// Bounds the retry loop; enough for accuracy 11 at the default step
/// Maximum number of threshold expansions per cell
pub const DEFAULT_MAX_RETRIES: usize = 1000;

// Grid defaults
/// Default number of grid columns
pub const DEFAULT_COLUMNS: u32 = 34;
/// Default number of grid rows
pub const DEFAULT_ROWS: u32 = 20;
/// Default signature side length (accuracy × accuracy samples)
pub const DEFAULT_ACCURACY: u32 = 3;
/// Default output scale multiplier
pub const DEFAULT_SCALE: u32 = 1;

// Safety limit to prevent excessive memory allocation
/// Maximum allowed canvas dimension in pixels
pub const MAX_CANVAS_DIMENSION: u32 = 65_535;

// Cache layout
/// Default directory for cropped candidates and signature metadata
pub const DEFAULT_CACHE_DIR: &str = "_cache";
/// Prefix of the per-configuration cropped candidate directory
pub const CROPPED_DIR_PREFIX: &str = "cropped-";
/// Prefix of the per-configuration signature metadata file
pub const METADATA_PREFIX: &str = "meta-";

// Output settings
/// Suffix added to output filenames
pub const OUTPUT_SUFFIX: &str = "_mosaic";
/// Width of progress bars in characters
pub const PROGRESS_BAR_WIDTH: u16 = 40;
