//! Image decoding, encoding and tile resolution

use crate::io::configuration::OUTPUT_SUFFIX;
use crate::io::error::{MosaicError, Result, file_system_error};
use image::{DynamicImage, ImageFormat, RgbaImage};
use std::path::{Path, PathBuf};

/// Resolves candidate identifiers to decoded pixels
pub trait TileSource {
    /// Load the image behind a candidate identifier
    ///
    /// # Errors
    ///
    /// Returns an error if the image cannot be found or decoded
    fn load_tile(&self, id: &str) -> Result<DynamicImage>;
}

impl<F> TileSource for F
where
    F: Fn(&str) -> Result<DynamicImage>,
{
    fn load_tile(&self, id: &str) -> Result<DynamicImage> {
        self(id)
    }
}

/// Tile source treating identifiers as filesystem paths
#[derive(Clone, Copy, Debug, Default)]
pub struct FileTileSource;

impl TileSource for FileTileSource {
    fn load_tile(&self, id: &str) -> Result<DynamicImage> {
        load_image(id)
    }
}

/// Decode an image from disk
///
/// # Errors
///
/// Returns an error if the file cannot be opened or is not a supported image
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<DynamicImage> {
    let path = path.as_ref();
    image::open(path).map_err(|e| MosaicError::ImageLoad {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Whether the file extension names a format the image crate understands
pub fn is_supported_image(path: &Path) -> bool {
    ImageFormat::from_path(path).is_ok_and(|format| format.reading_enabled())
}

/// Save an image, creating parent directories as needed
///
/// Formats without an alpha channel (JPEG) receive the RGB channels only.
///
/// # Errors
///
/// Returns an error if:
/// - The parent directory cannot be created
/// - The format cannot be determined from the extension
/// - Encoding or writing fails
pub fn save_image<P: AsRef<Path>>(image: &RgbaImage, path: P) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| file_system_error(parent, "create directory", e))?;
    }

    let export_error = |e| MosaicError::ImageExport {
        path: path.to_path_buf(),
        source: e,
    };

    match ImageFormat::from_path(path).map_err(export_error)? {
        ImageFormat::Jpeg => DynamicImage::ImageRgba8(image.clone())
            .to_rgb8()
            .save(path)
            .map_err(export_error),
        _ => image.save(path).map_err(export_error),
    }
}

/// Default output location: `<stem>_mosaic.<ext>` next to the target
pub fn output_path(target: &Path) -> PathBuf {
    let stem = target.file_stem().unwrap_or_default();
    let extension = target
        .extension()
        .filter(|ext| !ext.is_empty())
        .map_or_else(|| "png".into(), |ext| ext.to_string_lossy());
    let output_name = format!("{}{OUTPUT_SUFFIX}.{extension}", stem.to_string_lossy());

    target.parent().map_or_else(
        || PathBuf::from(&output_name),
        |parent| parent.join(&output_name),
    )
}
