//! Tests for image loading, saving and tile resolution

#[cfg(test)]
mod tests {
    use image::{DynamicImage, Rgba, RgbaImage};
    use photomosaic::io::image::{
        FileTileSource, TileSource, is_supported_image, load_image, output_path, save_image,
    };
    use photomosaic::{MosaicError, Result};
    use std::path::{Path, PathBuf};

    // Tests output naming keeps the target's directory and extension
    // Verified by always writing PNG
    #[test]
    fn test_output_path() {
        assert_eq!(
            output_path(Path::new("photos/beach.jpg")),
            PathBuf::from("photos/beach_mosaic.jpg")
        );
        assert_eq!(
            output_path(Path::new("beach")),
            PathBuf::from("beach_mosaic.png")
        );
    }

    // Tests saved images load back with identical pixels
    // Verified by saving without the alpha channel
    #[test]
    fn test_save_and_load() {
        let Ok(dir) = tempfile::tempdir() else {
            unreachable!("failed to create temp dir");
        };
        let path = dir.path().join("nested/out.png");
        let image = RgbaImage::from_fn(4, 3, |x, y| Rgba([x as u8 * 60, y as u8 * 80, 7, 128]));

        assert!(save_image(&image, &path).is_ok());
        let Ok(loaded) = load_image(&path) else {
            unreachable!("saved image failed to load");
        };
        assert_eq!(loaded.to_rgba8(), image);

        let Ok(tile) = FileTileSource.load_tile(&path.to_string_lossy()) else {
            unreachable!("file tile source failed");
        };
        assert_eq!((tile.width(), tile.height()), (4, 3));
    }

    // Tests JPEG output drops alpha instead of failing
    // Verified by saving RGBA data directly
    #[test]
    fn test_save_jpeg() {
        let Ok(dir) = tempfile::tempdir() else {
            unreachable!("failed to create temp dir");
        };
        let path = dir.path().join("out.jpg");
        let image = RgbaImage::from_pixel(8, 8, Rgba([200, 100, 50, 0]));

        assert!(save_image(&image, &path).is_ok());
        assert_eq!(load_image(&path).map(|i| i.width()).ok(), Some(8));
    }

    // Tests unknown extensions and missing files are errors
    // Verified by falling back to PNG for unknown extensions
    #[test]
    fn test_save_and_load_errors() {
        let Ok(dir) = tempfile::tempdir() else {
            unreachable!("failed to create temp dir");
        };
        let image = RgbaImage::new(2, 2);
        assert!(matches!(
            save_image(&image, dir.path().join("out.unknown")),
            Err(MosaicError::ImageExport { .. })
        ));
        assert!(matches!(
            load_image(dir.path().join("absent.png")),
            Err(MosaicError::ImageLoad { .. })
        ));
    }

    // Tests format detection uses the extension
    // Verified by accepting every file
    #[test]
    fn test_supported_extensions() {
        assert!(is_supported_image(Path::new("a.png")));
        assert!(is_supported_image(Path::new("a.JPG")));
        assert!(is_supported_image(Path::new("dir/a.gif")));
        assert!(!is_supported_image(Path::new("notes.txt")));
        assert!(!is_supported_image(Path::new("no_extension")));
    }

    // Tests closures act as tile sources
    // Verified by removing the blanket implementation
    #[test]
    fn test_closure_tile_source() {
        let source = |id: &str| -> Result<DynamicImage> {
            let width = u32::try_from(id.len()).unwrap_or(1);
            Ok(DynamicImage::ImageRgba8(RgbaImage::new(width, 1)))
        };
        assert_eq!(source.load_tile("abcd").map(|i| i.width()).ok(), Some(4));
    }
}
