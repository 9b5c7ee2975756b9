use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, ImageResult, RgbaImage};
use std::io::Cursor;
use std::path::Path;

use crate::core::errors::{PipelineError, PipelineResult};

/// Load and decode an image from disk, format inferred from its contents.
pub fn load_dynamic_image(path: &Path) -> PipelineResult<DynamicImage> {
    image::ImageReader::open(path)
        .and_then(|reader| reader.with_guessed_format())
        .map_err(|e| PipelineError::ImageLoadFailed {
            path: path.to_path_buf(),
            source: image::ImageError::IoError(e),
        })?
        .decode()
        .map_err(|source| PipelineError::ImageLoadFailed {
            path: path.to_path_buf(),
            source,
        })
}

/// Load an image from disk as RGBA.
pub fn load_image(path: &Path) -> PipelineResult<RgbaImage> {
    load_dynamic_image(path).map(|img| img.to_rgba8())
}

/// Decode an in-memory image as RGBA.
pub fn load_image_from_memory(bytes: &[u8]) -> ImageResult<RgbaImage> {
    image::load_from_memory(bytes).map(|img| img.to_rgba8())
}

/// Encode as JPEG at `quality` (1..=100). Alpha is dropped, not composited.
pub fn encode_jpeg(img: &RgbaImage, quality: u8) -> ImageResult<Vec<u8>> {
    let rgb = DynamicImage::ImageRgba8(img.clone()).to_rgb8();
    let mut jpeg_bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg_bytes, quality.clamp(1, 100)).encode_image(&rgb)?;
    Ok(jpeg_bytes)
}

/// Encode as PNG, keeping alpha.
pub fn encode_png(img: &RgbaImage) -> ImageResult<Vec<u8>> {
    let mut png_bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut png_bytes), ImageFormat::Png)?;
    Ok(png_bytes)
}

/// True for `.jpg` / `.jpeg`, any case
pub fn is_jpeg_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("jpg") || e.eq_ignore_ascii_case("jpeg"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_png_round_trip_keeps_pixels() {
        let mut img = RgbaImage::from_pixel(4, 3, Rgba([255, 0, 0, 255]));
        img.put_pixel(1, 1, Rgba([0, 0, 255, 128]));

        let bytes = encode_png(&img).unwrap();
        let decoded = load_image_from_memory(&bytes).unwrap();
        assert_eq!(decoded, img);
    }

    #[test]
    fn test_jpeg_encodes_and_decodes() {
        let img = RgbaImage::from_pixel(16, 16, Rgba([20, 200, 20, 90]));
        let bytes = encode_jpeg(&img, 95).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);

        let decoded = load_image_from_memory(&bytes).unwrap();
        assert_eq!(decoded.dimensions(), (16, 16));
        assert_eq!(decoded.get_pixel(8, 8)[3], 255);
    }

    #[test]
    fn test_missing_file_is_a_load_error() {
        let err = load_image(Path::new("/nonexistent/drawing.png")).unwrap_err();
        assert!(matches!(err, PipelineError::ImageLoadFailed { .. }));
    }

    #[test]
    fn test_jpeg_extension_detection() {
        assert!(is_jpeg_path(Path::new("a/b.JPG")));
        assert!(is_jpeg_path(Path::new("x.jpeg")));
        assert!(!is_jpeg_path(Path::new("x.png")));
        assert!(!is_jpeg_path(Path::new("noext")));
    }
}
