//! Image decoding and encoding around the stretching core
//!
//! Only 8-bit layouts are handled. The decoded layout is kept as-is so an
//! adjusted image is written back in the colour type it was read in.

use crate::error::AdjustError;
use crate::stretch::{Histogram, LookupTable, LuminanceMode};
use image::{DynamicImage, ImageFormat, ImageReader};
use std::io::Cursor;
use std::path::Path;

/// Check that a file can be read as an image and return its dimensions
pub fn identify(path: &Path) -> Result<(u32, u32), AdjustError> {
    let invalid = |reason: String| AdjustError::InvalidImage {
        path: path.to_path_buf(),
        reason,
    };

    ImageReader::open(path)
        .and_then(|reader| reader.with_guessed_format())
        .map_err(|e| invalid(e.to_string()))?
        .into_dimensions()
        .map_err(|e| invalid(e.to_string()))
}

pub fn load(path: &Path) -> Result<DynamicImage, AdjustError> {
    let image = image::open(path).map_err(|e| AdjustError::InvalidImage {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    ensure_8bit(&image)?;
    Ok(image)
}

pub fn decode(bytes: &[u8]) -> Result<DynamicImage, AdjustError> {
    let image = image::load_from_memory(bytes)
        .map_err(|e| AdjustError::ProcessingError(format!("Failed to decode image: {}", e)))?;
    ensure_8bit(&image)?;
    Ok(image)
}

/// Encode with the format implied by the file extension
pub fn save(image: &DynamicImage, path: &Path) -> Result<(), AdjustError> {
    image.save(path).map_err(|e| {
        AdjustError::ProcessingError(format!("Failed to save {}: {}", path.display(), e))
    })
}

pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>, AdjustError> {
    let mut buffer = Cursor::new(Vec::new());
    image
        .write_to(&mut buffer, ImageFormat::Png)
        .map_err(|e| AdjustError::ProcessingError(format!("Failed to encode PNG: {}", e)))?;
    Ok(buffer.into_inner())
}

pub fn ensure_8bit(image: &DynamicImage) -> Result<(), AdjustError> {
    match image {
        DynamicImage::ImageLuma8(_)
        | DynamicImage::ImageLumaA8(_)
        | DynamicImage::ImageRgb8(_)
        | DynamicImage::ImageRgba8(_) => Ok(()),
        other => Err(AdjustError::UnsupportedFormat(format!(
            "{:?} is not 8 bits per channel",
            other.color()
        ))),
    }
}

pub fn histogram_of(image: &DynamicImage, mode: LuminanceMode) -> Result<Histogram, AdjustError> {
    match image {
        DynamicImage::ImageLuma8(buf) => Ok(Histogram::from_image(buf, mode)),
        DynamicImage::ImageLumaA8(buf) => Ok(Histogram::from_image(buf, mode)),
        DynamicImage::ImageRgb8(buf) => Ok(Histogram::from_image(buf, mode)),
        DynamicImage::ImageRgba8(buf) => Ok(Histogram::from_image(buf, mode)),
        other => Err(unsupported(other)),
    }
}

pub fn apply_lut(image: &mut DynamicImage, table: &LookupTable) -> Result<(), AdjustError> {
    match image {
        DynamicImage::ImageLuma8(buf) => table.apply(buf),
        DynamicImage::ImageLumaA8(buf) => table.apply(buf),
        DynamicImage::ImageRgb8(buf) => table.apply(buf),
        DynamicImage::ImageRgba8(buf) => table.apply(buf),
        other => return Err(unsupported(other)),
    }
    Ok(())
}

fn unsupported(image: &DynamicImage) -> AdjustError {
    AdjustError::UnsupportedFormat(format!("{:?}", image.color()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Luma, Rgb, RgbImage, Rgba, RgbaImage};

    #[test]
    fn test_histogram_dispatches_on_layout() {
        let rgb = DynamicImage::ImageRgb8(RgbImage::from_pixel(3, 3, Rgb([255, 255, 255])));
        let histogram = histogram_of(&rgb, LuminanceMode::Byte).unwrap();
        assert_eq!(histogram.count(255), 9);
    }

    #[test]
    fn test_sixteen_bit_images_are_rejected() {
        let deep: ImageBuffer<Luma<u16>, Vec<u16>> = ImageBuffer::new(2, 2);
        let image = DynamicImage::ImageLuma16(deep);
        assert!(matches!(
            histogram_of(&image, LuminanceMode::Byte),
            Err(AdjustError::UnsupportedFormat(_))
        ));
        assert!(ensure_8bit(&image).is_err());
    }

    #[test]
    fn test_apply_keeps_layout_and_alpha() {
        let mut image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(2, 2, Rgba([10, 20, 30, 40])));
        apply_lut(&mut image, &LookupTable::stretch(10, 30)).unwrap();
        let DynamicImage::ImageRgba8(buf) = &image else {
            panic!("layout changed");
        };
        assert_eq!(buf.get_pixel(0, 0).0[0], 0);
        assert_eq!(buf.get_pixel(0, 0).0[2], 255);
        assert_eq!(buf.get_pixel(0, 0).0[3], 40);
    }

    #[test]
    fn test_png_round_trip_through_memory() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_fn(4, 4, |x, y| Rgb([x as u8, y as u8, 9])));
        let bytes = encode_png(&image).unwrap();
        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded.to_rgb8(), image.to_rgb8());
    }

    #[test]
    fn test_identify_rejects_non_images() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.png");
        std::fs::write(&path, b"definitely not a png").unwrap();
        assert!(matches!(identify(&path), Err(AdjustError::InvalidImage { .. })));

        let good = dir.path().join("ok.png");
        RgbImage::new(5, 3).save(&good).unwrap();
        assert_eq!(identify(&good).unwrap(), (5, 3));
    }
}
