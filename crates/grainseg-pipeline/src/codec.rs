//! Decoding input bytes to RGB and encoding results as PNG.
//!
//! These are the only entry points that touch encoded image data. The
//! processing stages themselves work on in-memory rasters.

use image::codecs::png::PngEncoder;
use image::{ColorType, ExtendedColorType, ImageEncoder};

use crate::types::{PipelineError, RgbImage, ensure_non_empty};

/// Decode raw image bytes (PNG, JPEG, BMP, WebP) into an 8-bit RGB
/// raster.
///
/// Any 8-bit layout is accepted: gray and gray+alpha are replicated into
/// three channels, and alpha is dropped.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if `bytes` is empty,
/// [`PipelineError::ImageDecode`] if the format is unrecognized or the
/// data is corrupt, and [`PipelineError::InvalidImage`] for sources that
/// are not 8 bits per channel or have a zero dimension.
pub fn decode(bytes: &[u8]) -> Result<RgbImage, PipelineError> {
    if bytes.is_empty() {
        return Err(PipelineError::EmptyInput);
    }

    let img = image::load_from_memory(bytes)?;
    match img.color() {
        ColorType::L8 | ColorType::La8 | ColorType::Rgb8 | ColorType::Rgba8 => {}
        other => {
            return Err(PipelineError::InvalidImage(format!(
                "unsupported pixel layout {other:?}, expected 8 bits per channel"
            )));
        }
    }

    let rgb = img.to_rgb8();
    ensure_non_empty(&rgb)?;
    Ok(rgb)
}

/// Encode an RGB raster as PNG.
///
/// # Errors
///
/// Returns [`PipelineError::ImageEncode`] if the encoder fails.
pub fn encode_png(image: &RgbImage) -> Result<Vec<u8>, PipelineError> {
    let mut buf = Vec::new();
    PngEncoder::new(&mut buf)
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            ExtendedColorType::Rgb8,
        )
        .map_err(PipelineError::ImageEncode)?;
    Ok(buf)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io::Cursor;

    use image::{DynamicImage, ImageFormat, Rgb};

    use super::*;

    fn png_of(image: &DynamicImage) -> Vec<u8> {
        let mut buf = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn empty_input_returns_error() {
        assert!(matches!(decode(&[]), Err(PipelineError::EmptyInput)));
    }

    #[test]
    fn corrupt_bytes_returns_image_decode_error() {
        let result = decode(&[0xFF, 0xFE, 0x00, 0x01]);
        assert!(matches!(result, Err(PipelineError::ImageDecode(_))));
    }

    #[test]
    fn rgb_png_round_trips_exactly() {
        #[allow(clippy::cast_possible_truncation)]
        let img = RgbImage::from_fn(17, 31, |x, y| Rgb([x as u8 * 15, y as u8 * 8, 77]));
        let decoded = decode(&encode_png(&img).unwrap()).unwrap();
        assert_eq!(decoded, img);
    }

    #[test]
    fn rgba_drops_alpha() {
        let rgba = image::RgbaImage::from_pixel(3, 2, image::Rgba([10, 20, 30, 0]));
        let decoded = decode(&png_of(&DynamicImage::ImageRgba8(rgba))).unwrap();
        assert!(decoded.pixels().all(|p| p.0 == [10, 20, 30]));
    }

    #[test]
    fn gray_alpha_is_replicated_to_rgb() {
        let la = image::GrayAlphaImage::from_pixel(2, 2, image::LumaA([99, 255]));
        let decoded = decode(&png_of(&DynamicImage::ImageLumaA8(la))).unwrap();
        assert_eq!(decoded.dimensions(), (2, 2));
        assert!(decoded.pixels().all(|p| p.0 == [99, 99, 99]));
    }

    #[test]
    fn sixteen_bit_source_rejected() {
        let deep = image::ImageBuffer::<Rgb<u16>, Vec<u16>>::from_pixel(2, 2, Rgb([1000; 3]));
        let result = decode(&png_of(&DynamicImage::ImageRgb16(deep)));
        assert!(matches!(result, Err(PipelineError::InvalidImage(_))));
    }

    #[test]
    fn encoded_output_is_png() {
        let bytes = encode_png(&RgbImage::new(1, 1)).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
    }
}
