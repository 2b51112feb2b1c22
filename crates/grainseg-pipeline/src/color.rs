//! Colour-space conversions between RGB and single-channel images.
//!
//! The label-average transform (RGB -> per-region mean RGB) lives in
//! [`crate::colorize`].

use image::{Luma, Rgb};

use crate::types::{GrayImage, RgbImage};

/// ITU-R BT.601 luma weights, scaled by 1000.
const LUMA_WEIGHTS: [u32; 3] = [299, 587, 114];

/// Perceptual luminance of one RGB pixel, rounded to nearest.
///
/// A neutral pixel `(v, v, v)` maps to exactly `v`.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn luma(rgb: [u8; 3]) -> u8 {
    let weighted: u32 = rgb
        .iter()
        .zip(LUMA_WEIGHTS)
        .map(|(&c, w)| u32::from(c) * w)
        .sum();
    // Weights sum to 1000, so the result never exceeds 255.
    ((weighted + 500) / 1000) as u8
}

/// Convert an RGB image to single-channel luminance.
#[must_use = "returns the grayscale image"]
pub fn rgb_to_gray(image: &RgbImage) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        Luma([luma(image.get_pixel(x, y).0)])
    })
}

/// Replicate a single-channel image into all three RGB channels.
#[must_use = "returns the broadcast RGB image"]
pub fn gray_to_rgb(image: &GrayImage) -> RgbImage {
    RgbImage::from_fn(image.width(), image.height(), |x, y| {
        let v = image.get_pixel(x, y).0[0];
        Rgb([v, v, v])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neutral_pixels_keep_their_value() {
        for v in [0u8, 1, 127, 128, 254, 255] {
            assert_eq!(luma([v, v, v]), v);
        }
    }

    #[test]
    fn green_outweighs_red_outweighs_blue() {
        let r = luma([255, 0, 0]);
        let g = luma([0, 255, 0]);
        let b = luma([0, 0, 255]);
        assert!(g > r && r > b, "expected G > R > B, got R={r} G={g} B={b}");
        assert_eq!((r, g, b), (76, 150, 29));
    }

    #[test]
    fn gray_round_trip_preserves_neutral_images() {
        let img = RgbImage::from_fn(6, 4, |x, y| {
            #[allow(clippy::cast_possible_truncation)]
            let v = (x * 40 + y * 3) as u8;
            Rgb([v, v, v])
        });
        assert_eq!(gray_to_rgb(&rgb_to_gray(&img)), img);
    }

    #[test]
    fn gray_to_rgb_replicates_channels() {
        let gray = GrayImage::from_fn(3, 2, |x, _| Luma([if x == 1 { 255 } else { 0 }]));
        let rgb = gray_to_rgb(&gray);
        assert_eq!(rgb.dimensions(), (3, 2));
        assert_eq!(rgb.get_pixel(1, 0).0, [255, 255, 255]);
        assert_eq!(rgb.get_pixel(0, 1).0, [0, 0, 0]);
    }
}
