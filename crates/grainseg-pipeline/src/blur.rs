//! Gaussian smoothing for the preprocessing and segmentation stages.
//!
//! Two distinct blurs live here:
//!
//! - [`fixed_gaussian_blur`] is the optional noise-suppression step of
//!   the preprocessor. Its 5x5 footprint is fixed and the sigma is
//!   derived from the kernel size, which for five taps yields the
//!   binomial kernel `[1, 4, 6, 4, 1] / 16`.
//! - [`gaussian_blur`] is the sigma-parameterized smoothing pass the
//!   graph segmenter runs before measuring edge weights.
//!
//! `imageproc`'s filters are applied channel by channel: the RGB image is
//! split into three `f32` planes, each is filtered, and the planes are
//! rounded to the nearest `u8` when reassembled. Filtering `u8` planes
//! directly would truncate twice (after each separable pass).

use image::{Luma, Rgb};
use imageproc::definitions::Image;

use crate::types::RgbImage;

/// Side length of the preprocessor's fixed blur kernel.
pub const FIXED_KERNEL_SIZE: usize = 5;

/// Normalized taps of the preprocessor's fixed 5-tap Gaussian.
///
/// A Gaussian whose sigma is derived from a 5-pixel kernel size
/// collapses to the binomial coefficients of row four of Pascal's
/// triangle.
pub const FIXED_KERNEL: [f32; FIXED_KERNEL_SIZE] = [
    1.0 / 16.0,
    4.0 / 16.0,
    6.0 / 16.0,
    4.0 / 16.0,
    1.0 / 16.0,
];

/// Apply the preprocessor's fixed 5x5 Gaussian blur.
///
/// The 2-D kernel is the outer product of [`FIXED_KERNEL`] with itself,
/// applied separably. Pixels beyond the border are clamped to the
/// nearest edge pixel.
#[must_use = "returns the blurred image"]
pub fn fixed_gaussian_blur(image: &RgbImage) -> RgbImage {
    map_channels(image, |plane| {
        imageproc::filter::separable_filter_equal(plane, &FIXED_KERNEL[..])
    })
}

/// Apply a Gaussian blur with the given `sigma` to every channel.
///
/// Non-positive sigma values return the image unchanged, since
/// `imageproc`'s underlying function panics on `sigma <= 0.0`.
#[must_use = "returns the blurred image"]
pub fn gaussian_blur(image: &RgbImage, sigma: f32) -> RgbImage {
    if sigma <= 0.0 {
        return image.clone();
    }

    map_channels(image, |plane| {
        imageproc::filter::gaussian_blur_f32(plane, sigma)
    })
}

/// A single colour channel at full precision.
type Plane = Image<Luma<f32>>;

/// Split `image` into R, G, B planes, run `filter` over each, and
/// reassemble the rounded results.
fn map_channels(image: &RgbImage, filter: impl Fn(&Plane) -> Plane) -> RgbImage {
    let (w, h) = image.dimensions();

    let filtered: [Plane; 3] = std::array::from_fn(|c| {
        let plane = Plane::from_fn(w, h, |x, y| Luma([f32::from(image.get_pixel(x, y).0[c])]));
        filter(&plane)
    });

    RgbImage::from_fn(w, h, |x, y| {
        Rgb(std::array::from_fn(|c| to_channel(filtered[c].get_pixel(x, y).0[0])))
    })
}

/// Round to the nearest representable channel value.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_channel(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 10x10 image with a sharp black-to-white boundary at x=5.
    fn sharp_edge_image() -> RgbImage {
        RgbImage::from_fn(10, 10, |x, _y| {
            if x < 5 {
                Rgb([0, 0, 0])
            } else {
                Rgb([255, 255, 255])
            }
        })
    }

    #[test]
    fn fixed_kernel_is_normalized_and_symmetric() {
        let sum: f32 = FIXED_KERNEL.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6, "kernel sums to {sum}");
        for i in 0..FIXED_KERNEL_SIZE {
            let mirrored = FIXED_KERNEL[FIXED_KERNEL_SIZE - 1 - i];
            assert!((FIXED_KERNEL[i] - mirrored).abs() < f32::EPSILON);
        }
    }

    #[test]
    fn fixed_blur_preserves_dimensions() {
        let img = RgbImage::new(17, 31);
        let blurred = fixed_gaussian_blur(&img);
        assert_eq!(blurred.dimensions(), (17, 31));
    }

    #[test]
    fn fixed_blur_leaves_uniform_image_unchanged() {
        let img = RgbImage::from_pixel(12, 9, Rgb([90, 140, 210]));
        let blurred = fixed_gaussian_blur(&img);
        assert!(blurred.pixels().all(|p| p.0 == [90, 140, 210]));
    }

    #[test]
    fn fixed_blur_rounds_to_nearest() {
        // Exact row values are 0.6875, 2.75, 4.125, 2.75, 0.6875.
        let img = RgbImage::from_fn(9, 1, |x, _| Rgb([if x == 4 { 11 } else { 0 }; 3]));
        let row: Vec<u8> = fixed_gaussian_blur(&img).pixels().map(|p| p.0[0]).collect();
        assert_eq!(row, vec![0, 0, 1, 3, 4, 3, 1, 0, 0]);
    }

    #[test]
    fn sigma_blur_rounds_to_nearest() {
        let img = RgbImage::from_fn(9, 9, |x, y| Rgb([if (x, y) == (4, 4) { 200 } else { 0 }; 3]));
        let sigma = 1.0;
        let kernel: Vec<f32> = {
            let raw: Vec<f32> = (-2i8..=2)
                .map(|i| (-f32::from(i * i) / (2.0 * sigma * sigma)).exp())
                .collect();
            let sum: f32 = raw.iter().sum();
            raw.iter().map(|k| k / sum).collect()
        };
        let blurred = gaussian_blur(&img, sigma);
        for (x, y, p) in blurred.enumerate_pixels() {
            let (dx, dy) = (x.abs_diff(4), y.abs_diff(4));
            let expected = if dx > 2 || dy > 2 {
                0.0
            } else {
                200.0 * kernel[dx as usize + 2] * kernel[dy as usize + 2]
            };
            assert_eq!(p.0[0], to_channel(expected), "({x}, {y}) expected {expected}");
        }
    }

    #[test]
    fn fixed_blur_smooths_sharp_edge() {
        let blurred = fixed_gaussian_blur(&sharp_edge_image());
        let (dark, light) = (blurred.get_pixel(4, 5).0[0], blurred.get_pixel(5, 5).0[0]);
        assert!(dark > 0 && light < 255, "boundary stayed sharp: {dark} {light}");
        // Columns more than two pixels from the boundary are out of the
        // kernel's reach.
        assert_eq!(blurred.get_pixel(0, 5).0[0], 0);
        assert_eq!(blurred.get_pixel(9, 5).0[0], 255);
    }

    #[test]
    fn non_positive_sigma_is_identity() {
        let img = sharp_edge_image();
        for sigma in [0.0, -1.0, -0.001] {
            assert_eq!(gaussian_blur(&img, sigma), img, "sigma {sigma}");
        }
    }

    #[test]
    fn sigma_blur_mixes_red_and_blue_at_boundary() {
        let img = RgbImage::from_fn(10, 10, |x, _| {
            if x < 5 { Rgb([255, 0, 0]) } else { Rgb([0, 0, 255]) }
        });
        let [red_in, _, blue_in] = gaussian_blur(&img, 2.0).get_pixel(4, 5).0;
        assert!(red_in < 255 && blue_in > 0, "got red {red_in} blue {blue_in}");
    }

    #[test]
    #[allow(clippy::cast_possible_truncation)]
    fn sigma_blur_matches_per_plane_blur() {
        let img = RgbImage::from_fn(11, 7, |x, y| {
            Rgb([(x * 23) as u8, (y * 37) as u8, ((x ^ y) * 16) as u8])
        });
        let sigma = 1.4;
        let rgb_blurred = gaussian_blur(&img, sigma);

        let (w, h) = img.dimensions();
        for c in 0..3 {
            let plane = Plane::from_fn(w, h, |x, y| Luma([f32::from(img.get_pixel(x, y).0[c])]));
            let plane_blurred = imageproc::filter::gaussian_blur_f32(&plane, sigma);
            for (x, y, p) in plane_blurred.enumerate_pixels() {
                let got = rgb_blurred.get_pixel(x, y).0[c];
                assert_eq!(got, to_channel(p.0[0]), "({x}, {y}) channel {c}");
            }
        }
    }
}
