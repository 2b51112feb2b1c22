//! Canny edge detection: Sobel gradients, non-maximum suppression, and
//! hysteresis thresholding.
//!
//! Adapted from `imageproc::edges::canny` with four differences:
//!
//! - Gradient magnitude is the L1 norm `|gx| + |gy|`.
//! - Both thresholds are strict: a magnitude must exceed `high_threshold`
//!   to seed an edge and exceed `low_threshold` to extend one, so a
//!   suppressed (zero) pixel never joins an edge.
//! - No internal Gaussian blur. The input here is a region-averaged
//!   image whose boundaries are already exact steps.
//! - Every pixel is processed, including the outermost rows and
//!   columns. Gradients use clamp-to-edge sampling; non-maximum
//!   suppression treats positions outside the image as zero magnitude.
//! - Hysteresis tracks all eight neighbours with bounds checks.

use image::{GrayImage, Luma};
use imageproc::definitions::Image;
use imageproc::filter::filter_clamped;
use imageproc::kernel;

/// Pixel value marking an edge in the output mask.
pub const EDGE: u8 = 255;

/// Pixel value marking background in the output mask.
pub const BACKGROUND: u8 = 0;

/// Run Canny edge detection on a single-channel image.
///
/// Returns a binary mask: [`EDGE`] where an edge was found,
/// [`BACKGROUND`] elsewhere. Gradient magnitudes above `high_threshold`
/// seed edges; magnitudes above `low_threshold` extend them when
/// 8-connected to a seed.
#[must_use = "returns the binary edge mask"]
pub fn canny(image: &GrayImage, low_threshold: f32, high_threshold: f32) -> GrayImage {
    let gx: Image<Luma<i16>> = filter_clamped(image, kernel::SOBEL_HORIZONTAL_3X3);
    let gy: Image<Luma<i16>> = filter_clamped(image, kernel::SOBEL_VERTICAL_3X3);

    let magnitude = Image::from_fn(image.width(), image.height(), |x, y| {
        let h = f32::from(gx.get_pixel(x, y).0[0]);
        let v = f32::from(gy.get_pixel(x, y).0[0]);
        Luma([h.abs() + v.abs()])
    });

    let thinned = non_maximum_suppression(&magnitude, &gx, &gy);
    hysteresis(&thinned, low_threshold, high_threshold)
}

/// Gradient direction quantized to the four neighbour axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Horizontal,
    Diagonal,
    Vertical,
    AntiDiagonal,
}

impl Direction {
    fn of(x_gradient: f32, y_gradient: f32) -> Self {
        let mut angle = y_gradient.atan2(x_gradient).to_degrees();
        if angle < 0.0 {
            angle += 180.0;
        }
        if (22.5..67.5).contains(&angle) {
            Self::Diagonal
        } else if (67.5..112.5).contains(&angle) {
            Self::Vertical
        } else if (112.5..157.5).contains(&angle) {
            Self::AntiDiagonal
        } else {
            Self::Horizontal
        }
    }

    /// Offsets of the two neighbours across the gradient.
    const fn neighbors(self) -> [(i64, i64); 2] {
        match self {
            Self::Horizontal => [(-1, 0), (1, 0)],
            Self::Diagonal => [(1, 1), (-1, -1)],
            Self::Vertical => [(0, -1), (0, 1)],
            Self::AntiDiagonal => [(-1, 1), (1, -1)],
        }
    }
}

/// Magnitude at `(x, y)`, or zero outside the image.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn magnitude_at(g: &Image<Luma<f32>>, x: i64, y: i64) -> f32 {
    if x < 0 || y < 0 || x >= i64::from(g.width()) || y >= i64::from(g.height()) {
        return 0.0;
    }
    g.get_pixel(x as u32, y as u32).0[0]
}

/// Keep only pixels that are not strictly weaker than either neighbour
/// across the gradient direction.
fn non_maximum_suppression(
    g: &Image<Luma<f32>>,
    gx: &Image<Luma<i16>>,
    gy: &Image<Luma<i16>>,
) -> Image<Luma<f32>> {
    Image::from_fn(g.width(), g.height(), |x, y| {
        let pixel = g.get_pixel(x, y).0[0];
        if pixel <= 0.0 {
            return Luma([0.0]);
        }
        let direction = Direction::of(
            f32::from(gx.get_pixel(x, y).0[0]),
            f32::from(gy.get_pixel(x, y).0[0]),
        );
        let (xi, yi) = (i64::from(x), i64::from(y));
        let suppressed = direction
            .neighbors()
            .iter()
            .any(|&(dx, dy)| pixel < magnitude_at(g, xi + dx, yi + dy));
        Luma([if suppressed { 0.0 } else { pixel }])
    })
}

/// Double-threshold hysteresis with an explicit stack (no recursion).
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn hysteresis(input: &Image<Luma<f32>>, low_thresh: f32, high_thresh: f32) -> GrayImage {
    let (w, h) = input.dimensions();
    let mut out = GrayImage::from_pixel(w, h, Luma([BACKGROUND]));
    let mut stack = Vec::new();

    for y in 0..h {
        for x in 0..w {
            if input.get_pixel(x, y).0[0] <= high_thresh || out.get_pixel(x, y).0[0] == EDGE {
                continue;
            }
            out.put_pixel(x, y, Luma([EDGE]));
            stack.push((x, y));

            while let Some((nx, ny)) = stack.pop() {
                for dy in -1i64..=1 {
                    for dx in -1i64..=1 {
                        if dx == 0 && dy == 0 {
                            continue;
                        }
                        let (cx, cy) = (i64::from(nx) + dx, i64::from(ny) + dy);
                        if cx < 0 || cy < 0 || cx >= i64::from(w) || cy >= i64::from(h) {
                            continue;
                        }
                        let (cx, cy) = (cx as u32, cy as u32);
                        if input.get_pixel(cx, cy).0[0] > low_thresh
                            && out.get_pixel(cx, cy).0[0] != EDGE
                        {
                            out.put_pixel(cx, cy, Luma([EDGE]));
                            stack.push((cx, cy));
                        }
                    }
                }
            }
        }
    }
    out
}
