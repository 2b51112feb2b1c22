//! Grayscale morphology on colour images.
//!
//! Erosion replaces every pixel with the per-channel minimum over the
//! structuring element's footprint; dilation takes the per-channel
//! maximum. Footprint positions that fall outside the image are skipped,
//! so the border never wins the min/max.

use image::Rgb;

use crate::types::RgbImage;

/// Radius of the structuring element used by the preprocessor.
pub const ELEMENT_RADIUS: u32 = 3;

/// A flat structuring element described by the offsets of its hit
/// positions relative to its centre.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuringElement {
    radius: u32,
    offsets: Vec<(i32, i32)>,
}

impl StructuringElement {
    /// Elliptical element inscribed in a `(2r + 1)` square.
    ///
    /// Row `dy` spans `|dx| <= round(r * sqrt(1 - dy^2 / r^2))`. For
    /// `r = 3` the row widths are 1, 5, 7, 7, 7, 5, 1.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    pub fn ellipse(radius: u32) -> Self {
        let r = radius as i32;
        let r_f = f64::from(radius);
        let mut offsets = Vec::new();
        for dy in -r..=r {
            let half_width = if r == 0 {
                0
            } else {
                let t = 1.0 - f64::from(dy * dy) / (r_f * r_f);
                (r_f * t.sqrt()).round() as i32
            };
            for dx in -half_width..=half_width {
                offsets.push((dx, dy));
            }
        }
        Self { radius, offsets }
    }

    /// The element used by the preprocessor: an ellipse of radius
    /// [`ELEMENT_RADIUS`], a 7x7 footprint.
    #[must_use]
    pub fn preprocessing() -> Self {
        Self::ellipse(ELEMENT_RADIUS)
    }

    /// Radius of the bounding square.
    #[must_use]
    pub const fn radius(&self) -> u32 {
        self.radius
    }

    /// Side length of the bounding square.
    #[must_use]
    pub const fn size(&self) -> u32 {
        2 * self.radius + 1
    }

    /// `(dx, dy)` offsets of every hit position.
    #[must_use]
    pub fn offsets(&self) -> &[(i32, i32)] {
        &self.offsets
    }

    /// Whether `(dx, dy)` is a hit position.
    #[must_use]
    pub fn contains(&self, dx: i32, dy: i32) -> bool {
        self.offsets.contains(&(dx, dy))
    }
}

/// Erode `image` once with `element`.
#[must_use = "returns the eroded image"]
pub fn erode(image: &RgbImage, element: &StructuringElement) -> RgbImage {
    rank_filter(image, element, u8::MAX, u8::min)
}

/// Dilate `image` once with `element`.
#[must_use = "returns the dilated image"]
pub fn dilate(image: &RgbImage, element: &StructuringElement) -> RgbImage {
    rank_filter(image, element, u8::MIN, u8::max)
}

/// Erode `iterations` times in sequence. Zero iterations clones the input.
#[must_use = "returns the eroded image"]
pub fn erode_n(image: &RgbImage, element: &StructuringElement, iterations: u32) -> RgbImage {
    (0..iterations).fold(image.clone(), |acc, _| erode(&acc, element))
}

/// Dilate `iterations` times in sequence. Zero iterations clones the input.
#[must_use = "returns the dilated image"]
pub fn dilate_n(image: &RgbImage, element: &StructuringElement, iterations: u32) -> RgbImage {
    (0..iterations).fold(image.clone(), |acc, _| dilate(&acc, element))
}

/// Fold every in-bounds footprint sample with `pick`, starting each
/// channel from `identity`.
#[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
fn rank_filter(
    image: &RgbImage,
    element: &StructuringElement,
    identity: u8,
    pick: fn(u8, u8) -> u8,
) -> RgbImage {
    let (w, h) = image.dimensions();
    let (wi, hi) = (w as i32, h as i32);

    RgbImage::from_fn(w, h, |x, y| {
        let mut acc = [identity; 3];
        for &(dx, dy) in element.offsets() {
            let nx = x as i32 + dx;
            let ny = y as i32 + dy;
            if nx < 0 || ny < 0 || nx >= wi || ny >= hi {
                continue;
            }
            let sample = image.get_pixel(nx as u32, ny as u32).0;
            for (a, s) in acc.iter_mut().zip(sample) {
                *a = pick(*a, s);
            }
        }
        Rgb(acc)
    })
}
