//! Overlay of region boundaries on the colorized image.

use image::Rgb;
use tracing::debug;

use crate::color::gray_to_rgb;
use crate::edge::detect_edges;
use crate::types::{Config, GrayImage, PipelineError, RgbImage, ensure_non_empty};

/// Detect boundaries in `colorized` and blend them over it.
///
/// Equivalent to [`detect_edges`] followed by [`composite`] with
/// `config.blend_alpha`.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidImage`] for a zero-sized image and
/// [`PipelineError::InvalidConfig`] if the Canny thresholds or
/// `blend_alpha` are out of range.
pub fn enhance_and_composite(
    colorized: &RgbImage,
    config: &Config,
) -> Result<RgbImage, PipelineError> {
    let mask = detect_edges(colorized, config)?;
    composite(colorized, &mask, config.blend_alpha)
}

/// Blend `colorized` with `mask` broadcast to three channels:
/// `round(alpha * colorized + (1 - alpha) * mask)` per channel.
///
/// `alpha == 1` returns `colorized` unchanged and `alpha == 0` returns
/// the broadcast mask.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidImage`] if the image is zero-sized or
/// the mask dimensions differ, and [`PipelineError::InvalidConfig`] if
/// `alpha` is outside `[0, 1]`.
pub fn composite(
    colorized: &RgbImage,
    mask: &GrayImage,
    alpha: f64,
) -> Result<RgbImage, PipelineError> {
    ensure_non_empty(colorized)?;
    if colorized.dimensions() != mask.dimensions() {
        return Err(PipelineError::InvalidImage(format!(
            "edge mask is {}x{} but image is {}x{}",
            mask.width(),
            mask.height(),
            colorized.width(),
            colorized.height()
        )));
    }
    if !(0.0..=1.0).contains(&alpha) {
        return Err(PipelineError::InvalidConfig(format!(
            "blend_alpha must be within [0, 1], got {alpha}"
        )));
    }

    #[allow(clippy::float_cmp)]
    let blended = if alpha == 1.0 {
        colorized.clone()
    } else if alpha == 0.0 {
        gray_to_rgb(mask)
    } else {
        RgbImage::from_fn(colorized.width(), colorized.height(), |x, y| {
            let edge = f64::from(mask.get_pixel(x, y).0[0]);
            Rgb(colorized
                .get_pixel(x, y)
                .0
                .map(|c| blend(f64::from(c), edge, alpha)))
        })
    };
    debug!(alpha, "composited edge overlay");
    Ok(blended)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn blend(color: f64, edge: f64, alpha: f64) -> u8 {
    alpha
        .mul_add(color, (1.0 - alpha) * edge)
        .round()
        .clamp(0.0, 255.0) as u8
}
