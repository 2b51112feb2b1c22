//! Boundary extraction from a colorized image.
//!
//! Converts to luminance and runs [`canny`](crate::canny::canny) with the
//! configured thresholds. The result is a binary mask: 255 on region
//! boundaries, 0 elsewhere.

use tracing::debug;

use crate::canny::{self, EDGE};
use crate::color::rgb_to_gray;
use crate::types::{Config, GrayImage, PipelineError, RgbImage, ensure_non_empty};

/// Detect region boundaries in `colorized`.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidImage`] for a zero-sized image and
/// [`PipelineError::InvalidConfig`] if the Canny thresholds or the blend
/// ratio are out of range.
pub fn detect_edges(colorized: &RgbImage, config: &Config) -> Result<GrayImage, PipelineError> {
    ensure_non_empty(colorized)?;
    config.validate_overlay()?;

    let luminance = rgb_to_gray(colorized);
    let edges = canny::canny(&luminance, config.canny_low, config.canny_high);
    debug!(
        width = edges.width(),
        height = edges.height(),
        edge_pixels = count_edge_pixels(&edges),
        "detected edges"
    );
    Ok(edges)
}

/// Number of edge pixels (value 255) in a mask.
#[must_use]
pub fn count_edge_pixels(mask: &GrayImage) -> u64 {
    mask.pixels().map(|p| u64::from(p.0[0] == EDGE)).sum()
}
