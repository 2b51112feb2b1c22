//! Preprocessing: optional fixed Gaussian blur followed by erosion and
//! then dilation with the elliptical structuring element.
//!
//! The erosion and dilation counts are independent, so this is not a
//! morphological opening in general: three erosions followed by one
//! dilation leave shapes smaller than they started.

use std::borrow::Cow;

use tracing::debug;

use crate::blur;
use crate::morphology::{self, StructuringElement};
use crate::types::{Config, PipelineError, RgbImage, ensure_non_empty};

/// Smooth `image` for segmentation.
///
/// 1. If `use_blur`, apply the fixed 5x5 Gaussian
///    ([`blur::fixed_gaussian_blur`]).
/// 2. Erode `config.erosion_iterations` times.
/// 3. Dilate `config.dilation_iterations` times.
///
/// The output has the same dimensions as the input.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidImage`] if the image has a zero
/// dimension. Returns [`PipelineError::InvalidConfig`] if either
/// iteration count is zero.
pub fn preprocess(
    image: &RgbImage,
    config: &Config,
    use_blur: bool,
) -> Result<RgbImage, PipelineError> {
    ensure_non_empty(image)?;
    config.validate_morphology()?;

    let source = if use_blur {
        Cow::Owned(blur::fixed_gaussian_blur(image))
    } else {
        Cow::Borrowed(image)
    };

    let element = StructuringElement::preprocessing();
    let eroded = morphology::erode_n(&source, &element, config.erosion_iterations);
    let dilated = morphology::dilate_n(&eroded, &element, config.dilation_iterations);

    debug!(
        width = image.width(),
        height = image.height(),
        use_blur,
        erosion_iterations = config.erosion_iterations,
        dilation_iterations = config.dilation_iterations,
        "preprocessed image"
    );

    Ok(dilated)
}
