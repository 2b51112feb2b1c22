//! Region recolouring: paint every region with its mean colour taken
//! from the original, unsmoothed image.

use image::Rgb;
use tracing::debug;

use crate::types::{Dimensions, LabelMap, PipelineError, RgbImage, ensure_non_empty};

/// Replace every pixel with the mean colour of its region in `original`.
///
/// Means are computed per channel with exact integer sums and rounded
/// half up, so the output averaged over any region equals the original
/// averaged over the same region up to that rounding.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidImage`] if `original` has a zero
/// dimension or its dimensions differ from the label map's.
pub fn colorize(labels: &LabelMap, original: &RgbImage) -> Result<RgbImage, PipelineError> {
    let means = region_means(labels, original)?;
    let width = labels.width();
    let colorized = RgbImage::from_fn(labels.width(), labels.height(), |x, y| {
        let index = y as usize * width as usize + x as usize;
        Rgb(means[labels.labels()[index] as usize])
    });
    debug!(regions = means.len(), "colorized regions");
    Ok(colorized)
}

/// Mean colour of every region of `labels` in `original`, indexed by
/// label.
///
/// # Errors
///
/// Same as [`colorize`].
pub fn region_means(labels: &LabelMap, original: &RgbImage) -> Result<Vec<[u8; 3]>, PipelineError> {
    ensure_non_empty(original)?;
    if labels.dimensions() != Dimensions::of(original) {
        return Err(PipelineError::InvalidImage(format!(
            "label map is {}x{} but image is {}x{}",
            labels.width(),
            labels.height(),
            original.width(),
            original.height()
        )));
    }

    let mut sums = vec![[0u64; 3]; labels.region_count()];
    let mut counts = vec![0u64; labels.region_count()];
    for (pixel, &label) in original.pixels().zip(labels.labels()) {
        let sum = &mut sums[label as usize];
        for (s, &c) in sum.iter_mut().zip(&pixel.0) {
            *s += u64::from(c);
        }
        counts[label as usize] += 1;
    }

    Ok(sums
        .iter()
        .zip(&counts)
        .map(|(sum, &count)| sum.map(|s| rounded_mean(s, count)))
        .collect())
}

/// `round(sum / count)` with halves rounded up, clamped to `u8`.
fn rounded_mean(sum: u64, count: u64) -> u8 {
    if count == 0 {
        return 0;
    }
    let mean = (2 * sum + count) / (2 * count);
    u8::try_from(mean).unwrap_or(u8::MAX)
}
