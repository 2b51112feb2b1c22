//! Shared types for the grainseg segmentation pipeline.

use serde::{Deserialize, Serialize};

/// Re-export `GrayImage` so downstream crates can reference
/// single-channel intermediates (luminance, edge masks) without
/// depending on `image` directly.
pub use image::GrayImage;

/// Re-export `RgbImage`, the 3-channel 8-bit raster every pipeline
/// stage consumes and produces.
pub use image::RgbImage;

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Dimensions of an RGB raster.
    #[must_use]
    pub fn of(image: &RgbImage) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
        }
    }

    /// Total pixel count.
    #[must_use]
    pub fn pixel_count(self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

/// Configuration for the segmentation pipeline.
///
/// Built once per call and never mutated by a stage. The structuring
/// element used by the morphology stage is not configurable: it is
/// always the 7x7 ellipse from
/// [`morphology::StructuringElement::ellipse`](crate::morphology::StructuringElement::ellipse)
/// with radius [`morphology::ELEMENT_RADIUS`](crate::morphology::ELEMENT_RADIUS).
///
/// Fields are public; call [`Config::validate`] (every stage does) to
/// check the documented domains.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// How many times erosion is applied before dilation. At least 1.
    pub erosion_iterations: u32,

    /// How many times dilation is applied after erosion. At least 1.
    pub dilation_iterations: u32,

    /// Segmentation scale `k`. Larger values produce coarser, larger
    /// regions. Must be finite and positive.
    pub scale: f64,

    /// Gaussian sigma of the smoothing pass dedicated to segmentation.
    /// Zero disables it. Must be finite and non-negative, and
    /// `ceil(2 * sigma)` may not exceed the longer image side.
    pub sigma: f64,

    /// Regions smaller than this many pixels are merged into a
    /// neighbour during the cleanup pass.
    pub min_region_size: usize,

    /// Canny hysteresis low threshold. Gradient magnitudes above
    /// `canny_low` but not above `canny_high` are edges only when
    /// connected to a strong edge. Must be non-negative and below
    /// `canny_high`.
    pub canny_low: f32,

    /// Canny hysteresis high threshold. Gradient magnitudes above this
    /// value are definite edges.
    pub canny_high: f32,

    /// Weight of the colorized image in the final overlay, in `[0, 1]`.
    /// The edge mask gets `1 - blend_alpha`.
    pub blend_alpha: f64,
}

impl Config {
    /// Default number of erosion iterations.
    pub const DEFAULT_EROSION_ITERATIONS: u32 = 1;
    /// Default number of dilation iterations.
    pub const DEFAULT_DILATION_ITERATIONS: u32 = 1;
    /// Default segmentation scale.
    pub const DEFAULT_SCALE: f64 = 100.0;
    /// Default segmentation smoothing sigma.
    pub const DEFAULT_SIGMA: f64 = 0.5;
    /// Default minimum surviving region size in pixels.
    pub const DEFAULT_MIN_REGION_SIZE: usize = 50;
    /// Default Canny low threshold.
    pub const DEFAULT_CANNY_LOW: f32 = 50.0;
    /// Default Canny high threshold.
    pub const DEFAULT_CANNY_HIGH: f32 = 150.0;
    /// Default overlay mix ratio.
    pub const DEFAULT_BLEND_ALPHA: f64 = 0.7;

    /// Check every field against its documented domain.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] naming the first field
    /// that is out of range.
    pub fn validate(&self) -> Result<(), PipelineError> {
        self.validate_morphology()?;
        self.validate_segmentation()?;
        self.validate_overlay()
    }

    /// [`validate`](Self::validate), then check the limits that depend
    /// on the image being processed.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] for an out-of-range field
    /// or a `sigma` too large for the image, and
    /// [`PipelineError::InvalidImage`] for a zero-sized image.
    pub fn validate_for(&self, image: &RgbImage) -> Result<(), PipelineError> {
        self.validate()?;
        ensure_non_empty(image)?;
        self.validate_sigma_for(Dimensions::of(image))
    }

    /// Check the fields read by the preprocessing stage.
    pub(crate) fn validate_morphology(&self) -> Result<(), PipelineError> {
        if self.erosion_iterations < 1 {
            return Err(PipelineError::InvalidConfig(format!(
                "erosion_iterations must be at least 1, got {}",
                self.erosion_iterations
            )));
        }
        if self.dilation_iterations < 1 {
            return Err(PipelineError::InvalidConfig(format!(
                "dilation_iterations must be at least 1, got {}",
                self.dilation_iterations
            )));
        }
        Ok(())
    }

    /// Check the fields read by the graph segmenter.
    pub(crate) fn validate_segmentation(&self) -> Result<(), PipelineError> {
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(PipelineError::InvalidConfig(format!(
                "scale must be finite and positive, got {}",
                self.scale
            )));
        }
        if !self.sigma.is_finite() || self.sigma < 0.0 {
            return Err(PipelineError::InvalidConfig(format!(
                "sigma must be finite and non-negative, got {}",
                self.sigma
            )));
        }
        Ok(())
    }

    /// The segmentation blur kernel has radius `ceil(2 * sigma)`; it may
    /// not exceed the longer side of the image.
    pub(crate) fn validate_sigma_for(&self, dimensions: Dimensions) -> Result<(), PipelineError> {
        let radius = (2.0 * self.sigma).ceil();
        let limit = f64::from(dimensions.width.max(dimensions.height));
        if radius > limit {
            return Err(PipelineError::InvalidConfig(format!(
                "sigma {} is too large for a {}x{} image (kernel radius {radius} > {limit})",
                self.sigma, dimensions.width, dimensions.height
            )));
        }
        Ok(())
    }

    /// Check the fields read by edge detection and compositing.
    pub(crate) fn validate_overlay(&self) -> Result<(), PipelineError> {
        if !self.canny_low.is_finite() || self.canny_low < 0.0 {
            return Err(PipelineError::InvalidConfig(format!(
                "canny_low must be finite and non-negative, got {}",
                self.canny_low
            )));
        }
        if !self.canny_high.is_finite() || self.canny_low >= self.canny_high {
            return Err(PipelineError::InvalidConfig(format!(
                "canny_low ({}) must be below canny_high ({})",
                self.canny_low, self.canny_high
            )));
        }
        if !(0.0..=1.0).contains(&self.blend_alpha) {
            return Err(PipelineError::InvalidConfig(format!(
                "blend_alpha must be within [0, 1], got {}",
                self.blend_alpha
            )));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            erosion_iterations: Self::DEFAULT_EROSION_ITERATIONS,
            dilation_iterations: Self::DEFAULT_DILATION_ITERATIONS,
            scale: Self::DEFAULT_SCALE,
            sigma: Self::DEFAULT_SIGMA,
            min_region_size: Self::DEFAULT_MIN_REGION_SIZE,
            canny_low: Self::DEFAULT_CANNY_LOW,
            canny_high: Self::DEFAULT_CANNY_HIGH,
            blend_alpha: Self::DEFAULT_BLEND_ALPHA,
        }
    }
}

/// Per-pixel region labels produced by the graph segmenter.
///
/// Labels are dense (`0..region_count`) and numbered in row-major order
/// of each region's first pixel, so two runs over equal inputs produce
/// equal maps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelMap {
    width: u32,
    height: u32,
    labels: Vec<u32>,
    region_count: usize,
}

impl LabelMap {
    /// Build a label map from raw row-major labels.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidImage`] if `labels.len()` is not
    /// `width * height`, or if the labels are not dense in
    /// `0..region_count`.
    pub fn from_raw(width: u32, height: u32, labels: Vec<u32>) -> Result<Self, PipelineError> {
        let expected = width as usize * height as usize;
        if labels.len() != expected {
            return Err(PipelineError::InvalidImage(format!(
                "label buffer holds {} entries, expected {width}x{height} = {expected}",
                labels.len()
            )));
        }
        let region_count = labels.iter().max().map_or(0, |&m| m as usize + 1);
        let mut seen = vec![false; region_count];
        for &label in &labels {
            seen[label as usize] = true;
        }
        if seen.iter().any(|s| !s) {
            return Err(PipelineError::InvalidImage(
                "labels must be dense: every id below the maximum must be used".to_owned(),
            ));
        }
        Ok(Self {
            width,
            height,
            labels,
            region_count,
        })
    }

    /// Construct without the density check. Callers guarantee the
    /// labels are dense and `labels.len() == width * height`.
    pub(crate) const fn new_unchecked(
        width: u32,
        height: u32,
        labels: Vec<u32>,
        region_count: usize,
    ) -> Self {
        Self {
            width,
            height,
            labels,
            region_count,
        }
    }

    /// Width in pixels.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Dimensions of the labelled image.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.width,
            height: self.height,
        }
    }

    /// Label of the pixel at `(x, y)`, or `None` when out of bounds.
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> Option<u32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.labels
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }

    /// All labels in row-major order.
    #[must_use]
    pub fn labels(&self) -> &[u32] {
        &self.labels
    }

    /// Number of distinct regions.
    #[must_use]
    pub const fn region_count(&self) -> usize {
        self.region_count
    }

    /// Pixel count of each region, indexed by label.
    #[must_use]
    pub fn region_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0usize; self.region_count];
        for &label in &self.labels {
            sizes[label as usize] += 1;
        }
        sizes
    }
}

/// Errors that can occur during pipeline processing.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The image cannot be processed (zero-sized, unsupported layout,
    /// or mismatched against another input).
    #[error("invalid image: {0}")]
    InvalidImage(String),

    /// A configuration value lies outside its documented domain.
    #[error("invalid pipeline configuration: {0}")]
    InvalidConfig(String),

    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// Failed to decode the input image.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// Failed to encode the output image.
    #[error("failed to encode image: {0}")]
    ImageEncode(image::ImageError),
}

/// Reject images with a zero dimension.
pub(crate) fn ensure_non_empty(image: &RgbImage) -> Result<(), PipelineError> {
    if image.width() == 0 || image.height() == 0 {
        return Err(PipelineError::InvalidImage(format!(
            "image must have non-zero dimensions, got {}x{}",
            image.width(),
            image.height()
        )));
    }
    Ok(())
}
