//! Pipeline entry points.
//!
//! [`preprocess_only`] and [`segment_and_enhance`] return just the final
//! image. [`process_staged`] runs the full chain and keeps every
//! intermediate alongside per-stage [`PipelineDiagnostics`].
//!
//! ```rust
//! # use grainseg_pipeline::{Config, PipelineError, RgbImage};
//! # fn run(image: &RgbImage) -> Result<(), PipelineError> {
//! let staged = grainseg_pipeline::process_staged(image, &Config::default(), true)?;
//! println!("{} regions", staged.labels.region_count());
//! println!("{}", staged.diagnostics.report());
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use tracing::debug;

use crate::colorize::colorize;
use crate::composite::composite;
use crate::diagnostics::{
    Clock, PipelineDiagnostics, PipelineSummary, StageDiagnostics, StageMetrics, SystemClock,
};
use crate::edge::{count_edge_pixels, detect_edges};
use crate::preprocess::preprocess;
use crate::segment::segment;
use crate::types::{Config, Dimensions, GrayImage, LabelMap, PipelineError, RgbImage};

/// Optional blur followed by erosion and dilation.
///
/// # Errors
///
/// See [`preprocess`].
pub fn preprocess_only(
    image: &RgbImage,
    config: &Config,
    use_blur: bool,
) -> Result<RgbImage, PipelineError> {
    preprocess(image, config, use_blur)
}

/// Preprocess, segment, recolour each region with its mean colour from
/// `image`, and overlay the region boundaries.
///
/// Segmentation runs on the preprocessed image; recolouring samples the
/// untouched input.
///
/// # Errors
///
/// Returns the first error from any stage. Configuration errors,
/// including a `sigma` too large for `image`, are reported before any
/// pixel work.
pub fn segment_and_enhance(
    image: &RgbImage,
    config: &Config,
    use_blur: bool,
) -> Result<RgbImage, PipelineError> {
    config.validate_for(image)?;
    let preprocessed = preprocess(image, config, use_blur)?;
    let labels = segment(&preprocessed, config)?;
    let colorized = colorize(&labels, image)?;
    let edges = detect_edges(&colorized, config)?;
    composite(&colorized, &edges, config.blend_alpha)
}

/// Every intermediate of a full run, plus diagnostics.
#[derive(Debug, Clone)]
pub struct StagedResult {
    /// Output of the preprocessing stage.
    pub preprocessed: RgbImage,
    /// Region labels computed from `preprocessed`.
    pub labels: LabelMap,
    /// Input recoloured with per-region means.
    pub colorized: RgbImage,
    /// Binary boundary mask of `colorized`.
    pub edges: GrayImage,
    /// Final overlay.
    pub output: RgbImage,
    /// Source image dimensions in pixels.
    pub dimensions: Dimensions,
    /// Per-stage timings and counts.
    pub diagnostics: PipelineDiagnostics,
}

/// Run the full chain with blur on or off, keeping every intermediate.
///
/// # Errors
///
/// Same as [`segment_and_enhance`].
pub fn process_staged(
    image: &RgbImage,
    config: &Config,
    use_blur: bool,
) -> Result<StagedResult, PipelineError> {
    process_staged_with_clock(image, config, use_blur, &SystemClock)
}

/// [`process_staged`] with an explicit timing source.
///
/// # Errors
///
/// Same as [`segment_and_enhance`].
pub fn process_staged_with_clock<C: Clock>(
    image: &RgbImage,
    config: &Config,
    use_blur: bool,
    clock: &C,
) -> Result<StagedResult, PipelineError> {
    config.validate_for(image)?;
    let run_start = clock.now();
    let dimensions = Dimensions::of(image);

    let (preprocessed, preprocess_time) = timed(clock, || preprocess(image, config, use_blur))?;
    let (labels, segment_time) = timed(clock, || segment(&preprocessed, config))?;
    let (colorized, colorize_time) = timed(clock, || colorize(&labels, image))?;
    let (edges, edge_time) = timed(clock, || detect_edges(&colorized, config))?;
    let (output, composite_time) =
        timed(clock, || composite(&colorized, &edges, config.blend_alpha))?;

    let sizes = labels.region_sizes();
    let edge_pixel_count = count_edge_pixels(&edges);
    let diagnostics = PipelineDiagnostics {
        preprocess: StageDiagnostics {
            duration: preprocess_time,
            metrics: StageMetrics::Preprocess {
                blurred: use_blur,
                erosion_iterations: config.erosion_iterations,
                dilation_iterations: config.dilation_iterations,
            },
        },
        segmentation: StageDiagnostics {
            duration: segment_time,
            metrics: StageMetrics::Segmentation {
                scale: config.scale,
                sigma: config.sigma,
                min_region_size: config.min_region_size,
                region_count: labels.region_count(),
                smallest_region: sizes.iter().copied().min().unwrap_or(0),
                largest_region: sizes.iter().copied().max().unwrap_or(0),
            },
        },
        colorize: StageDiagnostics {
            duration: colorize_time,
            metrics: StageMetrics::Colorize {
                region_count: labels.region_count(),
            },
        },
        edge_detection: StageDiagnostics {
            duration: edge_time,
            metrics: StageMetrics::EdgeDetection {
                low_threshold: config.canny_low,
                high_threshold: config.canny_high,
                edge_pixel_count,
                total_pixel_count: dimensions.pixel_count(),
            },
        },
        composite: StageDiagnostics {
            duration: composite_time,
            metrics: StageMetrics::Composite {
                blend_alpha: config.blend_alpha,
            },
        },
        total_duration: clock.elapsed(&run_start),
        summary: PipelineSummary {
            image_width: dimensions.width,
            image_height: dimensions.height,
            pixel_count: dimensions.pixel_count(),
            region_count: labels.region_count(),
            edge_pixel_count,
        },
    };
    debug!(
        total_ms = diagnostics.total_duration.as_secs_f64() * 1000.0,
        "staged run complete"
    );

    Ok(StagedResult {
        preprocessed,
        labels,
        colorized,
        edges,
        output,
        dimensions,
        diagnostics,
    })
}

/// Run `stage` and measure how long it took.
fn timed<C: Clock, T>(
    clock: &C,
    stage: impl FnOnce() -> Result<T, PipelineError>,
) -> Result<(T, Duration), PipelineError> {
    let start = clock.now();
    let value = stage()?;
    Ok((value, clock.elapsed(&start)))
}
