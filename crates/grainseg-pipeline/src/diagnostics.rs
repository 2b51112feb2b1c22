//! Pipeline diagnostics: timing and counts for each stage.
//!
//! Every call to [`process_staged`](crate::process_staged) collects
//! diagnostics alongside the intermediate images. Timestamps come from a
//! [`Clock`]; the default [`SystemClock`] uses the `web-time` crate, which
//! maps to `performance.now()` on WASM and `std::time::Instant` natively.
//!
//! Durations are serialized as fractional seconds (`f64`), since
//! `std::time::Duration` does not implement serde traits.

use std::fmt::Write as _;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// `Duration` <-> `f64` seconds, for `#[serde(with = "...")]`.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        value.as_secs_f64().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let seconds = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(seconds).map_err(|e| {
            serde::de::Error::custom(format_args!("invalid duration {seconds}s: {e}"))
        })
    }
}

/// Source of timestamps for stage timing.
pub trait Clock {
    /// Opaque point in time.
    type Instant;

    /// The current instant.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// [`Clock`] backed by [`web_time::Instant`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    type Instant = web_time::Instant;

    fn now(&self) -> Self::Instant {
        web_time::Instant::now()
    }

    fn elapsed(&self, since: &Self::Instant) -> Duration {
        since.elapsed()
    }
}

/// Diagnostics collected from a single staged run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineDiagnostics {
    /// Optional blur plus erosion and dilation.
    pub preprocess: StageDiagnostics,
    /// Graph segmentation.
    pub segmentation: StageDiagnostics,
    /// Region recolouring.
    pub colorize: StageDiagnostics,
    /// Luminance conversion and Canny edge detection.
    pub edge_detection: StageDiagnostics,
    /// Edge overlay.
    pub composite: StageDiagnostics,
    /// Total wall-clock duration of the run (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Image size and final counts.
    pub summary: PipelineSummary,
}

/// Timing and metrics of one stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock time spent in the stage.
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics.
    pub metrics: StageMetrics,
}

/// Stage-specific metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Preprocessing metrics.
    Preprocess {
        /// Whether the fixed Gaussian blur ran.
        blurred: bool,
        /// Erosion passes applied.
        erosion_iterations: u32,
        /// Dilation passes applied.
        dilation_iterations: u32,
    },
    /// Graph segmentation metrics.
    Segmentation {
        /// Scale parameter `k`.
        scale: f64,
        /// Smoothing sigma.
        sigma: f64,
        /// Minimum region size enforced by the cleanup pass.
        min_region_size: usize,
        /// Number of regions in the label map.
        region_count: usize,
        /// Pixel count of the smallest region.
        smallest_region: usize,
        /// Pixel count of the largest region.
        largest_region: usize,
    },
    /// Recolouring metrics.
    Colorize {
        /// Number of distinct mean colours written.
        region_count: usize,
    },
    /// Boundary detection metrics.
    EdgeDetection {
        /// Low hysteresis threshold.
        low_threshold: f32,
        /// High hysteresis threshold.
        high_threshold: f32,
        /// Number of edge pixels (value 255) in the mask.
        edge_pixel_count: u64,
        /// Pixels in the mask, for coverage.
        total_pixel_count: u64,
    },
    /// Overlay metrics.
    Composite {
        /// Weight of the colorized image.
        blend_alpha: f64,
    },
}

/// High-level summary counts for a staged run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineSummary {
    pub image_width: u32,
    pub image_height: u32,
    /// `image_width * image_height`.
    pub pixel_count: u64,
    /// Number of regions found.
    pub region_count: usize,
    /// Number of boundary pixels in the edge mask.
    pub edge_pixel_count: u64,
}

impl PipelineDiagnostics {
    /// Plain-text table of stage timings and metrics.
    ///
    /// ```text
    /// 640x480 image, 307200 px, 12.345 ms
    ///
    /// stage                 ms  share  metrics
    /// preprocess         1.234  10.0%  blur, erode 1, dilate 1
    /// ...
    ///
    /// 87 regions, 5120 boundary pixels
    /// ```
    #[must_use]
    pub fn report(&self) -> String {
        let total = millis(self.total_duration);
        let PipelineSummary {
            image_width,
            image_height,
            pixel_count,
            ..
        } = self.summary;
        let mut out = format!("{image_width}x{image_height} image, {pixel_count} px, {total:.3} ms\n\n");
        let _ = writeln!(out, "{:<14} {:>9} {:>6}  metrics", "stage", "ms", "share");
        for (name, stage) in self.stages() {
            let ms = millis(stage.duration);
            let share = if total > 0.0 { 100.0 * ms / total } else { 0.0 };
            let _ = writeln!(
                out,
                "{name:<14} {ms:>9.3} {share:>5.1}%  {}",
                stage.metrics.summary()
            );
        }
        let _ = write!(
            out,
            "\n{} regions, {} boundary pixels",
            self.summary.region_count, self.summary.edge_pixel_count,
        );
        out
    }

    /// Every stage with its display name, in execution order.
    #[must_use]
    pub fn stages(&self) -> [(&'static str, &StageDiagnostics); 5] {
        [
            ("preprocess", &self.preprocess),
            ("segmentation", &self.segmentation),
            ("colorize", &self.colorize),
            ("edges", &self.edge_detection),
            ("composite", &self.composite),
        ]
    }
}

impl StageMetrics {
    /// One-line rendering used by [`PipelineDiagnostics::report`].
    #[must_use]
    pub fn summary(&self) -> String {
        match *self {
            Self::Preprocess {
                blurred,
                erosion_iterations,
                dilation_iterations,
            } => format!(
                "{}erode {erosion_iterations}, dilate {dilation_iterations}",
                if blurred { "blur, " } else { "" }
            ),
            Self::Segmentation {
                scale,
                sigma,
                min_region_size,
                region_count,
                smallest_region,
                largest_region,
            } => format!(
                "scale {scale}, sigma {sigma}, min size {min_region_size}: \
                 {region_count} regions of {smallest_region}-{largest_region} px"
            ),
            Self::Colorize { region_count } => format!("{region_count} mean colours"),
            Self::EdgeDetection {
                low_threshold,
                high_threshold,
                edge_pixel_count,
                total_pixel_count,
            } => {
                #[allow(clippy::cast_precision_loss)]
                let coverage = if total_pixel_count == 0 {
                    0.0
                } else {
                    100.0 * edge_pixel_count as f64 / total_pixel_count as f64
                };
                format!(
                    "canny {low_threshold}/{high_threshold}: {edge_pixel_count} px ({coverage:.1}% of image)"
                )
            }
            Self::Composite { blend_alpha } => format!("alpha {blend_alpha}"),
        }
    }
}

fn millis(d: Duration) -> f64 {
    d.as_secs_f64() * 1e3
}
