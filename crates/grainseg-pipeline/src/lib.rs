//! grainseg-pipeline: grain boundary segmentation (sans-IO).
//!
//! Turns a micrograph into a picture of its grains through:
//! optional blur -> erosion/dilation -> graph segmentation ->
//! per-region mean colour -> boundary overlay.
//!
//! This crate has **no I/O dependencies**: it operates on in-memory
//! rasters and byte slices. Reading and writing files lives in the
//! `grainseg` binary.
//!
//! Four variants cover the combinations of blur on/off and
//! morphology-only vs. full segmentation; see [`Variant`].

pub mod blur;
pub mod canny;
pub mod codec;
pub mod color;
pub mod colorize;
pub mod composite;
pub mod diagnostics;
pub mod edge;
pub mod forest;
pub mod morphology;
pub mod pipeline;
pub mod preprocess;
pub mod segment;
pub mod types;
pub mod variant;

pub use colorize::colorize;
pub use composite::enhance_and_composite;
pub use pipeline::{
    StagedResult, preprocess_only, process_staged, process_staged_with_clock, segment_and_enhance,
};
pub use preprocess::preprocess;
pub use segment::segment;
pub use types::{Config, Dimensions, GrayImage, LabelMap, PipelineError, RgbImage};
pub use variant::{Variant, VariantOutputs, run_all, run_variant};
