//! The four named pipeline variants.
//!
//! Each variant is one point in {blurred, unblurred} x {morphology only,
//! full segmentation}. [`run_all`] produces every variant from a single
//! source image so they can be compared side by side.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::pipeline::{preprocess_only, segment_and_enhance};
use crate::types::{Config, PipelineError, RgbImage};

/// One of the four pipeline variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Variant {
    /// Fixed Gaussian blur, then erosion and dilation.
    MorphologyBlurred,
    /// Erosion and dilation only.
    MorphologyUnblurred,
    /// Blurred preprocessing, segmentation, colorization, and edge overlay.
    SegmentedBlurred,
    /// Unblurred preprocessing, segmentation, colorization, and edge
    /// overlay.
    SegmentedUnblurred,
}

impl Variant {
    /// All variants, in the order [`run_all`] produces them.
    pub const ALL: [Self; 4] = [
        Self::MorphologyBlurred,
        Self::MorphologyUnblurred,
        Self::SegmentedBlurred,
        Self::SegmentedUnblurred,
    ];

    /// Whether the fixed Gaussian blur runs before morphology.
    #[must_use]
    pub const fn use_blur(self) -> bool {
        matches!(self, Self::MorphologyBlurred | Self::SegmentedBlurred)
    }

    /// Whether segmentation, colorization, and edge overlay run after
    /// preprocessing.
    #[must_use]
    pub const fn segments(self) -> bool {
        matches!(self, Self::SegmentedBlurred | Self::SegmentedUnblurred)
    }

    /// Kebab-case name, matching the serde representation.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::MorphologyBlurred => "morphology-blurred",
            Self::MorphologyUnblurred => "morphology-unblurred",
            Self::SegmentedBlurred => "segmented-blurred",
            Self::SegmentedUnblurred => "segmented-unblurred",
        }
    }

    /// Suffix used when naming an output file for this variant.
    #[must_use]
    pub const fn file_stem(self) -> &'static str {
        match self {
            Self::MorphologyBlurred => "morphology_blurred",
            Self::MorphologyUnblurred => "morphology_unblurred",
            Self::SegmentedBlurred => "segmented_blurred",
            Self::SegmentedUnblurred => "segmented_unblurred",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Run a single variant over `image`.
///
/// # Errors
///
/// Propagates the first error from any stage the variant runs.
pub fn run_variant(
    image: &RgbImage,
    config: &Config,
    variant: Variant,
) -> Result<RgbImage, PipelineError> {
    debug!(%variant, "running variant");
    if variant.segments() {
        segment_and_enhance(image, config, variant.use_blur())
    } else {
        preprocess_only(image, config, variant.use_blur())
    }
}

/// Output of every variant for one source image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantOutputs {
    outputs: Vec<(Variant, RgbImage)>,
}

impl VariantOutputs {
    /// Output of `variant`.
    #[must_use]
    pub fn get(&self, variant: Variant) -> Option<&RgbImage> {
        self.outputs
            .iter()
            .find(|(v, _)| *v == variant)
            .map(|(_, image)| image)
    }

    /// All outputs in [`Variant::ALL`] order.
    pub fn iter(&self) -> impl Iterator<Item = (Variant, &RgbImage)> {
        self.outputs.iter().map(|(v, image)| (*v, image))
    }

    /// Number of outputs.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.outputs.len()
    }

    /// Whether no outputs were produced.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }
}

/// Run all four variants over `image`, in [`Variant::ALL`] order.
///
/// # Errors
///
/// Returns the first error encountered; no partial output is returned.
pub fn run_all(image: &RgbImage, config: &Config) -> Result<VariantOutputs, PipelineError> {
    let outputs = Variant::ALL
        .iter()
        .map(|&variant| run_variant(image, config, variant).map(|out| (variant, out)))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(VariantOutputs { outputs })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashSet;

    use image::Rgb;

    use super::*;

    fn square_on_black() -> RgbImage {
        RgbImage::from_fn(24, 24, |x, y| {
            if (7..17).contains(&x) && (7..17).contains(&y) {
                Rgb([230, 220, 210])
            } else {
                Rgb([10, 20, 30])
            }
        })
    }

    #[test]
    fn all_contains_every_variant_once() {
        let unique: HashSet<Variant> = Variant::ALL.into_iter().collect();
        assert_eq!(unique.len(), 4);
    }

    #[test]
    fn flags_cover_the_two_by_two_grid() {
        let grid: HashSet<(bool, bool)> = Variant::ALL
            .iter()
            .map(|v| (v.use_blur(), v.segments()))
            .collect();
        assert_eq!(grid.len(), 4);
    }

    #[test]
    fn names_and_stems_are_distinct() {
        let names: HashSet<&str> = Variant::ALL.iter().map(|v| v.name()).collect();
        let stems: HashSet<&str> = Variant::ALL.iter().map(|v| v.file_stem()).collect();
        assert_eq!(names.len(), 4);
        assert_eq!(stems.len(), 4);
    }

    #[test]
    fn display_matches_serde_name() {
        for variant in Variant::ALL {
            let json = serde_json::to_string(&variant).unwrap();
            assert_eq!(json, format!("\"{variant}\""));
            let back: Variant = serde_json::from_str(&json).unwrap();
            assert_eq!(back, variant);
        }
    }

    #[test]
    fn run_variant_dispatches_to_matching_entry_point() {
        let image = square_on_black();
        let config = Config::default();
        for variant in Variant::ALL {
            let expected = if variant.segments() {
                segment_and_enhance(&image, &config, variant.use_blur()).unwrap()
            } else {
                preprocess_only(&image, &config, variant.use_blur()).unwrap()
            };
            assert_eq!(run_variant(&image, &config, variant).unwrap(), expected);
        }
    }

    #[test]
    fn run_all_produces_every_variant_in_order() {
        let image = square_on_black();
        let outputs = run_all(&image, &Config::default()).unwrap();
        assert_eq!(outputs.len(), 4);
        let order: Vec<Variant> = outputs.iter().map(|(v, _)| v).collect();
        assert_eq!(order, Variant::ALL);
        for (_, out) in outputs.iter() {
            assert_eq!(out.dimensions(), image.dimensions());
        }
        assert!(outputs.get(Variant::SegmentedBlurred).is_some());
    }

    #[test]
    fn run_all_surfaces_config_errors() {
        let config = Config {
            erosion_iterations: 0,
            ..Config::default()
        };
        let result = run_all(&square_on_black(), &config);
        assert!(matches!(result, Err(PipelineError::InvalidConfig(_))));
    }
}
