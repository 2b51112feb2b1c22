//! Graph-based region segmentation (Felzenszwalb-Huttenlocher).
//!
//! Pixels are the nodes of an implicit 8-connected graph. Each edge is
//! weighted by the Euclidean distance between its endpoints' colours in
//! a Gaussian-smoothed copy of the image. Edges are visited in ascending
//! weight order and two components merge when the edge between them is
//! no heavier than either component's internal difference plus
//! `scale / size`. A second pass over the same edge order absorbs
//! components smaller than `min_region_size` into a neighbour.
//!
//! The size cleanup is its own pass; folding it into the first pass
//! would change which components merge.

use tracing::{debug, trace};

use crate::blur;
use crate::forest::DisjointForest;
use crate::types::{Config, Dimensions, LabelMap, PipelineError, RgbImage, ensure_non_empty};

/// Forward neighbour offsets in discovery order: right, down-right,
/// down, down-left. Together with the row-major pixel scan they visit
/// every 8-connected pair exactly once.
const FORWARD_NEIGHBORS: [(i64, i64); 4] = [(1, 0), (1, 1), (0, 1), (-1, 1)];

/// A weighted edge between two pixels, addressed by row-major index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    /// First endpoint (the pixel being scanned).
    pub a: u32,
    /// Second endpoint (a forward neighbour of `a`).
    pub b: u32,
    /// Colour distance between the endpoints.
    pub weight: f32,
}

/// Segment `image` into regions.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidImage`] if the image has a zero
/// dimension or more pixels than fit in a `u32` index. Returns
/// [`PipelineError::InvalidConfig`] if `scale` is not finite and
/// positive, `sigma` is negative, or `sigma` implies a blur kernel
/// wider than the image.
#[allow(clippy::cast_possible_truncation)]
pub fn segment(image: &RgbImage, config: &Config) -> Result<LabelMap, PipelineError> {
    ensure_non_empty(image)?;
    config.validate_segmentation()?;

    let (width, height) = image.dimensions();
    let pixel_count = width as usize * height as usize;
    if u32::try_from(pixel_count).is_err() {
        return Err(PipelineError::InvalidImage(format!(
            "{width}x{height} image has too many pixels to segment"
        )));
    }

    config.validate_sigma_for(Dimensions::of(image))?;

    let smoothed = blur::gaussian_blur(image, config.sigma as f32);

    let mut edges = build_edges(&smoothed);
    // Stable sort: equal weights keep discovery order.
    edges.sort_by(|l, r| l.weight.total_cmp(&r.weight));

    let mut forest = DisjointForest::new(pixel_count);
    let merged = merge_by_threshold(&mut forest, &edges, config.scale);
    trace!(merged, components = forest.component_count(), "threshold pass done");
    let absorbed = merge_small_regions(&mut forest, &edges, config.min_region_size);
    trace!(absorbed, components = forest.component_count(), "cleanup pass done");

    let labels = resolve_labels(&mut forest, width, height);
    debug!(
        width,
        height,
        edges = edges.len(),
        regions = labels.region_count(),
        scale = config.scale,
        sigma = config.sigma,
        min_region_size = config.min_region_size,
        "segmented image"
    );
    Ok(labels)
}

/// Build every 8-connected edge of `image` in discovery order.
///
/// The scan is row-major; for each pixel the forward neighbours are
/// emitted in [`FORWARD_NEIGHBORS`] order.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss
)]
pub fn build_edges(image: &RgbImage) -> Vec<Edge> {
    let (width, height) = image.dimensions();
    let (w, h) = (i64::from(width), i64::from(height));
    let mut edges = Vec::with_capacity((width as usize * height as usize).saturating_mul(4));

    for y in 0..h {
        for x in 0..w {
            let here = image.get_pixel(x as u32, y as u32);
            let a = (y * w + x) as u32;
            for &(dx, dy) in &FORWARD_NEIGHBORS {
                let (nx, ny) = (x + dx, y + dy);
                if nx < 0 || nx >= w || ny >= h {
                    continue;
                }
                let there = image.get_pixel(nx as u32, ny as u32);
                edges.push(Edge {
                    a,
                    b: (ny * w + nx) as u32,
                    weight: color_distance(here.0, there.0),
                });
            }
        }
    }
    edges
}

/// Euclidean distance between two RGB colours on the 0-255 scale.
fn color_distance(p: [u8; 3], q: [u8; 3]) -> f32 {
    p.iter()
        .zip(q)
        .map(|(&a, b)| {
            let d = f32::from(a) - f32::from(b);
            d * d
        })
        .sum::<f32>()
        .sqrt()
}

/// First pass: merge across an edge when its weight does not exceed
/// `min(Int(Ca) + k/|Ca|, Int(Cb) + k/|Cb|)`. Returns the number of merges.
fn merge_by_threshold(forest: &mut DisjointForest, edges: &[Edge], scale: f64) -> usize {
    let mut merges = 0;
    for edge in edges {
        let ra = forest.find(edge.a);
        let rb = forest.find(edge.b);
        if ra == rb {
            continue;
        }
        let tolerance = |root: u32| {
            f64::from(forest.internal_diff(root)) + scale / f64::from(forest.size(root))
        };
        if f64::from(edge.weight) <= tolerance(ra).min(tolerance(rb)) {
            forest.union(ra, rb, edge.weight);
            merges += 1;
        }
    }
    merges
}

/// Second pass: merge across any edge touching a component smaller than
/// `min_size` pixels, regardless of weight. Returns the number of merges.
fn merge_small_regions(forest: &mut DisjointForest, edges: &[Edge], min_size: usize) -> usize {
    let mut merges = 0;
    for edge in edges {
        let ra = forest.find(edge.a);
        let rb = forest.find(edge.b);
        if ra == rb {
            continue;
        }
        let small = |root: u32| (forest.size(root) as usize) < min_size;
        if small(ra) || small(rb) {
            let diff = edge
                .weight
                .max(forest.internal_diff(ra))
                .max(forest.internal_diff(rb));
            forest.union(ra, rb, diff);
            merges += 1;
        }
    }
    merges
}

/// Resolve every pixel's root and renumber roots densely in row-major
/// order of first appearance.
#[allow(clippy::cast_possible_truncation)]
fn resolve_labels(forest: &mut DisjointForest, width: u32, height: u32) -> LabelMap {
    let len = forest.len();
    let mut label_of_root = vec![u32::MAX; len];
    let mut next = 0u32;
    let mut labels = Vec::with_capacity(len);

    for index in 0..len as u32 {
        let root = forest.find(index) as usize;
        if label_of_root[root] == u32::MAX {
            label_of_root[root] = next;
            next += 1;
        }
        labels.push(label_of_root[root]);
    }

    LabelMap::new_unchecked(width, height, labels, next as usize)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use image::Rgb;

    use super::*;

    /// `width x height` image: columns `< split` black, the rest white.
    fn two_tone(width: u32, height: u32, split: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, _| {
            if x < split {
                Rgb([0, 0, 0])
            } else {
                Rgb([255, 255, 255])
            }
        })
    }

    /// Deterministic textured image with several distinct patches.
    #[allow(clippy::cast_possible_truncation)]
    fn patchwork(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            let patch = (x / 6 + 3 * (y / 5)) % 4;
            let base = [40u8, 110, 170, 230][patch as usize];
            let jitter = ((x * 7 + y * 13) % 9) as u8;
            Rgb([base + jitter, base / 2 + jitter, 255 - base + jitter / 2])
        })
    }

    fn exact_config(scale: f64, min_region_size: usize) -> Config {
        Config {
            scale,
            sigma: 0.0,
            min_region_size,
            ..Config::default()
        }
    }

    #[test]
    fn two_tone_scenario_splits_along_boundary() {
        let img = two_tone(4, 4, 2);
        let labels = segment(&img, &exact_config(1.0, 1)).unwrap();
        assert_eq!(labels.region_count(), 2);
        for y in 0..4 {
            for x in 0..4 {
                let expected = u32::from(x >= 2);
                assert_eq!(labels.get(x, y), Some(expected), "at ({x},{y})");
            }
        }
    }

    #[test]
    fn labels_partition_the_image() {
        let img = patchwork(31, 23);
        let labels = segment(&img, &Config::default()).unwrap();
        assert_eq!(labels.labels().len(), 31 * 23);
        assert!(labels.region_count() >= 1);
        let sizes = labels.region_sizes();
        assert_eq!(sizes.iter().sum::<usize>(), 31 * 23);
        assert!(sizes.iter().all(|&s| s > 0), "every label must be used");
        assert!(
            labels
                .labels()
                .iter()
                .all(|&l| (l as usize) < labels.region_count())
        );
    }

    #[test]
    fn labels_are_numbered_by_first_appearance() {
        let img = patchwork(24, 20);
        let labels = segment(&img, &exact_config(50.0, 0)).unwrap();
        let mut next = 0;
        for &label in labels.labels() {
            assert!(label <= next, "label {label} appeared before {next}");
            if label == next {
                next += 1;
            }
        }
    }

    #[test]
    fn uniform_image_collapses_to_one_region() {
        for (w, h) in [(1, 1), (1, 9), (7, 3), (16, 16)] {
            for scale in [1e-6, 1.0, 100.0] {
                let img = RgbImage::from_pixel(w, h, Rgb([83, 91, 120]));
                let config = Config {
                    scale,
                    ..Config::default()
                };
                let labels = segment(&img, &config).unwrap();
                assert_eq!(labels.region_count(), 1, "{w}x{h} at scale {scale}");
            }
        }
    }

    #[test]
    fn larger_scale_never_adds_regions() {
        let img = two_tone(4, 4, 2);
        let mut previous = usize::MAX;
        for scale in [0.5, 1.0, 10.0, 100.0, 1000.0, 3000.0, 5000.0, 1e5] {
            let count = segment(&img, &exact_config(scale, 0))
                .unwrap()
                .region_count();
            assert!(count <= previous, "scale {scale} gave {count} > {previous}");
            previous = count;
        }
        // The boundary weight is 255 * sqrt(3) ~ 441.7 and each half has
        // 8 pixels, so the halves merge once scale / 8 reaches it.
        assert_eq!(segment(&img, &exact_config(3000.0, 0)).unwrap().region_count(), 2);
        assert_eq!(segment(&img, &exact_config(5000.0, 0)).unwrap().region_count(), 1);
    }

    #[test]
    fn larger_scale_never_adds_regions_on_textured_image() {
        let img = patchwork(30, 30);
        let mut previous = usize::MAX;
        for scale in [1.0, 1e4, 1e7] {
            let count = segment(&img, &exact_config(scale, 0))
                .unwrap()
                .region_count();
            assert!(count <= previous, "scale {scale} gave {count} > {previous}");
            previous = count;
        }
        assert_eq!(previous, 1);
    }

    #[test]
    fn segmentation_is_deterministic() {
        let img = patchwork(40, 32);
        let config = Config::default();
        let first = segment(&img, &config).unwrap();
        let second = segment(&img, &config).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn small_regions_are_absorbed() {
        let img = RgbImage::from_fn(10, 10, |x, y| {
            if (4..6).contains(&x) && (4..6).contains(&y) {
                Rgb([200, 200, 200])
            } else {
                Rgb([100, 100, 100])
            }
        });

        let kept = segment(&img, &exact_config(1.0, 0)).unwrap();
        assert_eq!(kept.region_count(), 2);
        assert_eq!(kept.region_sizes(), vec![96, 4]);

        let absorbed = segment(&img, &exact_config(1.0, 5)).unwrap();
        assert_eq!(absorbed.region_count(), 1);
    }

    #[test]
    fn regions_at_min_size_survive_cleanup() {
        let img = two_tone(4, 4, 2);
        let labels = segment(&img, &exact_config(1.0, 8)).unwrap();
        assert_eq!(labels.region_count(), 2);
        let labels = segment(&img, &exact_config(1.0, 9)).unwrap();
        assert_eq!(labels.region_count(), 1);
    }

    #[test]
    fn edge_count_matches_eight_connectivity() {
        let img = RgbImage::new(3, 2);
        // Horizontal (w-1)h + vertical w(h-1) + two diagonals per 2x2 cell.
        assert_eq!(build_edges(&img).len(), 2 * 2 + 3 + 2 * 2 * 1);
    }

    #[test]
    fn edges_follow_discovery_order() {
        let img = RgbImage::new(3, 2);
        let pairs: Vec<(u32, u32)> = build_edges(&img).iter().map(|e| (e.a, e.b)).collect();
        assert_eq!(
            pairs,
            vec![
                (0, 1),
                (0, 4),
                (0, 3),
                (1, 2),
                (1, 5),
                (1, 4),
                (1, 3),
                (2, 5),
                (2, 4),
                (3, 4),
                (4, 5),
            ]
        );
    }

    #[test]
    fn edge_weight_is_euclidean_color_distance() {
        let img = RgbImage::from_fn(2, 1, |x, _| {
            if x == 0 {
                Rgb([0, 0, 0])
            } else {
                Rgb([3, 4, 12])
            }
        });
        let edges = build_edges(&img);
        assert_eq!(edges.len(), 1);
        assert!((edges[0].weight - 13.0).abs() < 1e-5);
    }

    #[test]
    fn invalid_scale_rejected() {
        let img = two_tone(4, 4, 2);
        for scale in [0.0, -3.0] {
            let result = segment(&img, &exact_config(scale, 1));
            assert!(matches!(result, Err(PipelineError::InvalidConfig(_))));
        }
    }

    #[test]
    fn oversized_sigma_is_a_config_error() {
        let img = two_tone(4, 4, 2);
        let config = Config {
            sigma: 1e13,
            ..exact_config(1.0, 1)
        };
        let result = segment(&img, &config);
        assert!(matches!(result, Err(PipelineError::InvalidConfig(ref s)) if s.contains("sigma")));

        let widest = Config {
            sigma: 2.0,
            ..exact_config(1.0, 1)
        };
        assert!(segment(&img, &widest).is_ok());
    }

    #[test]
    fn empty_image_rejected() {
        let result = segment(&RgbImage::new(5, 0), &Config::default());
        assert!(matches!(result, Err(PipelineError::InvalidImage(_))));
    }
}
