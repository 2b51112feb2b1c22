//! grainseg: render grain boundary overlays for a micrograph.
//!
//! Runs one or all of the four pipeline variants on an input image and
//! writes each result as a PNG next to the others:
//!
//! ```text
//! grainseg [OPTIONS] <INPUT>
//! ```
//!
//! Output files are named `<input stem>_<variant>.png`. Segmented
//! variants also print per-stage diagnostics (text, or JSON with
//! `--json`).

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use grainseg_pipeline::diagnostics::PipelineDiagnostics;
use grainseg_pipeline::{Config, RgbImage, Variant, codec};
use tracing::{Level, debug, info};
use tracing_subscriber::FmtSubscriber;

/// Grain boundary visualization for micrographs.
///
/// Smooths the input with morphology, segments it into grains, paints
/// each grain with its mean colour, and overlays the grain boundaries.
#[derive(Parser)]
#[command(name = "grainseg", version)]
struct Cli {
    /// Path to the input image (PNG, JPEG, BMP, WebP).
    input: PathBuf,

    /// Directory the output PNGs are written to.
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Which variant to produce.
    #[arg(long, value_enum, default_value_t = VariantArg::All)]
    variant: VariantArg,

    /// Erosion passes before dilation.
    #[arg(long, default_value_t = Config::DEFAULT_EROSION_ITERATIONS, value_parser = clap::builder::RangedU64ValueParser::<u32>::new().range(1..=10))]
    erosion_iterations: u32,

    /// Dilation passes after erosion.
    #[arg(long, default_value_t = Config::DEFAULT_DILATION_ITERATIONS, value_parser = clap::builder::RangedU64ValueParser::<u32>::new().range(1..=10))]
    dilation_iterations: u32,

    /// Segmentation scale; larger values give larger grains.
    #[arg(long, default_value_t = Config::DEFAULT_SCALE)]
    scale: f64,

    /// Gaussian sigma of the smoothing pass inside segmentation.
    #[arg(long, default_value_t = Config::DEFAULT_SIGMA)]
    sigma: f64,

    /// Grains smaller than this many pixels are merged into a neighbour.
    #[arg(long, default_value_t = Config::DEFAULT_MIN_REGION_SIZE)]
    min_region_size: usize,

    /// Canny low threshold.
    #[arg(long, default_value_t = Config::DEFAULT_CANNY_LOW)]
    canny_low: f32,

    /// Canny high threshold.
    #[arg(long, default_value_t = Config::DEFAULT_CANNY_HIGH)]
    canny_high: f32,

    /// Weight of the colorized image in the overlay (0.0-1.0).
    #[arg(long, default_value_t = Config::DEFAULT_BLEND_ALPHA)]
    blend_alpha: f64,

    /// Full pipeline config as a JSON string.
    ///
    /// When provided, all other pipeline parameter flags are ignored.
    /// Missing fields take their default values.
    #[arg(long)]
    config_json: Option<String>,

    /// Output diagnostics as JSON instead of a human-readable report.
    #[arg(long)]
    json: bool,

    /// Enable debug logging.
    #[arg(short, long)]
    verbose: bool,
}

/// Variant selection.
#[derive(Clone, Copy, ValueEnum)]
enum VariantArg {
    /// All four variants.
    All,
    /// Fixed blur, then erosion and dilation.
    MorphologyBlurred,
    /// Erosion and dilation only.
    MorphologyUnblurred,
    /// Blurred preprocessing followed by segmentation and overlay.
    SegmentedBlurred,
    /// Unblurred preprocessing followed by segmentation and overlay.
    SegmentedUnblurred,
}

impl VariantArg {
    fn variants(self) -> Vec<Variant> {
        match self {
            Self::All => Variant::ALL.to_vec(),
            Self::MorphologyBlurred => vec![Variant::MorphologyBlurred],
            Self::MorphologyUnblurred => vec![Variant::MorphologyUnblurred],
            Self::SegmentedBlurred => vec![Variant::SegmentedBlurred],
            Self::SegmentedUnblurred => vec![Variant::SegmentedUnblurred],
        }
    }
}

/// Build a [`Config`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and all
/// individual parameter flags are ignored.
fn config_from_cli(cli: &Cli) -> Result<Config> {
    let config = if let Some(ref json) = cli.config_json {
        serde_json::from_str(json).context("parsing --config-json")?
    } else {
        Config {
            erosion_iterations: cli.erosion_iterations,
            dilation_iterations: cli.dilation_iterations,
            scale: cli.scale,
            sigma: cli.sigma,
            min_region_size: cli.min_region_size,
            canny_low: cli.canny_low,
            canny_high: cli.canny_high,
            blend_alpha: cli.blend_alpha,
        }
    };
    config.validate()?;
    Ok(config)
}

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")
}

/// `<dir>/<input stem>_<variant stem>.png`.
fn output_path(dir: &Path, input: &Path, variant: Variant) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    dir.join(format!("{stem}_{}.png", variant.file_stem()))
}

/// Run `variant`, returning its output and, for segmented variants, the
/// staged diagnostics.
fn render(
    image: &RgbImage,
    config: &Config,
    variant: Variant,
) -> Result<(RgbImage, Option<PipelineDiagnostics>)> {
    if variant.segments() {
        let staged = grainseg_pipeline::process_staged(image, config, variant.use_blur())
            .with_context(|| format!("running {variant}"))?;
        Ok((staged.output, Some(staged.diagnostics)))
    } else {
        let output = grainseg_pipeline::run_variant(image, config, variant)
            .with_context(|| format!("running {variant}"))?;
        Ok((output, None))
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = config_from_cli(cli)?;
    debug!(?config, "resolved configuration");

    let bytes = fs::read(&cli.input)
        .with_context(|| format!("reading {}", cli.input.display()))?;
    let image = codec::decode(&bytes)
        .with_context(|| format!("decoding {}", cli.input.display()))?;
    info!(
        path = %cli.input.display(),
        bytes = bytes.len(),
        width = image.width(),
        height = image.height(),
        "loaded image"
    );

    fs::create_dir_all(&cli.output_dir)
        .with_context(|| format!("creating {}", cli.output_dir.display()))?;

    let mut reports = Vec::new();
    for variant in cli.variant.variants() {
        let (output, diagnostics) = render(&image, &config, variant)?;
        let path = output_path(&cli.output_dir, &cli.input, variant);
        let png = codec::encode_png(&output)?;
        fs::write(&path, &png).with_context(|| format!("writing {}", path.display()))?;
        info!(%variant, path = %path.display(), bytes = png.len(), "wrote output");

        if let Some(diagnostics) = diagnostics {
            reports.push((variant, diagnostics));
        }
    }

    if cli.json {
        let entries: Vec<serde_json::Value> = reports
            .iter()
            .map(|(variant, diagnostics)| {
                serde_json::json!({ "variant": variant, "diagnostics": diagnostics })
            })
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&entries).context("serializing diagnostics")?
        );
    } else {
        for (variant, diagnostics) in &reports {
            println!("[{variant}]\n{}\n", diagnostics.report());
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = setup_logging(cli.verbose) {
        eprintln!("{e:#}");
        return ExitCode::FAILURE;
    }

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
