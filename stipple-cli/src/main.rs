//! Weighted LBG stippling CLI: converts a grayscale image into a stipple
//! drawing, printing per-iteration progress and writing a PNG or SVG.

mod export;

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};

use stipple_core::{CpuBackend, DensityImage, PartitionBackend, Stipple, StipplingParams};

#[cfg(feature = "gpu")]
use stipple_core::GpuBackend;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Png,
    Svg,
}

#[derive(Parser, Debug)]
#[command(name = "stipple")]
#[command(about = "Convert a grayscale image into a weighted LBG stipple drawing", long_about = None)]
struct Args {
    /// Input image path
    input: PathBuf,

    /// Output file path
    output: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value = "png")]
    format: OutputFormat,

    /// Number of initial random seed points
    #[arg(long, default_value = "1")]
    initial_points: usize,

    /// Stipple diameter used when adaptive sizing is disabled
    #[arg(long, default_value = "4.0")]
    initial_point_size: f64,

    /// Disable per-cell adaptive point sizing
    #[arg(long)]
    no_adaptive_point_size: bool,

    /// Minimum adaptive stipple diameter
    #[arg(long, default_value = "2.0")]
    point_size_min: f64,

    /// Maximum adaptive stipple diameter
    #[arg(long, default_value = "4.0")]
    point_size_max: f64,

    /// Integer density-image supersampling factor (1, 2 or 3)
    #[arg(long, default_value = "1")]
    super_sampling_factor: u32,

    /// Maximum number of relaxation iterations
    #[arg(long, default_value = "50")]
    max_iterations: usize,

    /// Base hysteresis tolerance band width
    #[arg(long, default_value = "0.6")]
    hysteresis: f64,

    /// Disable the adaptive per-iteration hysteresis schedule
    #[arg(long)]
    no_adaptive_hysteresis: bool,

    /// Per-iteration hysteresis increment; defaults to `hysteresis /
    /// (max_iterations - 1)`, the reference tool's own derivation, when
    /// omitted
    #[arg(long)]
    hysteresis_delta: Option<f64>,

    /// Random seed for reproducible placement and split jitter
    #[arg(long, default_value = "0")]
    seed: u64,

    /// Use the GPU partition backend (if available)
    #[cfg(feature = "gpu")]
    #[arg(long)]
    gpu: bool,

    /// SVG viewport width/height override; defaults to the density image size
    #[arg(long)]
    viewport: Option<u32>,
}

/// Print a diagnostic to stderr and exit with the given code: 0 success, 2
/// invalid parameters, 3 unreadable/unsupported input or output, 4 backend
/// failure.
fn exit_with(code: i32, err: impl Into<anyhow::Error>) -> ! {
    eprintln!("error: {}", err.into());
    std::process::exit(code);
}

/// Run the full relaxation loop against one backend, reporting progress to
/// stdout via `indicatif` and checking a Ctrl-C-driven cancellation flag
/// between iterations.
fn run_pipeline<B: PartitionBackend>(
    backend: &mut B,
    density: &DensityImage,
    params: &StipplingParams,
) -> anyhow::Result<Vec<Stipple>> {
    let progress = ProgressBar::new(params.max_iterations as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] iteration {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );

    let cancelled = Arc::new(AtomicBool::new(false));
    {
        let cancelled = Arc::clone(&cancelled);
        if let Err(err) = ctrlc::set_handler(move || {
            cancelled.store(true, Ordering::SeqCst);
        }) {
            eprintln!("warning: failed to install Ctrl-C handler: {err}");
        }
    }

    let stipples = stipple_core::run(
        backend,
        density,
        params,
        |_stipples| {},
        |status| {
            progress.set_position(status.iteration as u64);
            progress.set_message(format!(
                "size={} splits={} merges={} hysteresis={:.3}",
                status.size, status.splits, status.merges, status.hysteresis
            ));
        },
        || cancelled.load(Ordering::SeqCst),
    )?;

    progress.finish_with_message("done");
    Ok(stipples)
}

fn main() {
    let args = Args::parse();

    let mut params = StipplingParams {
        initial_points: args.initial_points,
        initial_point_size: args.initial_point_size,
        adaptive_point_size: !args.no_adaptive_point_size,
        point_size_min: args.point_size_min,
        point_size_max: args.point_size_max,
        super_sampling_factor: args.super_sampling_factor,
        max_iterations: args.max_iterations,
        hysteresis: args.hysteresis,
        hysteresis_delta: args.hysteresis_delta.unwrap_or(0.0),
        adaptive_hysteresis: !args.no_adaptive_hysteresis,
        seed: args.seed,
    };
    if args.hysteresis_delta.is_none() {
        params = params.with_derived_hysteresis_delta();
    }

    if let Err(err) = params.validate() {
        exit_with(2, err);
    }

    let input = match image::open(&args.input) {
        Ok(img) => img,
        Err(err) => exit_with(3, format!("failed to read {}: {err}", args.input.display())),
    };

    let density = match DensityImage::prepare(&input, params.super_sampling_factor) {
        Ok(d) => d,
        Err(err) => exit_with(3, err),
    };

    println!(
        "loaded {} ({}x{}, supersampled to {}x{})",
        args.input.display(),
        input.width(),
        input.height(),
        density.width(),
        density.height()
    );

    #[cfg(feature = "gpu")]
    let stipples_result = if args.gpu {
        let mut backend = GpuBackend::new().unwrap_or_else(|err| exit_with(4, err));
        run_pipeline(&mut backend, &density, &params)
    } else {
        let mut backend = CpuBackend::new();
        run_pipeline(&mut backend, &density, &params)
    };

    #[cfg(not(feature = "gpu"))]
    let stipples_result = {
        let mut backend = CpuBackend::new();
        run_pipeline(&mut backend, &density, &params)
    };

    let stipples = stipples_result.unwrap_or_else(|err| exit_with(4, err));

    let viewport_w = args.viewport.unwrap_or(density.width());
    let viewport_h = args.viewport.unwrap_or(density.height());

    let result = match args.format {
        OutputFormat::Png => {
            let image = export::render_png(&stipples, density.width(), density.height());
            image.save(&args.output).map_err(anyhow::Error::from)
        }
        OutputFormat::Svg => {
            let svg = export::render_svg(
                &stipples,
                density.width(),
                density.height(),
                viewport_w,
                viewport_h,
            );
            std::fs::write(&args.output, svg).map_err(anyhow::Error::from)
        }
    };

    if let Err(err) = result {
        exit_with(3, format!("failed to write {}: {err}", args.output.display()));
    }

    println!(
        "wrote {} stipples to {}",
        stipples.len(),
        args.output.display()
    );
}
