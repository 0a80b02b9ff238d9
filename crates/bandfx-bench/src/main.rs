//! bandfx-bench: CLI tool for running bandfx kernels on image files.
//!
//! Decodes an image, runs one operation over the whole frame or band by
//! band, and prints timing diagnostics. Useful for:
//!
//! - Comparing `average` and `perceptual` luminance weighting
//! - Watching staged runs progress with a delay between bands
//! - Measuring per-band durations for different band counts
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin bandfx-bench -- [OPTIONS] <IMAGE_PATH>
//! ```
//!
//! Set `RUST_LOG=debug` for per-band log lines from the pipeline.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::io::Write;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use bandfx_pipeline::diagnostics::{self, RunDiagnostics, WebClock};
use bandfx_pipeline::{
    BorderPolicy, FilterConfig, Operation, PipelineError, PixelBuffer, Rotation, Weighting,
};
use clap::{Parser, ValueEnum};
use log::LevelFilter;

/// Run bandfx pixel kernels on an image and print timing diagnostics.
///
/// Runs the chosen operation over the whole frame, or band by band with
/// `--staged`, and prints a per-run report.
#[derive(Parser)]
#[command(name = "bandfx-bench", version)]
struct Cli {
    /// Path to the input image (PNG, JPEG, BMP, WebP).
    image_path: PathBuf,

    /// Operation to run.
    #[arg(long, value_enum, default_value_t = Op::Sobel)]
    operation: Op,

    /// Luminance weighting for grayscale and Sobel.
    #[arg(long, value_enum, default_value_t = Luma::Average)]
    weighting: Luma,

    /// How Sobel samples pixels outside the frame.
    #[arg(long, value_enum, default_value_t = Border::Zero)]
    border: Border,

    /// Number of horizontal bands for `--staged`.
    #[arg(long, default_value_t = FilterConfig::DEFAULT_BAND_COUNT, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    bands: usize,

    /// Number of 90° clockwise turns for `--operation rotate`, as if the
    /// rotate action were applied this many times.
    #[arg(long, default_value_t = 1)]
    turns: u32,

    /// Run band by band instead of over the whole frame.
    #[arg(long)]
    staged: bool,

    /// Pause between bands in staged mode (milliseconds). No pause
    /// follows the last band.
    #[arg(long, default_value_t = 0)]
    delay_ms: u64,

    /// Write the processed image to file (format from extension).
    #[arg(long)]
    output: Option<PathBuf>,

    /// Number of runs for averaging.
    #[arg(long, default_value_t = 1, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    runs: usize,

    /// Output diagnostics as JSON instead of human-readable report.
    #[arg(long)]
    json: bool,

    /// Full filter config as a JSON string.
    ///
    /// When provided, `--operation`, `--weighting`, `--border`,
    /// `--bands` and `--turns` are ignored. Missing fields take
    /// their defaults.
    #[arg(long)]
    config_json: Option<String>,

    /// Enable debug logging (overridden by `RUST_LOG`).
    #[arg(short, long)]
    verbose: bool,
}

/// Operation selection.
#[derive(Clone, Copy, ValueEnum)]
enum Op {
    /// Luminance in all three color channels.
    Grayscale,
    /// Sobel edge magnitude.
    Sobel,
    /// Left-right mirror.
    Mirror,
    /// Quarter-turn rotation (whole frame only).
    Rotate,
}

/// Luminance weighting selection.
#[derive(Clone, Copy, ValueEnum)]
enum Luma {
    /// Equal-weight mean of R, G and B.
    Average,
    /// 0.299 R + 0.587 G + 0.114 B.
    Perceptual,
}

/// Sobel border policy selection.
#[derive(Clone, Copy, ValueEnum)]
enum Border {
    /// Out-of-frame pixels read as 0.
    Zero,
    /// Out-of-frame pixels read as the nearest edge pixel.
    Replicate,
}

/// Errors surfaced by the CLI.
#[derive(Debug, thiserror::Error)]
enum BenchError {
    /// `--config-json` did not parse as a `FilterConfig`.
    #[error("error parsing --config-json: {0}")]
    Config(#[source] serde_json::Error),

    /// The input file could not be read.
    #[error("error reading {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The input file is empty.
    #[error("empty input: {}", .0.display())]
    EmptyInput(PathBuf),

    /// The input bytes are not a supported image.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// The pipeline rejected the input or config.
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// The processed image could not be written.
    #[error("error writing {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// Diagnostics could not be serialized.
    #[error("error serializing diagnostics: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Build a [`FilterConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and the
/// individual filter flags are ignored.
fn config_from_cli(cli: &Cli) -> Result<FilterConfig, BenchError> {
    if let Some(ref json) = cli.config_json {
        return serde_json::from_str(json).map_err(BenchError::Config);
    }

    Ok(FilterConfig {
        operation: match cli.operation {
            Op::Grayscale => Operation::Grayscale,
            Op::Sobel => Operation::Sobel,
            Op::Mirror => Operation::Mirror,
            Op::Rotate => Operation::Rotate,
        },
        weighting: match cli.weighting {
            Luma::Average => Weighting::Average,
            Luma::Perceptual => Weighting::Perceptual,
        },
        border: match cli.border {
            Border::Zero => BorderPolicy::Zero,
            Border::Replicate => BorderPolicy::Replicate,
        },
        band_count: cli.bands,
        rotation: Rotation::from_quarter_turns(cli.turns),
    })
}

/// Read and decode `path` into a [`PixelBuffer`].
fn load_image(path: &Path) -> Result<PixelBuffer, BenchError> {
    let bytes = std::fs::read(path).map_err(|source| BenchError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    if bytes.is_empty() {
        return Err(BenchError::EmptyInput(path.to_path_buf()));
    }
    eprintln!("Image: {} ({} bytes)", path.display(), bytes.len());
    let rgba = image::load_from_memory(&bytes)?.into_rgba8();
    Ok(PixelBuffer::try_from(rgba)?)
}

/// Run `config` once over `image`, whole-frame or staged.
fn run_once(
    image: &PixelBuffer,
    config: &FilterConfig,
    staged: bool,
    delay: Duration,
) -> Result<(PixelBuffer, RunDiagnostics), BenchError> {
    if !staged {
        return Ok(diagnostics::process_with_diagnostics(
            image, config, &WebClock,
        ));
    }
    let Some(transform) = config.band_transform() else {
        log::warn!("{} cannot run in bands; running whole frame", config.operation);
        return Ok(diagnostics::process_with_diagnostics(
            image, config, &WebClock,
        ));
    };

    let (result, diagnostics) = diagnostics::run_staged_with_diagnostics(
        image.clone(),
        config.band_count,
        transform,
        &WebClock,
        |progress| {
            eprintln!(
                "  band {}/{}: rows {}..{}",
                progress.index + 1,
                progress.result.band_count(),
                progress.band.start_row,
                progress.band.end_row,
            );
            if !progress.result.is_complete() && !delay.is_zero() {
                std::thread::sleep(delay);
            }
            ControlFlow::Continue(())
        },
    )?;
    Ok((result.into_output(), diagnostics))
}

/// Write `buffer` to `path`, inferring the format from the extension.
fn save_output(path: &Path, buffer: &PixelBuffer) -> Result<(), BenchError> {
    buffer
        .as_image()
        .save(path)
        .map_err(|source| BenchError::Write {
            path: path.to_path_buf(),
            source,
        })?;
    eprintln!(
        "Output written to {} ({}x{})",
        path.display(),
        buffer.width(),
        buffer.height(),
    );
    Ok(())
}

fn init_logging(verbose: bool) {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    });
    builder.parse_default_env();
    builder.format(|buf, record| writeln!(buf, "[{}] {}", record.level(), record.args()));
    let _ = builder.try_init();
}

fn run(cli: &Cli) -> Result<(), BenchError> {
    let config = config_from_cli(cli)?;
    let image = load_image(&cli.image_path)?;

    eprintln!("Config: {config:#?}");
    if config.operation == Operation::Rotate {
        eprintln!("Rotation: {}", config.rotation);
    }
    eprintln!(
        "Mode: {}",
        if cli.staged { "staged" } else { "whole frame" }
    );
    eprintln!("Runs: {}", cli.runs);
    eprintln!();

    let delay = Duration::from_millis(cli.delay_ms);
    let mut all_diagnostics = Vec::with_capacity(cli.runs);

    for run in 0..cli.runs {
        if cli.runs > 1 {
            eprintln!("--- Run {}/{} ---", run + 1, cli.runs);
        }

        let (output, diagnostics) = run_once(&image, &config, cli.staged, delay)?;
        log::info!("{}", diagnostics.timing().log_line());

        if cli.json {
            let json =
                serde_json::to_string_pretty(&diagnostics).map_err(BenchError::Serialize)?;
            println!("{json}");
        } else {
            println!("{}", diagnostics.report());
        }

        // Write output on the first run only.
        if run == 0
            && let Some(ref path) = cli.output
        {
            save_output(path, &output)?;
        }

        all_diagnostics.push(diagnostics);

        if cli.runs > 1 {
            eprintln!();
        }
    }

    if cli.runs > 1 {
        print_multi_run_summary(&all_diagnostics);
    }

    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

/// Print aggregated statistics across multiple runs.
#[allow(clippy::cast_precision_loss)]
fn print_multi_run_summary(all_diagnostics: &[RunDiagnostics]) {
    debug_assert!(!all_diagnostics.is_empty(), "no diagnostics to summarize");

    println!();
    println!(
        "Summary ({} runs)\n{}",
        all_diagnostics.len(),
        "=".repeat(60),
    );

    if all_diagnostics.is_empty() {
        println!("Warning: no diagnostics to summarize");
        return;
    }

    let stats = |extract: fn(&RunDiagnostics) -> Duration| {
        let ms: Vec<f64> = all_diagnostics
            .iter()
            .map(|d| extract(d).as_secs_f64() * 1000.0)
            .collect();
        let min = ms.iter().copied().reduce(f64::min).unwrap_or(0.0);
        let max = ms.iter().copied().reduce(f64::max).unwrap_or(0.0);
        let mean = ms.iter().sum::<f64>() / ms.len() as f64;
        (min, mean, max)
    };

    let (min, mean, max) = stats(|d| d.total_duration);
    println!("Total duration:   min={min:.3}ms  mean={mean:.3}ms  max={max:.3}ms");
    let (min, mean, max) = stats(RunDiagnostics::compute_duration);
    println!("Compute duration: min={min:.3}ms  mean={mean:.3}ms  max={max:.3}ms");

    // Per-band means; every run uses the same partition.
    let band_count = all_diagnostics[0].bands.len();
    if band_count == 0 {
        return;
    }
    println!();
    println!("{:<8} {:>12}", "Band", "Mean (ms)");
    println!("{}", "-".repeat(24));
    for index in 0..band_count {
        let durations: Vec<f64> = all_diagnostics
            .iter()
            .filter_map(|d| d.bands.get(index))
            .map(|b| b.duration.as_secs_f64() * 1000.0)
            .collect();
        let band_mean = durations.iter().sum::<f64>() / durations.len() as f64;
        println!("{index:<8} {band_mean:>10.3}ms");
    }
}
