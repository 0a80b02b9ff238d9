//! Diagnostics: timing instrumentation around the pure kernels.
//!
//! Kernels never read a clock. Timing is layered on from the outside:
//! [`timed`] wraps any operation and reports `(name, duration)` to a
//! hook, and [`process_with_diagnostics`] / [`run_staged_with_diagnostics`]
//! collect a [`RunDiagnostics`] for a whole run.
//!
//! Time comes from a [`Clock`] so tests can substitute a deterministic
//! one. [`WebClock`] is backed by the `web-time` crate, which uses
//! `performance.now()` on WASM and `std::time::Instant` on native.
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::ops::ControlFlow;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::staged::{BandProgress, BandTransform, StageResult, StagedRun};
use crate::types::{Dimensions, FilterConfig, PipelineError, PixelBuffer};

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Source of timestamps.
pub trait Clock {
    /// Opaque timestamp type.
    type Instant;

    /// Current time.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// [`Clock`] backed by [`web_time::Instant`].
#[derive(Debug, Clone, Copy, Default)]
pub struct WebClock;

impl Clock for WebClock {
    type Instant = web_time::Instant;

    fn now(&self) -> Self::Instant {
        web_time::Instant::now()
    }

    fn elapsed(&self, since: &Self::Instant) -> Duration {
        since.elapsed()
    }
}

/// Run `op`, then report its name and wall-clock duration to `hook`.
pub fn timed<C, H, T>(clock: &C, name: &str, hook: &mut H, op: impl FnOnce() -> T) -> T
where
    C: Clock,
    H: FnMut(&str, Duration),
{
    let start = clock.now();
    let value = op();
    hook(name, clock.elapsed(&start));
    value
}

/// Duration of one timed operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationTiming {
    /// Operation name (e.g. `"Sobel Operator"`).
    pub name: String,
    /// Wall-clock duration (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
}

impl OperationTiming {
    /// One log line in the form `"Sobel Operator: 12.34 ms"`.
    #[must_use]
    pub fn log_line(&self) -> String {
        format!("{}: {:.2} ms", self.name, duration_ms(self.duration))
    }
}

/// Timing of one band in a staged run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BandTiming {
    /// Band index.
    pub index: usize,
    /// First row (inclusive).
    pub start_row: u32,
    /// One past the last row.
    pub end_row: u32,
    /// Time spent transforming the band, excluding the callback.
    #[serde(with = "duration_serde")]
    pub duration: Duration,
}

/// Diagnostics collected from a single run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunDiagnostics {
    /// Operation name.
    pub operation: String,
    /// Frame dimensions before the operation.
    pub dimensions: Dimensions,
    /// Per-band timings; empty for whole-frame runs.
    pub bands: Vec<BandTiming>,
    /// Whether every band ran (always `true` for whole-frame runs).
    pub completed: bool,
    /// Total wall-clock duration including any time spent in the
    /// per-band callback (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
}

impl RunDiagnostics {
    /// Time spent inside the transform itself, summed over bands. Equal
    /// to [`total_duration`](Self::total_duration) for whole-frame runs.
    #[must_use]
    pub fn compute_duration(&self) -> Duration {
        if self.bands.is_empty() {
            self.total_duration
        } else {
            self.bands.iter().map(|b| b.duration).sum()
        }
    }

    /// The run as a single [`OperationTiming`].
    #[must_use]
    pub fn timing(&self) -> OperationTiming {
        OperationTiming {
            name: self.operation.clone(),
            duration: self.total_duration,
        }
    }

    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Run Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Image: {}x{} ({} pixels)",
            self.dimensions.width,
            self.dimensions.height,
            self.dimensions.pixel_count(),
        ));
        lines.push(self.timing().log_line());

        if !self.bands.is_empty() {
            lines.push(format!(
                "Compute: {:.3}ms  |  Bands: {}{}",
                duration_ms(self.compute_duration()),
                self.bands.len(),
                if self.completed { "" } else { " (cancelled)" },
            ));
            lines.push(String::new());
            lines.push(format!("{:<8} {:>12} {:>10}", "Band", "Rows", "Duration"));
            lines.push("-".repeat(32));
            for band in &self.bands {
                let rows = format!("{}..{}", band.start_row, band.end_row);
                lines.push(format!(
                    "{:<8} {rows:>12} {:>8.3}ms",
                    band.index,
                    duration_ms(band.duration),
                ));
            }
        }

        lines.join("\n")
    }
}

/// Run `config`'s operation over the whole frame, timing it.
#[must_use]
pub fn process_with_diagnostics<C: Clock>(
    buffer: &PixelBuffer,
    config: &FilterConfig,
    clock: &C,
) -> (PixelBuffer, RunDiagnostics) {
    let mut total = Duration::ZERO;
    let output = timed(
        clock,
        config.operation.name(),
        &mut |_: &str, d: Duration| total = d,
        || crate::process(buffer, config),
    );
    let diagnostics = RunDiagnostics {
        operation: config.operation.name().to_owned(),
        dimensions: buffer.dimensions(),
        bands: Vec::new(),
        completed: true,
        total_duration: total,
    };
    (output, diagnostics)
}

/// [`run_staged`](crate::run_staged) with per-band timings.
///
/// Band durations cover only the transform; time spent in
/// `on_band_complete` (rendering, sleeping) shows up in the total.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidBandCount`] before any band runs if
/// `band_count` is zero or exceeds the buffer height.
pub fn run_staged_with_diagnostics<C, F>(
    buffer: PixelBuffer,
    band_count: usize,
    transform: BandTransform,
    clock: &C,
    mut on_band_complete: F,
) -> Result<(StageResult, RunDiagnostics), PipelineError>
where
    C: Clock,
    F: FnMut(BandProgress<'_>) -> ControlFlow<()>,
{
    let start = clock.now();
    let dimensions = buffer.dimensions();
    let mut run = StagedRun::new(buffer, band_count, transform)?;
    let mut bands = Vec::with_capacity(band_count);

    loop {
        let band_start = clock.now();
        let Some(progress) = run.advance() else {
            break;
        };
        bands.push(BandTiming {
            index: progress.index,
            start_row: progress.band.start_row,
            end_row: progress.band.end_row,
            duration: clock.elapsed(&band_start),
        });
        if on_band_complete(progress).is_break() {
            break;
        }
    }

    let result = run.into_result();
    let diagnostics = RunDiagnostics {
        operation: transform.name().to_owned(),
        dimensions,
        bands,
        completed: result.is_complete(),
        total_duration: clock.elapsed(&start),
    };
    Ok((result, diagnostics))
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}
