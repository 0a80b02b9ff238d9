//! Staged execution: apply a full-frame transform one horizontal band
//! at a time, handing control back to the caller between bands.
//!
//! [`StagedRun`] is driven with [`advance`](StagedRun::advance):
//!
//! ```rust
//! # use bandfx_pipeline::{BandTransform, PixelBuffer, PipelineError, StagedRun};
//! # fn run(image: PixelBuffer) -> Result<(), PipelineError> {
//! let mut run = StagedRun::new(image, 4, BandTransform::Mirror)?;
//! while let Some(progress) = run.advance() {
//!     // Render `progress.result.output()` or sleep here.
//!     println!("band {} done", progress.index);
//! }
//! let output = run.into_result().into_output();
//! # Ok(())
//! # }
//! ```
//!
//! The gap between two `advance` calls is the only suspension point.
//! Dropping the run (or calling [`into_result`](StagedRun::into_result))
//! before it completes cancels the remaining bands; bands already
//! written stay valid. There is no rollback and no restart.
//!
//! Sobel bands read their neighbors from a grayscale copy of the whole
//! frame, so the assembled output is identical to the whole-frame
//! transform with no seams at band boundaries.

use std::ops::ControlFlow;

use crate::band::{self, Band};
use crate::grayscale::{grayscale_rows, to_grayscale};
use crate::mirror::{mirror_horizontal, mirror_rows};
use crate::sobel::{detect_edges, sobel_rows};
use crate::types::{BorderPolicy, PipelineError, PixelBuffer, Weighting};

/// A transform that can run band by band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BandTransform {
    /// Grayscale conversion.
    Grayscale(Weighting),
    /// Grayscale conversion followed by Sobel gradient magnitude.
    Sobel {
        /// Grayscale weighting applied before the gradient.
        weighting: Weighting,
        /// How neighbors outside the frame are read.
        border: BorderPolicy,
    },
    /// Horizontal mirror. Rows are independent.
    Mirror,
}

impl BandTransform {
    /// Human-readable name (e.g. `"Sobel Operator"`).
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Grayscale(_) => "Grayscale",
            Self::Sobel { .. } => "Sobel Operator",
            Self::Mirror => "Mirror Image",
        }
    }

    /// Apply the transform to the whole frame in one step.
    #[must_use = "returns the transformed image"]
    pub fn apply(self, buffer: &PixelBuffer) -> PixelBuffer {
        match self {
            Self::Grayscale(weighting) => to_grayscale(buffer, weighting),
            Self::Sobel { weighting, border } => detect_edges(buffer, weighting, border),
            Self::Mirror => mirror_horizontal(buffer),
        }
    }
}

/// State of a staged run as seen between bands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageResult {
    output: PixelBuffer,
    next_band: usize,
    band_count: usize,
    complete: bool,
}

impl StageResult {
    /// The output so far: finished bands hold transformed pixels, the
    /// rows of pending bands still hold the source pixels.
    #[must_use]
    pub const fn output(&self) -> &PixelBuffer {
        &self.output
    }

    /// Index of the next band to process (equals
    /// [`band_count`](Self::band_count) once complete).
    #[must_use]
    pub const fn next_band(&self) -> usize {
        self.next_band
    }

    /// Total number of bands in the run.
    #[must_use]
    pub const fn band_count(&self) -> usize {
        self.band_count
    }

    /// Whether every band has been processed.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.complete
    }

    /// Consume the result and return the output buffer.
    #[must_use]
    pub fn into_output(self) -> PixelBuffer {
        self.output
    }
}

/// Report handed to the caller after each band.
#[derive(Debug, Clone, Copy)]
pub struct BandProgress<'a> {
    /// Zero-based index of the band just finished.
    pub index: usize,
    /// Rows of the band just finished.
    pub band: Band,
    /// Run state including the band just finished.
    pub result: &'a StageResult,
}

/// Per-transform working data prepared before the first band.
#[derive(Debug)]
enum Plan {
    Grayscale(Weighting),
    Sobel {
        /// Grayscale of the full source frame.
        gray: PixelBuffer,
        border: BorderPolicy,
    },
    Mirror,
}

/// A transform in progress over a frame split into bands.
///
/// Owns its buffers for the whole run. See the [module docs](self).
#[must_use = "a staged run does nothing until advanced"]
#[derive(Debug)]
pub struct StagedRun {
    transform: BandTransform,
    plan: Plan,
    bands: Vec<Band>,
    state: StageResult,
}

impl StagedRun {
    /// Validate the band count and prepare the run. No band is processed
    /// yet.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidBandCount`] if `band_count` is
    /// zero or exceeds the buffer height.
    pub fn new(
        buffer: PixelBuffer,
        band_count: usize,
        transform: BandTransform,
    ) -> Result<Self, PipelineError> {
        let bands = band::partition(buffer.height(), band_count)?;
        let plan = match transform {
            BandTransform::Grayscale(weighting) => Plan::Grayscale(weighting),
            BandTransform::Sobel { weighting, border } => Plan::Sobel {
                gray: to_grayscale(&buffer, weighting),
                border,
            },
            BandTransform::Mirror => Plan::Mirror,
        };
        log::debug!(
            "staged {} over {}x{} in {} bands",
            transform.name(),
            buffer.width(),
            buffer.height(),
            bands.len(),
        );
        Ok(Self {
            transform,
            plan,
            state: StageResult {
                output: buffer,
                next_band: 0,
                band_count: bands.len(),
                complete: false,
            },
            bands,
        })
    }

    /// The transform being applied.
    #[must_use]
    pub const fn transform(&self) -> BandTransform {
        self.transform
    }

    /// The band partition, in processing order.
    #[must_use]
    pub fn bands(&self) -> &[Band] {
        &self.bands
    }

    /// Current state.
    #[must_use]
    pub const fn result(&self) -> &StageResult {
        &self.state
    }

    /// Whether every band has been processed.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.state.complete
    }

    /// Process the next band and report it.
    ///
    /// Returns `None` once every band has been processed.
    pub fn advance(&mut self) -> Option<BandProgress<'_>> {
        let index = self.state.next_band;
        let band = *self.bands.get(index)?;
        let output = &mut self.state.output;
        match &self.plan {
            Plan::Grayscale(weighting) => {
                grayscale_rows(output, band.start_row, band.end_row, *weighting);
            }
            Plan::Sobel { gray, border } => {
                sobel_rows(gray, output, band.start_row, band.end_row, *border);
            }
            Plan::Mirror => mirror_rows(output, band.start_row, band.end_row),
        }
        self.state.next_band = index + 1;
        self.state.complete = self.state.next_band == self.bands.len();
        log::debug!(
            "{} band {}/{} rows {}..{} done",
            self.transform.name(),
            index + 1,
            self.bands.len(),
            band.start_row,
            band.end_row,
        );
        Some(BandProgress {
            index,
            band,
            result: &self.state,
        })
    }

    /// Process every remaining band and return the final result.
    pub fn complete(mut self) -> StageResult {
        while self.advance().is_some() {}
        self.state
    }

    /// Stop here and return the state as it stands. Remaining bands are
    /// never processed.
    pub fn into_result(self) -> StageResult {
        self.state
    }
}

/// Run `transform` over `buffer` in `band_count` bands, calling
/// `on_band_complete` after each one.
///
/// The callback fires exactly once per band, in band order. Returning
/// [`ControlFlow::Break`] cancels the remaining bands; the partial result
/// is returned with [`StageResult::is_complete`] `false`.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidBandCount`] before any band runs (and
/// without calling the callback) if `band_count` is zero or exceeds the
/// buffer height.
pub fn run_staged<F>(
    buffer: PixelBuffer,
    band_count: usize,
    transform: BandTransform,
    mut on_band_complete: F,
) -> Result<StageResult, PipelineError>
where
    F: FnMut(BandProgress<'_>) -> ControlFlow<()>,
{
    let mut run = StagedRun::new(buffer, band_count, transform)?;
    while let Some(progress) = run.advance() {
        if on_band_complete(progress).is_break() {
            log::debug!(
                "{} cancelled after band {}",
                transform.name(),
                run.result().next_band(),
            );
            break;
        }
    }
    Ok(run.into_result())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn gradient(width: u32, height: u32) -> PixelBuffer {
        PixelBuffer::from_fn(width, height, |x, y| {
            let r = u8::try_from((x * 29 + y * 7) % 256).unwrap();
            let g = u8::try_from((x * 3 + y * 41) % 256).unwrap();
            let b = u8::try_from((x * y) % 256).unwrap();
            [r, g, b, 200]
        })
        .unwrap()
    }

    const TRANSFORMS: [BandTransform; 5] = [
        BandTransform::Grayscale(Weighting::Average),
        BandTransform::Grayscale(Weighting::Perceptual),
        BandTransform::Sobel {
            weighting: Weighting::Average,
            border: BorderPolicy::Zero,
        },
        BandTransform::Sobel {
            weighting: Weighting::Perceptual,
            border: BorderPolicy::Replicate,
        },
        BandTransform::Mirror,
    ];

    #[test]
    fn staged_matches_whole_frame() {
        let img = gradient(9, 11);
        for transform in TRANSFORMS {
            let expected = transform.apply(&img);
            for bands in [1, 2, 3, 4, 11] {
                let result = StagedRun::new(img.clone(), bands, transform)
                    .unwrap()
                    .complete();
                assert!(result.is_complete());
                assert_eq!(
                    result.output(),
                    &expected,
                    "{} in {bands} bands",
                    transform.name()
                );
            }
        }
    }

    #[test]
    fn callback_fires_once_per_band_in_order() {
        let mut seen = Vec::new();
        let result = run_staged(gradient(5, 10), 4, BandTransform::Mirror, |p| {
            seen.push((p.index, p.band.rows(), p.result.next_band()));
            ControlFlow::Continue(())
        })
        .unwrap();
        assert_eq!(
            seen,
            vec![(0, 0..2, 1), (1, 2..4, 2), (2, 4..6, 3), (3, 6..10, 4)]
        );
        assert!(result.is_complete());
        assert_eq!(result.next_band(), 4);
    }

    #[test]
    fn only_last_callback_sees_completion() {
        let mut flags = Vec::new();
        run_staged(gradient(4, 4), 4, BandTransform::Mirror, |p| {
            flags.push(p.result.is_complete());
            ControlFlow::Continue(())
        })
        .unwrap();
        assert_eq!(flags, vec![false, false, false, true]);
    }

    #[test]
    fn callback_sees_finished_bands_and_untouched_rest() {
        let img = gradient(6, 8);
        let transform = BandTransform::Sobel {
            weighting: Weighting::Average,
            border: BorderPolicy::Zero,
        };
        let full = transform.apply(&img);
        run_staged(img.clone(), 4, transform, |p| {
            let out = p.result.output();
            for y in 0..8 {
                let expected = if y < p.band.end_row { &full } else { &img };
                for x in 0..6 {
                    assert_eq!(out.pixel(x, y), expected.pixel(x, y), "band {} row {y}", p.index);
                }
            }
            ControlFlow::Continue(())
        })
        .unwrap();
    }

    #[test]
    fn invalid_band_count_never_calls_back() {
        let mut calls = 0;
        let err = run_staged(gradient(4, 3), 0, BandTransform::Mirror, |_| {
            calls += 1;
            ControlFlow::Continue(())
        })
        .unwrap_err();
        assert_eq!(err, PipelineError::InvalidBandCount {
            band_count: 0,
            height: 3
        });

        let err = run_staged(gradient(4, 3), 4, BandTransform::Mirror, |_| {
            calls += 1;
            ControlFlow::Continue(())
        })
        .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidBandCount { .. }));
        assert_eq!(calls, 0);
    }

    #[test]
    fn break_cancels_remaining_bands() {
        let img = gradient(7, 12);
        let transform = BandTransform::Grayscale(Weighting::Perceptual);
        let full = transform.apply(&img);
        let mut calls = 0;
        let result = run_staged(img.clone(), 4, transform, |p| {
            calls += 1;
            if p.index == 1 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        })
        .unwrap();

        assert_eq!(calls, 2);
        assert!(!result.is_complete());
        assert_eq!(result.next_band(), 2);
        // Bands 0 and 1 cover rows 0..6 and are final.
        for y in 0..12 {
            let expected = if y < 6 { &full } else { &img };
            for x in 0..7 {
                assert_eq!(result.output().pixel(x, y), expected.pixel(x, y), "row {y}");
            }
        }
    }

    #[test]
    fn dropping_run_midway_keeps_finished_rows() {
        let img = gradient(4, 8);
        let mut run = StagedRun::new(img.clone(), 2, BandTransform::Mirror).unwrap();
        assert!(run.advance().is_some());
        let partial = run.into_result();
        let mirrored = mirror_horizontal(&img);
        assert_eq!(partial.output().pixel(0, 0), mirrored.pixel(0, 0));
        assert_eq!(partial.output().pixel(0, 7), img.pixel(0, 7));
    }

    #[test]
    fn advance_after_completion_returns_none() {
        let mut run = StagedRun::new(gradient(3, 3), 3, BandTransform::Mirror).unwrap();
        let mut count = 0;
        while run.advance().is_some() {
            count += 1;
        }
        assert_eq!(count, 3);
        assert!(run.is_complete());
        assert!(run.advance().is_none());
        assert_eq!(run.result().next_band(), 3);
    }

    #[test]
    fn new_run_has_processed_nothing() {
        let img = gradient(3, 4);
        let run = StagedRun::new(img.clone(), 2, BandTransform::Grayscale(Weighting::Average))
            .unwrap();
        assert_eq!(run.result().next_band(), 0);
        assert!(!run.is_complete());
        assert_eq!(run.result().output(), &img);
        assert_eq!(run.bands().len(), 2);
        assert_eq!(run.transform(), BandTransform::Grayscale(Weighting::Average));
    }

    #[test]
    fn mirror_staged_twice_is_identity() {
        let img = gradient(5, 6);
        let once = StagedRun::new(img.clone(), 3, BandTransform::Mirror)
            .unwrap()
            .complete()
            .into_output();
        let twice = StagedRun::new(once, 2, BandTransform::Mirror)
            .unwrap()
            .complete()
            .into_output();
        assert_eq!(twice, img);
    }
}
