//! bandfx-pipeline: Pure RGBA pixel kernels and a staged band executor
//! (sans-IO).
//!
//! Kernels:
//! grayscale, Sobel edge magnitude, horizontal mirror, quarter-turn
//! rotation.
//!
//! Grayscale, Sobel and mirror can also run band by band through
//! [`StagedRun`] / [`run_staged`], which yields control to the caller
//! after each horizontal band so it can render partial results.
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! [`PixelBuffer`]s. Decoding, encoding and pacing between bands live
//! in `bandfx-bench`.

pub mod band;
pub mod diagnostics;
pub mod grayscale;
pub mod mirror;
pub mod rotate;
pub mod sobel;
pub mod staged;
pub mod types;

pub use band::{Band, partition};
pub use grayscale::to_grayscale;
pub use mirror::mirror_horizontal;
pub use rotate::{Rotation, rotate};
pub use sobel::{detect_edges, sobel_magnitude};
pub use staged::{BandProgress, BandTransform, StageResult, StagedRun, run_staged};
pub use types::{
    BorderPolicy, Dimensions, FilterConfig, Operation, PipelineError, PixelBuffer, RgbaImage,
    Weighting,
};

/// Run `config`'s operation over the whole frame.
///
/// Equivalent to a staged run with a single band, except that
/// [`Operation::Rotate`] is also supported (rotation cannot run in
/// bands). The input is never mutated.
#[must_use = "returns the processed image"]
pub fn process(buffer: &PixelBuffer, config: &FilterConfig) -> PixelBuffer {
    log::debug!(
        "process: {} on {}x{}",
        config.operation,
        buffer.width(),
        buffer.height(),
    );
    config.band_transform().map_or_else(
        || rotate(buffer, config.rotation),
        |transform| transform.apply(buffer),
    )
}
