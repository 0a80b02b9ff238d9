//! Grayscale conversion.
//!
//! Collapses each RGBA pixel to a single luminance value, repeated
//! across R, G and B with alpha forced opaque. The result is still a
//! [`PixelBuffer`] so it can be displayed directly or fed to
//! [`crate::sobel::sobel_magnitude`], which reads the R channel.

use crate::types::{CHANNELS, PixelBuffer, Weighting};

/// Convert `buffer` to grayscale using `weighting`.
///
/// Every output pixel is `[l, l, l, 255]` where `l` is
/// [`Weighting::luminance`] of the input RGB. Input alpha is ignored.
#[must_use = "returns the grayscale image"]
pub fn to_grayscale(buffer: &PixelBuffer, weighting: Weighting) -> PixelBuffer {
    let mut out = buffer.clone();
    grayscale_rows(&mut out, 0, buffer.height(), weighting);
    out
}

/// Convert rows `[start, end)` of `buffer` to grayscale in place.
///
/// Each pixel only depends on itself, so no scratch copy is needed.
pub(crate) fn grayscale_rows(buffer: &mut PixelBuffer, start: u32, end: u32, weighting: Weighting) {
    let span = buffer.row_span(start, end);
    for px in buffer.raw_mut()[span].chunks_exact_mut(CHANNELS) {
        let l = weighting.luminance(px[0], px[1], px[2]);
        px.copy_from_slice(&[l, l, l, u8::MAX]);
    }
}
