//! Horizontal mirror.

use crate::types::{CHANNELS, PixelBuffer};

/// Flip `buffer` left to right.
///
/// Column `x` swaps with column `width - 1 - x`; all four channels move
/// together. The middle column of an odd-width image stays put.
/// Applying the mirror twice yields the input.
#[must_use = "returns the mirrored image"]
pub fn mirror_horizontal(buffer: &PixelBuffer) -> PixelBuffer {
    let mut out = buffer.clone();
    mirror_rows(&mut out, 0, buffer.height());
    out
}

/// Mirror rows `[start, end)` of `buffer` in place.
///
/// Each row is independent, so any row range can be processed on its
/// own.
pub(crate) fn mirror_rows(buffer: &mut PixelBuffer, start: u32, end: u32) {
    let stride = buffer.stride();
    let span = buffer.row_span(start, end);
    for row in buffer.raw_mut()[span].chunks_exact_mut(stride) {
        mirror_row(row);
    }
}

/// Swap pixel pairs across the middle of one row.
fn mirror_row(row: &mut [u8]) {
    let width = row.len() / CHANNELS;
    for x in 0..width / 2 {
        let left = x * CHANNELS;
        let right = (width - 1 - x) * CHANNELS;
        // `left < right`, so splitting at `right` keeps both pixels whole.
        let (head, tail) = row.split_at_mut(right);
        head[left..left + CHANNELS].swap_with_slice(&mut tail[..CHANNELS]);
    }
}
