//! Sobel gradient magnitude.
//!
//! Convolves a grayscale [`PixelBuffer`] with the horizontal and vertical
//! 3×3 Sobel kernels and writes `floor(sqrt(gx² + gy²))`, clamped to
//! `[0, 255]`, into R, G and B with alpha 255.
//!
//! The gradient step is independent of grayscale conversion: feed it any
//! buffer whose R channel holds luminance (see [`crate::grayscale`]).

use crate::grayscale::to_grayscale;
use crate::types::{BorderPolicy, CHANNELS, PixelBuffer, Weighting};

/// A 3×3 convolution kernel, indexed `[dy + 1][dx + 1]`.
pub type Kernel = [[i32; 3]; 3];

/// Horizontal-gradient Sobel kernel (responds to vertical edges).
pub const SOBEL_HORIZONTAL: Kernel = [[-1, 0, 1], [-2, 0, 2], [-1, 0, 1]];

/// Vertical-gradient Sobel kernel (responds to horizontal edges).
pub const SOBEL_VERTICAL: Kernel = [[-1, -2, -1], [0, 0, 0], [1, 2, 1]];

/// Compute the Sobel gradient magnitude of a grayscale image.
///
/// Reads the R channel of `gray`. Out-of-bounds neighbors are resolved
/// by `border`; [`BorderPolicy::Zero`] treats them as 0 using the true
/// width and height of the frame.
#[must_use = "returns the gradient magnitude image"]
pub fn sobel_magnitude(gray: &PixelBuffer, border: BorderPolicy) -> PixelBuffer {
    let mut out = gray.clone();
    sobel_rows(gray, &mut out, 0, gray.height(), border);
    out
}

/// Grayscale conversion followed by [`sobel_magnitude`].
#[must_use = "returns the edge magnitude image"]
pub fn detect_edges(
    buffer: &PixelBuffer,
    weighting: Weighting,
    border: BorderPolicy,
) -> PixelBuffer {
    sobel_magnitude(&to_grayscale(buffer, weighting), border)
}

/// Horizontal and vertical gradient sums `(gx, gy)` at `(x, y)`.
///
/// Neighbor lookups always resolve against the whole of `gray`, so
/// callers that process a frame in bands get no seams at band edges.
#[must_use]
pub fn gradients(gray: &PixelBuffer, x: u32, y: u32, border: BorderPolicy) -> (i32, i32) {
    let mut gx = 0;
    let mut gy = 0;
    for (dy, (row_x, row_y)) in (-1..=1).zip(SOBEL_HORIZONTAL.iter().zip(&SOBEL_VERTICAL)) {
        for (dx, (wx, wy)) in (-1..=1).zip(row_x.iter().zip(row_y)) {
            let v = sample(gray, i64::from(x) + dx, i64::from(y) + dy, border);
            gx += wx * v;
            gy += wy * v;
        }
    }
    (gx, gy)
}

/// Combine gradient sums into an 8-bit magnitude.
///
/// Uses the integer square root so truncation is exact, then clamps to
/// 255.
#[must_use]
pub fn magnitude(gx: i32, gy: i32) -> u8 {
    let squared = u64::from(gx.unsigned_abs()).pow(2) + u64::from(gy.unsigned_abs()).pow(2);
    u8::try_from(squared.isqrt()).unwrap_or(u8::MAX)
}

/// Write the Sobel magnitude of rows `[start, end)` into `out`.
///
/// Neighbors are read from the full `gray` frame. `out` must share its
/// dimensions with `gray` and must not alias it.
pub(crate) fn sobel_rows(
    gray: &PixelBuffer,
    out: &mut PixelBuffer,
    start: u32,
    end: u32,
    border: BorderPolicy,
) {
    let width = gray.width();
    let span = out.row_span(start, end);
    let dst = &mut out.raw_mut()[span];
    let coords = (start..end).flat_map(|y| (0..width).map(move |x| (x, y)));
    for ((x, y), d) in coords.zip(dst.chunks_exact_mut(CHANNELS)) {
        let (gx, gy) = gradients(gray, x, y, border);
        let m = magnitude(gx, gy);
        d.copy_from_slice(&[m, m, m, u8::MAX]);
    }
}

/// Luminance sample at a possibly out-of-bounds coordinate.
fn sample(gray: &PixelBuffer, x: i64, y: i64, border: BorderPolicy) -> i32 {
    let width = i64::from(gray.width());
    let height = i64::from(gray.height());
    let (x, y) = match border {
        BorderPolicy::Zero => {
            if x < 0 || y < 0 || x >= width || y >= height {
                return 0;
            }
            (x, y)
        }
        BorderPolicy::Replicate => (x.clamp(0, width - 1), y.clamp(0, height - 1)),
    };
    // In bounds after the checks above, so both fit in u32.
    let (Ok(x), Ok(y)) = (u32::try_from(x), u32::try_from(y)) else {
        return 0;
    };
    i32::from(gray.pixel(x, y)[0])
}
