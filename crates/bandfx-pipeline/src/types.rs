//! Shared types for the bandfx pixel pipeline.

use serde::{Deserialize, Serialize};

use crate::rotate::Rotation;
use crate::staged::BandTransform;

/// Re-export `RgbaImage` so downstream crates can hand decoded images
/// to the pipeline without depending on `image` directly.
pub use image::RgbaImage;

/// Number of bytes per RGBA pixel.
pub const CHANNELS: usize = 4;

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Total pixel count (`width * height`).
    #[must_use]
    pub const fn pixel_count(self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// A rectangular grid of RGBA8 pixels in row-major order.
///
/// The sample for channel `c` of pixel `(x, y)` lives at
/// `(y * width + x) * 4 + c`. A `PixelBuffer` always satisfies
/// `len == width * height * 4` with both dimensions non-zero, so every
/// kernel that accepts one is infallible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer(RgbaImage);

impl PixelBuffer {
    /// Wrap raw RGBA bytes.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidDimensions`] if either dimension
    /// is zero or `data.len() != width * height * 4`.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Result<Self, PipelineError> {
        let len = data.len();
        let invalid = || PipelineError::InvalidDimensions { width, height, len };
        check_len(width, height, len)?;
        RgbaImage::from_raw(width, height, data)
            .map(Self)
            .ok_or_else(invalid)
    }

    /// Build a buffer by evaluating `f` for every pixel.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidDimensions`] if either dimension
    /// is zero.
    pub fn from_fn(
        width: u32,
        height: u32,
        mut f: impl FnMut(u32, u32) -> [u8; 4],
    ) -> Result<Self, PipelineError> {
        if width == 0 || height == 0 {
            return Err(PipelineError::InvalidDimensions {
                width,
                height,
                len: 0,
            });
        }
        Ok(Self(RgbaImage::from_fn(width, height, |x, y| {
            image::Rgba(f(x, y))
        })))
    }

    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.0.width()
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.0.height()
    }

    /// Width and height together.
    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.width(),
            height: self.height(),
        }
    }

    /// The RGBA sample quadruple at `(x, y)`.
    ///
    /// Coordinates must be in bounds.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        self.0.get_pixel(x, y).0
    }

    /// Raw row-major RGBA bytes.
    #[must_use]
    pub fn as_raw(&self) -> &[u8] {
        self.0.as_raw()
    }

    /// Borrow the underlying `image` buffer.
    #[must_use]
    pub const fn as_image(&self) -> &RgbaImage {
        &self.0
    }

    /// Wrap an image already known to have non-zero dimensions and an
    /// exactly sized buffer, such as one built by `image` itself.
    pub(crate) const fn from_valid(image: RgbaImage) -> Self {
        Self(image)
    }

    /// Bytes per row.
    pub(crate) fn stride(&self) -> usize {
        self.width() as usize * CHANNELS
    }

    /// Mutable raw bytes. Length is fixed, so the invariant holds.
    pub(crate) fn raw_mut(&mut self) -> &mut [u8] {
        &mut self.0
    }

    /// Byte range covering rows `[start, end)`.
    pub(crate) fn row_span(&self, start: u32, end: u32) -> std::ops::Range<usize> {
        let stride = self.stride();
        start as usize * stride..end as usize * stride
    }
}

impl TryFrom<RgbaImage> for PixelBuffer {
    type Error = PipelineError;

    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidDimensions`] if either dimension
    /// is zero or the backing buffer is longer than `width * height * 4`
    /// (`RgbaImage::from_raw` accepts oversized buffers).
    fn try_from(image: RgbaImage) -> Result<Self, Self::Error> {
        check_len(image.width(), image.height(), image.as_raw().len())?;
        Ok(Self(image))
    }
}

/// Require non-zero dimensions and exactly `width * height * 4` bytes.
fn check_len(width: u32, height: u32, len: usize) -> Result<(), PipelineError> {
    let expected = (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(CHANNELS));
    match expected {
        Some(expected) if width != 0 && height != 0 && expected == len => Ok(()),
        _ => Err(PipelineError::InvalidDimensions { width, height, len }),
    }
}

impl From<PixelBuffer> for RgbaImage {
    fn from(buffer: PixelBuffer) -> Self {
        buffer.0
    }
}

/// How RGB is collapsed to a single luminance sample.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Weighting {
    /// Unweighted `(R + G + B) / 3`.
    #[default]
    Average,
    /// Rec. 601 luma: `0.299 R + 0.587 G + 0.114 B`.
    Perceptual,
}

impl Weighting {
    /// Luminance of a single RGB triple, rounded to the nearest integer.
    ///
    /// Integer arithmetic only, so the result is identical on every
    /// platform.
    #[must_use]
    pub fn luminance(self, r: u8, g: u8, b: u8) -> u8 {
        let (r, g, b) = (u32::from(r), u32::from(g), u32::from(b));
        let value = match self {
            Self::Average => (r + g + b + 1) / 3,
            Self::Perceptual => (299 * r + 587 * g + 114 * b + 500) / 1000,
        };
        // Both formulas are bounded by 255.
        u8::try_from(value).unwrap_or(u8::MAX)
    }
}

/// How convolution reads neighbors that fall outside the frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BorderPolicy {
    /// Out-of-bounds neighbors contribute a sample value of 0.
    #[default]
    Zero,
    /// Out-of-bounds coordinates are clamped to the nearest edge pixel.
    Replicate,
}

/// Which transform the pipeline runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// Grayscale conversion only.
    Grayscale,
    /// Grayscale followed by Sobel gradient magnitude.
    #[default]
    Sobel,
    /// Horizontal mirror.
    Mirror,
    /// Quarter-turn rotation (whole frame only).
    Rotate,
}

impl Operation {
    /// Display name used in timing logs.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Grayscale => "Grayscale",
            Self::Sobel => "Sobel Operator",
            Self::Mirror => "Mirror Image",
            Self::Rotate => "Rotate Image",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Configuration for a filter run.
///
/// Defaults to Sobel with average weighting and zero padding, run in
/// four bands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Which transform to run.
    pub operation: Operation,

    /// Grayscale weighting for [`Operation::Grayscale`] and
    /// [`Operation::Sobel`].
    pub weighting: Weighting,

    /// Border handling for [`Operation::Sobel`].
    pub border: BorderPolicy,

    /// Number of horizontal bands for staged execution.
    ///
    /// Must be at least 1 and at most the image height; validated when
    /// a staged run starts.
    pub band_count: usize,

    /// Rotation applied by [`Operation::Rotate`].
    pub rotation: Rotation,
}

impl FilterConfig {
    /// Default number of bands for staged execution.
    pub const DEFAULT_BAND_COUNT: usize = 4;

    /// The staged transform for this config, or `None` if the operation
    /// cannot run band by band.
    #[must_use]
    pub const fn band_transform(&self) -> Option<BandTransform> {
        match self.operation {
            Operation::Grayscale => Some(BandTransform::Grayscale(self.weighting)),
            Operation::Sobel => Some(BandTransform::Sobel {
                weighting: self.weighting,
                border: self.border,
            }),
            Operation::Mirror => Some(BandTransform::Mirror),
            Operation::Rotate => None,
        }
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            operation: Operation::default(),
            weighting: Weighting::default(),
            border: BorderPolicy::default(),
            band_count: Self::DEFAULT_BAND_COUNT,
            rotation: Rotation::default(),
        }
    }
}

/// Errors raised by the pipeline.
///
/// Both variants are validation failures detected before any pixel is
/// touched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum PipelineError {
    /// Buffer dimensions do not describe the supplied bytes.
    #[error("invalid dimensions {width}x{height} for {len} bytes (need width * height * 4)")]
    InvalidDimensions {
        /// Claimed width.
        width: u32,
        /// Claimed height.
        height: u32,
        /// Actual byte length.
        len: usize,
    },

    /// Band count is zero or exceeds the number of rows.
    #[error("invalid band count {band_count} for an image {height} rows tall")]
    InvalidBandCount {
        /// Requested band count.
        band_count: usize,
        /// Image height in rows.
        height: u32,
    },
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    // --- PixelBuffer tests ---

    #[test]
    fn from_raw_accepts_matching_length() {
        let buf = PixelBuffer::from_raw(2, 3, vec![0; 24]).unwrap();
        assert_eq!(buf.width(), 2);
        assert_eq!(buf.height(), 3);
        assert_eq!(buf.as_raw().len(), 24);
    }

    #[test]
    fn from_raw_rejects_short_buffer() {
        let result = PixelBuffer::from_raw(2, 2, vec![0; 15]);
        assert!(matches!(
            result,
            Err(PipelineError::InvalidDimensions {
                width: 2,
                height: 2,
                len: 15
            })
        ));
    }

    #[test]
    fn from_raw_rejects_long_buffer() {
        let result = PixelBuffer::from_raw(2, 2, vec![0; 17]);
        assert!(matches!(
            result,
            Err(PipelineError::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn from_raw_rejects_zero_width_or_height() {
        assert!(PixelBuffer::from_raw(0, 4, Vec::new()).is_err());
        assert!(PixelBuffer::from_raw(4, 0, Vec::new()).is_err());
    }

    #[test]
    fn from_fn_rejects_zero_dimension() {
        assert!(PixelBuffer::from_fn(0, 1, |_, _| [0; 4]).is_err());
    }

    #[test]
    fn try_from_empty_image_fails() {
        let result = PixelBuffer::try_from(RgbaImage::new(0, 0));
        assert!(matches!(
            result,
            Err(PipelineError::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn try_from_oversized_image_fails() {
        // `RgbaImage::from_raw` only requires *at least* w * h * 4 bytes.
        let image = RgbaImage::from_raw(2, 2, vec![7; 20]).unwrap();
        let result = PixelBuffer::try_from(image);
        assert_eq!(
            result,
            Err(PipelineError::InvalidDimensions {
                width: 2,
                height: 2,
                len: 20
            })
        );
    }

    #[test]
    fn try_from_exact_image_succeeds() {
        let image = RgbaImage::from_raw(2, 2, vec![7; 16]).unwrap();
        let buf = PixelBuffer::try_from(image).unwrap();
        assert_eq!(buf.as_raw().len(), 16);
        assert_eq!(RgbaImage::from(buf).as_raw().len(), 16);
    }

    #[test]
    fn pixel_uses_row_major_layout() {
        let data: Vec<u8> = (0..24).collect();
        let buf = PixelBuffer::from_raw(3, 2, data).unwrap();
        // (y * width + x) * 4 = (1 * 3 + 2) * 4 = 20
        assert_eq!(buf.pixel(2, 1), [20, 21, 22, 23]);
        assert_eq!(buf.pixel(0, 0), [0, 1, 2, 3]);
    }

    #[test]
    fn dimensions_pixel_count() {
        let d = Dimensions {
            width: 70_000,
            height: 70_000,
        };
        assert_eq!(d.pixel_count(), 4_900_000_000);
    }

    // --- Weighting tests ---

    #[test]
    fn average_of_pure_red_is_85() {
        assert_eq!(Weighting::Average.luminance(255, 0, 0), 85);
    }

    #[test]
    fn average_rounds_to_nearest() {
        // 2 / 3 = 0.67 -> 1, 1 / 3 = 0.33 -> 0
        assert_eq!(Weighting::Average.luminance(1, 1, 0), 1);
        assert_eq!(Weighting::Average.luminance(1, 0, 0), 0);
    }

    #[test]
    fn perceptual_weights_green_highest() {
        let r = Weighting::Perceptual.luminance(255, 0, 0);
        let g = Weighting::Perceptual.luminance(0, 255, 0);
        let b = Weighting::Perceptual.luminance(0, 0, 255);
        assert_eq!((r, g, b), (76, 150, 29));
        assert!(g > r && r > b);
    }

    #[test]
    fn both_weightings_preserve_white_and_black() {
        for w in [Weighting::Average, Weighting::Perceptual] {
            assert_eq!(w.luminance(255, 255, 255), 255);
            assert_eq!(w.luminance(0, 0, 0), 0);
        }
    }

    // --- FilterConfig tests ---

    #[test]
    fn default_config_is_sobel_in_four_bands() {
        let config = FilterConfig::default();
        assert_eq!(config.operation, Operation::Sobel);
        assert_eq!(config.weighting, Weighting::Average);
        assert_eq!(config.border, BorderPolicy::Zero);
        assert_eq!(config.band_count, 4);
    }

    #[test]
    fn config_serde_round_trip() {
        let config = FilterConfig {
            operation: Operation::Mirror,
            weighting: Weighting::Perceptual,
            border: BorderPolicy::Replicate,
            band_count: 7,
            rotation: Rotation::Cw270,
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: FilterConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, back);
    }

    #[test]
    fn partial_config_json_fills_defaults() {
        let config: FilterConfig =
            serde_json::from_str(r#"{"operation":"mirror","band_count":2}"#).unwrap();
        assert_eq!(config.operation, Operation::Mirror);
        assert_eq!(config.band_count, 2);
        assert_eq!(config.weighting, Weighting::Average);
    }

    #[test]
    fn rotate_has_no_band_transform() {
        let config = FilterConfig {
            operation: Operation::Rotate,
            ..FilterConfig::default()
        };
        assert!(config.band_transform().is_none());
    }

    #[test]
    fn sobel_band_transform_carries_settings() {
        let config = FilterConfig {
            weighting: Weighting::Perceptual,
            border: BorderPolicy::Replicate,
            ..FilterConfig::default()
        };
        assert_eq!(
            config.band_transform(),
            Some(BandTransform::Sobel {
                weighting: Weighting::Perceptual,
                border: BorderPolicy::Replicate,
            })
        );
    }

    // --- PipelineError ---

    #[test]
    fn error_serde_round_trip() {
        let err = PipelineError::InvalidBandCount {
            band_count: 9,
            height: 4,
        };
        let json = serde_json::to_string(&err).unwrap();
        let back: PipelineError = serde_json::from_str(&json).unwrap();
        assert_eq!(err, back);
    }

    #[test]
    fn error_messages_name_the_problem() {
        let err = PipelineError::InvalidDimensions {
            width: 3,
            height: 2,
            len: 10,
        };
        assert!(err.to_string().contains("3x2"));
        let err = PipelineError::InvalidBandCount {
            band_count: 0,
            height: 5,
        };
        assert!(err.to_string().contains("band count 0"));
    }
}
