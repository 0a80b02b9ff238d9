//! Quarter-turn rotation.
//!
//! Rotation moves pixels between rows, so unlike the other kernels it
//! only runs on a whole frame and never in bands.

use image::imageops;
use serde::{Deserialize, Serialize};

use crate::types::PixelBuffer;

/// Clockwise rotation in 90° steps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rotation {
    /// No rotation.
    #[default]
    Identity,
    /// 90° clockwise.
    Cw90,
    /// 180°.
    Cw180,
    /// 270° clockwise (90° counter-clockwise).
    Cw270,
}

impl Rotation {
    /// The rotation one quarter turn further clockwise, wrapping from
    /// 270° back to 0°.
    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            Self::Identity => Self::Cw90,
            Self::Cw90 => Self::Cw180,
            Self::Cw180 => Self::Cw270,
            Self::Cw270 => Self::Identity,
        }
    }

    /// Angle in degrees, one of 0, 90, 180, 270.
    #[must_use]
    pub const fn degrees(self) -> u32 {
        match self {
            Self::Identity => 0,
            Self::Cw90 => 90,
            Self::Cw180 => 180,
            Self::Cw270 => 270,
        }
    }

    /// The rotation reached from [`Identity`](Self::Identity) after
    /// `turns` quarter turns clockwise.
    #[must_use]
    pub fn from_quarter_turns(turns: u32) -> Self {
        (0..turns % 4).fold(Self::Identity, |rotation, _| rotation.next())
    }
}

impl std::fmt::Display for Rotation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}°", self.degrees())
    }
}

/// Rotate `buffer` clockwise by `rotation`.
///
/// Quarter turns swap width and height.
#[must_use = "returns the rotated image"]
pub fn rotate(buffer: &PixelBuffer, rotation: Rotation) -> PixelBuffer {
    let src = buffer.as_image();
    let rotated = match rotation {
        Rotation::Identity => return buffer.clone(),
        Rotation::Cw90 => imageops::rotate90(src),
        Rotation::Cw180 => imageops::rotate180(src),
        Rotation::Cw270 => imageops::rotate270(src),
    };
    log::debug!(
        "rotate {rotation}: {}x{} -> {}x{}",
        src.width(),
        src.height(),
        rotated.width(),
        rotated.height(),
    );
    PixelBuffer::from_valid(rotated)
}
