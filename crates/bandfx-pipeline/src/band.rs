//! Horizontal band partitioning.
//!
//! A frame `height` rows tall is split into `band_count` contiguous
//! bands of `height / band_count` rows each; the final band absorbs the
//! remainder. Bands cover every row exactly once, in order.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::types::PipelineError;

/// Rows `[start_row, end_row)` of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Band {
    /// First row of the band (inclusive).
    pub start_row: u32,
    /// One past the last row of the band.
    pub end_row: u32,
}

impl Band {
    /// The band's rows as a range.
    #[must_use]
    pub const fn rows(self) -> Range<u32> {
        self.start_row..self.end_row
    }

    /// Number of rows in the band.
    #[must_use]
    pub const fn len(self) -> u32 {
        self.end_row.saturating_sub(self.start_row)
    }

    /// Whether the band has no rows. Never true for bands produced by
    /// [`partition`].
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.start_row >= self.end_row
    }
}

/// Split `height` rows into `band_count` bands.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidBandCount`] if `band_count` is zero
/// or larger than `height` (which would force empty bands).
pub fn partition(height: u32, band_count: usize) -> Result<Vec<Band>, PipelineError> {
    let invalid = || PipelineError::InvalidBandCount { band_count, height };
    let count = u32::try_from(band_count).map_err(|_| invalid())?;
    if count == 0 || count > height {
        return Err(invalid());
    }

    let base = height / count;
    let bands: Vec<Band> = (0..count)
        .map(|i| Band {
            start_row: i * base,
            end_row: if i + 1 == count { height } else { (i + 1) * base },
        })
        .collect();

    let last = bands.last().map_or(0, |b| b.len());
    log::trace!("partitioned {height} rows into {count} bands of {base} (last {last})");
    Ok(bands)
}
