use serde::{Deserialize, Serialize};

use crate::core::Range;
use crate::error::{ChartError, ChartResult};

/// Smallest fraction of the range maximum kept as lower bound of a log axis
/// whose data reaches zero or below.
const LOG_RANGE_FLOOR_RATIO: f64 = 1e-12;

/// Value transformation applied by an axis before normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TransformKind {
    #[default]
    Linear,
    Log10,
    Ln,
}

impl TransformKind {
    /// Maps a raw value into the transformed domain.
    pub fn apply(self, value: f64) -> ChartResult<f64> {
        match self {
            Self::Linear => Ok(value),
            Self::Log10 | Self::Ln if !(value > 0.0) => Err(ChartError::Transformation {
                value,
                transform: self,
            }),
            Self::Log10 => Ok(value.log10()),
            Self::Ln => Ok(value.ln()),
        }
    }

    /// Maps a transformed value back into the raw domain.
    #[must_use]
    pub fn invert(self, transformed: f64) -> f64 {
        match self {
            Self::Linear => transformed,
            Self::Log10 => 10.0_f64.powf(transformed),
            Self::Ln => transformed.exp(),
        }
    }

    #[must_use]
    pub fn is_linear(self) -> bool {
        matches!(self, Self::Linear)
    }

    /// Transforms a visible range.
    ///
    /// Log transforms raise a non-positive lower bound to a small fraction of
    /// the upper bound; a non-positive upper bound cannot be transformed.
    pub fn apply_range(self, range: Range) -> ChartResult<Range> {
        if self.is_linear() {
            return Ok(range);
        }
        let max = self.apply(range.max())?;
        let raw_min = if range.min() > 0.0 {
            range.min()
        } else {
            range.max() * LOG_RANGE_FLOOR_RATIO
        };
        let min = self.apply(raw_min)?;
        Ok(Range::ordered(min, max))
    }

    /// Normalized `[0, 1]` position of `value` within the (raw) `range`.
    pub fn normalize(self, value: f64, range: Range) -> ChartResult<f64> {
        if self.is_linear() {
            return Ok(range.normalize(value));
        }
        let transformed_range = self.apply_range(range)?;
        let transformed = self.apply(value)?;
        Ok(transformed_range.normalize(transformed))
    }
}
