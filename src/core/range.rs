use serde::{Deserialize, Serialize};

use crate::error::{ChartError, ChartResult};

/// Immutable `(min, max)` value interval.
///
/// `min <= max` always holds. A zero-extent range is legal but degenerate:
/// callers dividing by [`Range::extent`] should use [`Range::safe_extent`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Range {
    min: f64,
    max: f64,
}

impl Range {
    /// Sentinel used by policies that are not bounded by configuration.
    pub const UNBOUNDED: Range = Range {
        min: f64::NEG_INFINITY,
        max: f64::INFINITY,
    };

    /// Zero range reported for empty series.
    pub const ZERO: Range = Range { min: 0.0, max: 0.0 };

    /// Creates a range, swapping the bounds when given in reverse order.
    pub fn new(min: f64, max: f64) -> ChartResult<Self> {
        if min.is_nan() || max.is_nan() {
            return Err(ChartError::InvalidData(
                "range bounds must not be NaN".to_owned(),
            ));
        }
        Ok(Self::ordered(min, max))
    }

    /// Builds a range from already validated, non-NaN bounds.
    #[must_use]
    pub(crate) fn ordered(a: f64, b: f64) -> Self {
        if a <= b {
            Self { min: a, max: b }
        } else {
            Self { min: b, max: a }
        }
    }

    #[must_use]
    pub fn min(self) -> f64 {
        self.min
    }

    #[must_use]
    pub fn max(self) -> f64 {
        self.max
    }

    #[must_use]
    pub fn extent(self) -> f64 {
        self.max - self.min
    }

    /// Returns the extent, or `1.0` when it is zero or not finite.
    #[must_use]
    pub fn safe_extent(self) -> f64 {
        let extent = self.extent();
        if extent == 0.0 || !extent.is_finite() {
            1.0
        } else {
            extent
        }
    }

    #[must_use]
    pub fn is_degenerate(self) -> bool {
        let extent = self.extent();
        extent == 0.0 || !extent.is_finite()
    }

    #[must_use]
    pub fn is_unbounded(self) -> bool {
        self.min == f64::NEG_INFINITY && self.max == f64::INFINITY
    }

    #[must_use]
    pub fn contains(self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// Maps `value` to its position inside the range, `0.0` at `min` and `1.0` at `max`.
    ///
    /// Degenerate ranges use an extent of `1.0`; a NaN or infinite result
    /// collapses to `0.0`.
    #[must_use]
    pub fn normalize(self, value: f64) -> f64 {
        let normalized = (value - self.min) / self.safe_extent();
        if normalized.is_finite() { normalized } else { 0.0 }
    }

    /// Smallest range containing both `self` and `other`.
    #[must_use]
    pub fn union(self, other: Self) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Exact bitwise comparison used to detect range movement between passes.
    #[must_use]
    pub(crate) fn same_bits(self, other: Self) -> bool {
        self.min.to_bits() == other.min.to_bits() && self.max.to_bits() == other.max.to_bits()
    }
}

impl Default for Range {
    fn default() -> Self {
        Self::ZERO
    }
}
