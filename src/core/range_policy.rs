use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::Range;
use crate::error::{ChartError, ChartResult};

/// Strategy resolving the visible range of an axis from raw data bounds.
///
/// Policies are pure with respect to queries: only their configuration
/// influences the result.
pub trait RangePolicy: fmt::Debug + Send + Sync {
    fn max(&self, data_min: f64, data_max: f64) -> f64;
    fn min(&self, data_min: f64, data_max: f64) -> f64;
    fn configured_range(&self) -> Range;
    fn set_configured_range(&mut self, range: Range);

    /// Serializable description of this policy and its parameters.
    fn config(&self) -> RangePolicyConfig;

    /// Returns `true` when a concrete (bounded) range has been configured.
    fn is_configured(&self) -> bool {
        !self.configured_range().is_unbounded()
    }

    /// Effective visible range for the given raw data bounds.
    fn resolve(&self, data: Range) -> Range {
        let min = self.min(data.min(), data.max());
        let max = self.max(data.min(), data.max());
        if min.is_nan() || max.is_nan() {
            return data;
        }
        Range::ordered(min, max)
    }
}

/// Passes raw data bounds through untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Unbounded;

impl RangePolicy for Unbounded {
    fn max(&self, _data_min: f64, data_max: f64) -> f64 {
        data_max
    }

    fn min(&self, data_min: f64, _data_max: f64) -> f64 {
        data_min
    }

    fn configured_range(&self) -> Range {
        Range::UNBOUNDED
    }

    fn set_configured_range(&mut self, _range: Range) {}

    fn config(&self) -> RangePolicyConfig {
        RangePolicyConfig::Unbounded
    }
}

/// Always shows exactly the configured range, regardless of data.
///
/// An unconfigured viewport falls back to the data bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedViewport {
    range: Range,
}

impl FixedViewport {
    pub fn new(range: Range) -> ChartResult<Self> {
        validate_viewport(range)?;
        Ok(Self { range })
    }

    /// Viewport waiting for a range, e.g. one transferred on policy switch.
    #[must_use]
    pub fn unconfigured() -> Self {
        Self {
            range: Range::UNBOUNDED,
        }
    }
}

impl RangePolicy for FixedViewport {
    fn max(&self, _data_min: f64, data_max: f64) -> f64 {
        if self.range.is_unbounded() {
            data_max
        } else {
            self.range.max()
        }
    }

    fn min(&self, data_min: f64, _data_max: f64) -> f64 {
        if self.range.is_unbounded() {
            data_min
        } else {
            self.range.min()
        }
    }

    fn configured_range(&self) -> Range {
        self.range
    }

    fn set_configured_range(&mut self, range: Range) {
        if range.is_unbounded() || validate_viewport(range).is_ok() {
            self.range = range;
        }
    }

    fn config(&self) -> RangePolicyConfig {
        let (min, max) = configured_bounds(self.range);
        RangePolicyConfig::FixedViewport { min, max }
    }
}

/// Keeps the configured range visible and grows to include all data.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinimumViewport {
    range: Range,
}

impl MinimumViewport {
    pub fn new(range: Range) -> ChartResult<Self> {
        validate_viewport(range)?;
        Ok(Self { range })
    }

    #[must_use]
    pub fn unconfigured() -> Self {
        Self {
            range: Range::UNBOUNDED,
        }
    }
}

impl RangePolicy for MinimumViewport {
    fn max(&self, _data_min: f64, data_max: f64) -> f64 {
        if self.range.is_unbounded() {
            data_max
        } else {
            self.range.max().max(data_max)
        }
    }

    fn min(&self, data_min: f64, _data_max: f64) -> f64 {
        if self.range.is_unbounded() {
            data_min
        } else {
            self.range.min().min(data_min)
        }
    }

    fn configured_range(&self) -> Range {
        self.range
    }

    fn set_configured_range(&mut self, range: Range) {
        if range.is_unbounded() || validate_viewport(range).is_ok() {
            self.range = range;
        }
    }

    fn config(&self) -> RangePolicyConfig {
        let (min, max) = configured_bounds(self.range);
        RangePolicyConfig::MinimumViewport { min, max }
    }
}

/// Extends the data bounds so that a given value is always visible.
///
/// Its configured range is the degenerate `(point, point)`; configuring a
/// range moves the forced point to the range minimum.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForcedPoint {
    point: f64,
}

impl ForcedPoint {
    pub fn new(point: f64) -> ChartResult<Self> {
        if !point.is_finite() {
            return Err(ChartError::InvalidConfiguration(
                "forced point must be finite".to_owned(),
            ));
        }
        Ok(Self { point })
    }

    #[must_use]
    pub fn point(&self) -> f64 {
        self.point
    }
}

impl Default for ForcedPoint {
    fn default() -> Self {
        Self { point: 0.0 }
    }
}

impl RangePolicy for ForcedPoint {
    fn max(&self, _data_min: f64, data_max: f64) -> f64 {
        data_max.max(self.point)
    }

    fn min(&self, data_min: f64, _data_max: f64) -> f64 {
        data_min.min(self.point)
    }

    fn configured_range(&self) -> Range {
        Range::ordered(self.point, self.point)
    }

    fn set_configured_range(&mut self, range: Range) {
        if range.min().is_finite() {
            self.point = range.min();
        }
    }

    fn config(&self) -> RangePolicyConfig {
        RangePolicyConfig::ForcedPoint { value: self.point }
    }
}

/// Shows the trailing window `[data_max - width, data_max]`, clipped to the data.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HighestValues {
    width: f64,
}

impl HighestValues {
    pub fn new(width: f64) -> ChartResult<Self> {
        validate_width(width)?;
        Ok(Self { width })
    }

    #[must_use]
    pub fn width(&self) -> f64 {
        self.width
    }
}

impl RangePolicy for HighestValues {
    fn max(&self, _data_min: f64, data_max: f64) -> f64 {
        data_max
    }

    fn min(&self, data_min: f64, data_max: f64) -> f64 {
        (data_max - self.width).max(data_min)
    }

    fn configured_range(&self) -> Range {
        Range::ordered(0.0, self.width)
    }

    fn set_configured_range(&mut self, range: Range) {
        if validate_width(range.extent()).is_ok() {
            self.width = range.extent();
        }
    }

    fn config(&self) -> RangePolicyConfig {
        RangePolicyConfig::HighestValues { width: self.width }
    }
}

/// Config bounds of a viewport policy; `None` while it is unconfigured.
fn configured_bounds(range: Range) -> (Option<f64>, Option<f64>) {
    if range.is_unbounded() {
        (None, None)
    } else {
        (Some(range.min()), Some(range.max()))
    }
}

fn validate_viewport(range: Range) -> ChartResult<()> {
    if !range.min().is_finite() || !range.max().is_finite() {
        return Err(ChartError::InvalidConfiguration(
            "viewport bounds must be finite".to_owned(),
        ));
    }
    Ok(())
}

/// Viewport range from config bounds. Both bounds or neither must be given.
fn viewport_range(min: Option<f64>, max: Option<f64>) -> ChartResult<Range> {
    match (min, max) {
        (None, None) => Ok(Range::UNBOUNDED),
        (Some(min), Some(max)) => {
            let range = Range::new(min, max)?;
            validate_viewport(range)?;
            Ok(range)
        }
        _ => Err(ChartError::InvalidConfiguration(
            "viewport needs both `min` and `max`, or neither".to_owned(),
        )),
    }
}

fn validate_width(width: f64) -> ChartResult<()> {
    if !width.is_finite() || width <= 0.0 {
        return Err(ChartError::InvalidConfiguration(
            "highest-values window width must be finite and > 0".to_owned(),
        ));
    }
    Ok(())
}

/// Serializable selection of a range policy and its parameters.
///
/// Viewport bounds are omitted for a policy waiting for a transferred range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RangePolicyConfig {
    #[default]
    Unbounded,
    FixedViewport {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<f64>,
    },
    MinimumViewport {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<f64>,
    },
    ForcedPoint {
        value: f64,
    },
    HighestValues {
        width: f64,
    },
}

impl RangePolicyConfig {
    /// Instantiates the configured policy, validating its parameters.
    pub fn build(self) -> ChartResult<Box<dyn RangePolicy>> {
        Ok(match self {
            Self::Unbounded => Box::new(Unbounded),
            Self::FixedViewport { min, max } => Box::new(FixedViewport {
                range: viewport_range(min, max)?,
            }),
            Self::MinimumViewport { min, max } => Box::new(MinimumViewport {
                range: viewport_range(min, max)?,
            }),
            Self::ForcedPoint { value } => Box::new(ForcedPoint::new(value)?),
            Self::HighestValues { width } => Box::new(HighestValues::new(width)?),
        })
    }
}
