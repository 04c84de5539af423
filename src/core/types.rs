use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::error::{ChartError, ChartResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    #[must_use]
    pub fn is_valid(self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// Pixel span available along `dimension`.
    #[must_use]
    pub fn span_px(self, dimension: Dimension) -> f64 {
        match dimension {
            Dimension::X => f64::from(self.width),
            Dimension::Y => f64::from(self.height),
        }
    }
}

/// Axis dimension a value or axis belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dimension {
    X,
    Y,
}

impl Dimension {
    /// Picks this dimension's coordinate out of a point.
    #[must_use]
    pub fn of(self, point: DataPoint) -> f64 {
        match self {
            Self::X => point.x,
            Self::Y => point.y,
        }
    }
}

/// Raw `(x, y)` sample supplied by producers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    pub x: f64,
    pub y: f64,
}

impl DataPoint {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Builds a sample from a wall-clock time and a decimal measurement.
    pub fn from_decimal_time(time: DateTime<Utc>, value: Decimal) -> ChartResult<Self> {
        Ok(Self {
            x: datetime_to_unix_seconds(time),
            y: decimal_to_f64(value, "value")?,
        })
    }

    pub fn from_decimal(x: Decimal, y: Decimal) -> ChartResult<Self> {
        Ok(Self {
            x: decimal_to_f64(x, "x")?,
            y: decimal_to_f64(y, "y")?,
        })
    }

    pub(crate) fn validate(self) -> ChartResult<Self> {
        if !self.x.is_finite() || !self.y.is_finite() {
            return Err(ChartError::InvalidData(
                "point coordinates must be finite".to_owned(),
            ));
        }
        Ok(self)
    }
}

pub fn decimal_to_f64(value: Decimal, field_name: &str) -> ChartResult<f64> {
    value.to_f64().ok_or_else(|| {
        ChartError::InvalidData(format!("{field_name} cannot be represented as f64"))
    })
}

#[must_use]
pub fn datetime_to_unix_seconds(time: DateTime<Utc>) -> f64 {
    time.timestamp_millis() as f64 / 1000.0
}

/// Identity of a series inside one [`ChartContext`](crate::chart::ChartContext).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SeriesId(pub u64);

/// Identity of a stored point, unique within its series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PointId(pub u64);

/// Identity of a chart, used to verify which renderer lock guards a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChartId(pub u64);

/// Stored sample with its cached normalized plot coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub id: PointId,
    /// Owning series; identity only, used for change records.
    pub series: SeriesId,
    pub x: f64,
    pub y: f64,
    pub scaled_x: f64,
    pub scaled_y: f64,
}

impl Point {
    #[must_use]
    pub fn new(id: PointId, series: SeriesId, data: DataPoint) -> Self {
        Self {
            id,
            series,
            x: data.x,
            y: data.y,
            scaled_x: 0.0,
            scaled_y: 0.0,
        }
    }

    #[must_use]
    pub fn data(&self) -> DataPoint {
        DataPoint::new(self.x, self.y)
    }

    #[must_use]
    pub fn coordinate(&self, dimension: Dimension) -> f64 {
        dimension.of(self.data())
    }

    pub(crate) fn set_scaled(&mut self, dimension: Dimension, scaled: f64) {
        match dimension {
            Dimension::X => self.scaled_x = scaled,
            Dimension::Y => self.scaled_y = scaled,
        }
    }
}
