use serde::{Deserialize, Serialize};

use crate::axis::TickLabel;
use crate::core::{ChartId, PointId, Range, SeriesId, Viewport};
use crate::error::{ChartError, ChartResult};

/// Normalized plot position of one stored point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaledPoint {
    pub id: PointId,
    pub x: f64,
    pub y: f64,
}

/// Snapshot of one visible series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesFrame {
    pub id: SeriesId,
    pub name: String,
    pub points: Vec<ScaledPoint>,
}

/// Backend-agnostic output of one render pass.
///
/// Every coordinate is normalized to `[0, 1]`; mapping onto pixels is the
/// renderer's job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderFrame {
    pub chart: ChartId,
    /// Monotonic pass counter of the owning chart.
    pub pass: u64,
    pub viewport: Viewport,
    pub x_range: Range,
    pub y_range: Range,
    pub x_ticks: Vec<TickLabel>,
    pub y_ticks: Vec<TickLabel>,
    pub series: Vec<SeriesFrame>,
}

impl RenderFrame {
    #[must_use]
    pub fn new(chart: ChartId, pass: u64, viewport: Viewport) -> Self {
        Self {
            chart,
            pass,
            viewport,
            x_range: Range::ZERO,
            y_range: Range::ZERO,
            x_ticks: Vec::new(),
            y_ticks: Vec::new(),
            series: Vec::new(),
        }
    }

    pub fn validate(&self) -> ChartResult<()> {
        if !self.viewport.is_valid() {
            return Err(ChartError::InvalidViewport {
                width: self.viewport.width,
                height: self.viewport.height,
            });
        }
        for tick in self.x_ticks.iter().chain(&self.y_ticks) {
            if !tick.value.is_finite() || !tick.normalized.is_finite() {
                return Err(ChartError::InvalidData(format!(
                    "tick `{}` has a non-finite position",
                    tick.text
                )));
            }
        }
        for series in &self.series {
            if let Some(point) = series
                .points
                .iter()
                .find(|point| !point.x.is_finite() || !point.y.is_finite())
            {
                return Err(ChartError::InvalidData(format!(
                    "point {:?} of series {:?} has a non-finite scaled coordinate",
                    point.id, series.id
                )));
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn point_count(&self) -> usize {
        self.series.iter().map(|series| series.points.len()).sum()
    }

    #[must_use]
    pub fn tick_count(&self) -> usize {
        self.x_ticks.len() + self.y_ticks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tick_count() == 0 && self.point_count() == 0
    }

    pub fn to_json_pretty(&self) -> ChartResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
