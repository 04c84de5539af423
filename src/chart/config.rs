use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::axis::AxisConfig;
use crate::core::{Dimension, Viewport};
use crate::error::{ChartError, ChartResult};

/// Sleep bounds of the background render scheduler, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerTuning {
    pub min_sleep_ms: u64,
    pub max_sleep_ms: u64,
    /// Sleep adjustment per pass, scaled by queue depth when shrinking.
    pub step_ms: u64,
}

impl Default for SchedulerTuning {
    fn default() -> Self {
        Self {
            min_sleep_ms: 10,
            max_sleep_ms: 1_000,
            step_ms: 10,
        }
    }
}

impl SchedulerTuning {
    pub fn validate(self) -> ChartResult<Self> {
        if self.min_sleep_ms == 0 || self.step_ms == 0 {
            return Err(ChartError::InvalidConfiguration(
                "scheduler min sleep and step must be > 0 ms".to_owned(),
            ));
        }
        if self.min_sleep_ms > self.max_sleep_ms {
            return Err(ChartError::InvalidConfiguration(format!(
                "scheduler min sleep ({} ms) exceeds max sleep ({} ms)",
                self.min_sleep_ms, self.max_sleep_ms
            )));
        }
        Ok(self)
    }

    #[must_use]
    pub fn min_sleep(self) -> Duration {
        Duration::from_millis(self.min_sleep_ms)
    }

    #[must_use]
    pub fn max_sleep(self) -> Duration {
        Duration::from_millis(self.max_sleep_ms)
    }

    /// Sleep before the next pass given the current sleep and queue depth.
    ///
    /// An idle queue backs off by one step; a busy one speeds up by one step
    /// per queued change. The result stays within `[min, max]`.
    #[must_use]
    pub fn next_sleep(self, current: Duration, queue_depth: usize) -> Duration {
        let current = u64::try_from(current.as_millis()).unwrap_or(u64::MAX);
        let next = if queue_depth == 0 {
            current.saturating_add(self.step_ms)
        } else {
            let depth = u64::try_from(queue_depth).unwrap_or(u64::MAX);
            current.saturating_sub(self.step_ms.saturating_mul(depth))
        };
        Duration::from_millis(next.clamp(self.min_sleep_ms, self.max_sleep_ms))
    }
}

/// Complete chart configuration, loadable from JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    pub viewport: Viewport,
    pub x_axis: AxisConfig,
    pub y_axis: AxisConfig,
    pub scheduler: SchedulerTuning,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            viewport: Viewport::new(800, 600),
            x_axis: AxisConfig::default(),
            y_axis: AxisConfig::default(),
            scheduler: SchedulerTuning::default(),
        }
    }
}

impl ChartConfig {
    #[must_use]
    pub fn with_viewport(mut self, viewport: Viewport) -> Self {
        self.viewport = viewport;
        self
    }

    #[must_use]
    pub fn axis(&self, dimension: Dimension) -> &AxisConfig {
        match dimension {
            Dimension::X => &self.x_axis,
            Dimension::Y => &self.y_axis,
        }
    }

    pub fn validate(&self) -> ChartResult<()> {
        if !self.viewport.is_valid() {
            return Err(ChartError::InvalidViewport {
                width: self.viewport.width,
                height: self.viewport.height,
            });
        }
        self.scheduler.validate()?;
        self.x_axis.build(Dimension::X)?;
        self.y_axis.build(Dimension::Y)?;
        Ok(())
    }

    /// Parses and validates a JSON configuration. Missing fields take defaults.
    pub fn from_json_str(input: &str) -> ChartResult<Self> {
        let config: Self = serde_json::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_pretty(&self) -> ChartResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
