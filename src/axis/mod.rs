//! Axis state for one dimension: range resolution, value scaling and labeling.

mod ticks;

use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::warn;

pub use ticks::{
    MAX_TICK_ITERATIONS, MAX_ZERO_HIT_RETRIES, TickGenerator, TickIter, TickLabel, TickPass,
    TickSpacing, tick_power,
};

use crate::core::{Dimension, Range, RangePolicy, RangePolicyConfig, TransformKind, Unbounded, Viewport};
use crate::error::ChartResult;
use crate::format::{FormatterConfig, LabelFormatter, NumberFormatter};
use crate::render::FontMetrics;
use crate::telemetry::RateLimitedWarning;

/// Window within which repeated transform failures of one axis log once.
pub const TRANSFORM_WARNING_WINDOW: Duration = Duration::from_secs(10);

/// Serializable axis configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AxisConfig {
    pub spacing: TickSpacing,
    pub start_major_tick: bool,
    pub range_policy: RangePolicyConfig,
    pub formatter: FormatterConfig,
    pub transform: TransformKind,
}

impl AxisConfig {
    pub fn build(&self, dimension: Dimension) -> ChartResult<Axis> {
        let mut axis = Axis::new(dimension);
        axis.ticks = TickGenerator::new(self.spacing)?;
        axis.ticks.set_start_major_tick(self.start_major_tick);
        axis.policy = self.range_policy.build()?;
        axis.formatter = self.formatter.build()?;
        axis.transform = self.transform;
        Ok(axis)
    }
}

/// One axis of a chart.
///
/// The same type serves both dimensions; the dimension only selects which
/// point coordinate and which viewport span it works on.
pub struct Axis {
    dimension: Dimension,
    policy: Box<dyn RangePolicy>,
    formatter: Box<dyn LabelFormatter>,
    ticks: TickGenerator,
    transform: TransformKind,
    range: Range,
    transform_warning: RateLimitedWarning,
}

impl fmt::Debug for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Axis")
            .field("dimension", &self.dimension)
            .field("policy", &self.policy)
            .field("formatter", &self.formatter)
            .field("ticks", &self.ticks)
            .field("transform", &self.transform)
            .field("range", &self.range)
            .finish()
    }
}

impl Axis {
    #[must_use]
    pub fn new(dimension: Dimension) -> Self {
        Self {
            dimension,
            policy: Box::new(Unbounded),
            formatter: Box::new(NumberFormatter::default()),
            ticks: TickGenerator::default(),
            transform: TransformKind::Linear,
            range: Range::ZERO,
            transform_warning: RateLimitedWarning::new(TRANSFORM_WARNING_WINDOW),
        }
    }

    #[must_use]
    pub fn dimension(&self) -> Dimension {
        self.dimension
    }

    #[must_use]
    pub fn range_policy(&self) -> &dyn RangePolicy {
        self.policy.as_ref()
    }

    /// Replaces the range policy.
    ///
    /// An unconfigured replacement inherits the configured range of the
    /// policy it replaces.
    pub fn set_range_policy(&mut self, mut policy: Box<dyn RangePolicy>) {
        if !policy.is_configured() && self.policy.is_configured() {
            policy.set_configured_range(self.policy.configured_range());
        }
        self.policy = policy;
    }

    #[must_use]
    pub fn formatter(&self) -> &dyn LabelFormatter {
        self.formatter.as_ref()
    }

    pub fn set_formatter(&mut self, formatter: Box<dyn LabelFormatter>) {
        self.formatter = formatter;
    }

    #[must_use]
    pub fn tick_generator(&self) -> &TickGenerator {
        &self.ticks
    }

    pub fn set_major_tick_spacing(&mut self, spacing: f64) -> ChartResult<()> {
        self.ticks.set_major_spacing(spacing)
    }

    pub fn set_minor_tick_spacing(&mut self, spacing: f64) -> ChartResult<()> {
        self.ticks.set_minor_spacing(spacing)
    }

    pub fn set_start_major_tick(&mut self, start_major_tick: bool) {
        self.ticks.set_start_major_tick(start_major_tick);
    }

    #[must_use]
    pub fn transform(&self) -> TransformKind {
        self.transform
    }

    pub fn set_transform(&mut self, transform: TransformKind) {
        self.transform = transform;
    }

    /// Raw visible range resolved by the most recent render pass.
    #[must_use]
    pub fn range(&self) -> Range {
        self.range
    }

    /// Visible range the current policy derives from raw data bounds.
    #[must_use]
    pub fn resolve_range(&self, data: Range) -> Range {
        self.policy.resolve(data)
    }

    /// Stores a newly resolved range; returns `true` when it moved.
    pub(crate) fn set_range(&mut self, range: Range) -> bool {
        let moved = !self.range.same_bits(range);
        self.range = range;
        moved
    }

    /// Normalized position of `value` within the current range.
    ///
    /// Values the transform cannot map scale to `0.0`; the failure is
    /// reported through a rate-limited warning.
    pub fn scale(&self, value: f64) -> f64 {
        match self.transform.normalize(value, self.range) {
            Ok(scaled) => scaled,
            Err(err) => {
                if let Some(suppressed) = self.transform_warning.check(Instant::now()) {
                    warn!(
                        axis = ?self.dimension,
                        error = %err,
                        suppressed,
                        "axis transform failed; scaled coordinate set to 0"
                    );
                }
                0.0
            }
        }
    }

    /// Minimum value distance between two labels so they do not overlap.
    ///
    /// Horizontal labels need their formatted width, vertical ones a line of
    /// text. Call after the formatter was initialized for the pass.
    #[must_use]
    pub fn label_resolution(&self, viewport: Viewport, metrics: &dyn FontMetrics) -> f64 {
        let span = viewport.span_px(self.dimension);
        if !(span > 0.0) {
            return 0.0;
        }
        let label_px = match self.dimension {
            Dimension::X => {
                let chars = self.formatter.max_amount_chars().max(1) + 1;
                chars as f64 * metrics.char_width('0')
            }
            Dimension::Y => metrics.line_height(),
        };
        label_px / span * self.range.safe_extent()
    }

    /// Labeled ticks for the current range and viewport.
    pub fn ticks(&mut self, viewport: Viewport, metrics: &dyn FontMetrics) -> Vec<TickLabel> {
        let range = self.range;
        self.formatter.init_paint_iteration(range);
        let resolution = self.label_resolution(viewport, metrics);
        let pass = self.ticks.begin_pass(range);
        let labels = pass.labels(resolution, self.formatter.as_ref());
        let transform = self.transform;
        if transform.is_linear() {
            return labels.collect();
        }
        labels
            .filter_map(|label| {
                let normalized = transform.normalize(label.value, range).ok()?;
                Some(TickLabel {
                    normalized,
                    ..label
                })
            })
            .collect()
    }
}
