//! livechart: real-time 2D chart data engine.
//!
//! Producer threads mutate series through [`SeriesHandle`]s while a render
//! pass (driven manually or by a [`RenderScheduler`]) drains queued changes,
//! resolves visible ranges, rescales points to `[0, 1]` plot coordinates and
//! emits labeled axis ticks in a [`RenderFrame`]. Painting stays with the
//! host through the [`Renderer`] and [`FontMetrics`] traits.

pub mod axis;
pub mod chart;
pub mod core;
pub mod error;
pub mod format;
pub mod render;
pub mod telemetry;

pub use axis::{Axis, AxisConfig, TickLabel, TickSpacing};
pub use chart::{
    Chart, ChartConfig, ChartContext, RenderGuard, RenderScheduler, SchedulerTuning, SeriesGuard,
    SeriesHandle,
};
pub use error::{ChartError, ChartResult};
pub use render::{FixedFontMetrics, FontMetrics, NullRenderer, RenderFrame, Renderer};
