//! Chart coordination: renderer lock, pending-change queue and render passes.
//!
//! Lock order is renderer lock first, series lock second. The order is
//! enforced by types: a [`SeriesGuard`] can only be obtained from a
//! [`RenderGuard`] of the chart the series is attached to.

mod config;
mod context;
mod handle;
mod scheduler;

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::{Mutex, MutexGuard};
use smallvec::SmallVec;
use tracing::debug;

pub use config::{ChartConfig, SchedulerTuning};
pub use context::ChartContext;
pub use handle::{SeriesGuard, SeriesHandle};
pub use scheduler::RenderScheduler;

use crate::axis::{Axis, AxisConfig};
use crate::core::{
    ChangeKind, ChartId, Dimension, PendingChange, Point, PointId, Range, Series, SeriesId,
    Viewport,
};
use crate::error::{ChartError, ChartResult};
use crate::render::{FontMetrics, RenderFrame, Renderer, ScaledPoint, SeriesFrame};

/// Changed points of one series, batched per pass.
type PointBatch = SmallVec<[PointId; 8]>;

pub(crate) struct ChartShared {
    pub(crate) id: ChartId,
    state: Mutex<RenderState>,
    scheduler: SchedulerTuning,
}

pub(crate) struct RenderState {
    viewport: Viewport,
    x_axis: Axis,
    y_axis: Axis,
    pub(crate) series: IndexMap<SeriesId, SeriesHandle>,
    pub(crate) pending: VecDeque<PendingChange>,
    pass: u64,
    /// Set by axis reconfiguration; forces a full rescale on the next pass.
    rescale_all: bool,
}

/// Live chart: attached series, two axes and the renderer-level lock.
///
/// Cloning yields another handle to the same chart.
#[derive(Clone)]
pub struct Chart {
    shared: Arc<ChartShared>,
}

impl fmt::Debug for Chart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chart").field("id", &self.shared.id).finish()
    }
}

impl Chart {
    pub(crate) fn new(id: ChartId, config: &ChartConfig) -> ChartResult<Self> {
        if !config.viewport.is_valid() {
            return Err(ChartError::InvalidViewport {
                width: config.viewport.width,
                height: config.viewport.height,
            });
        }
        let scheduler = config.scheduler.validate()?;
        let state = RenderState {
            viewport: config.viewport,
            x_axis: config.x_axis.build(Dimension::X)?,
            y_axis: config.y_axis.build(Dimension::Y)?,
            series: IndexMap::new(),
            pending: VecDeque::new(),
            pass: 0,
            rescale_all: false,
        };
        Ok(Self {
            shared: Arc::new(ChartShared {
                id,
                state: Mutex::new(state),
                scheduler,
            }),
        })
    }

    #[must_use]
    pub fn id(&self) -> ChartId {
        self.shared.id
    }

    #[must_use]
    pub fn scheduler_tuning(&self) -> SchedulerTuning {
        self.shared.scheduler
    }

    /// Takes the renderer-level lock.
    ///
    /// While the guard is held, mutating an attached series through its
    /// [`SeriesHandle`] on the same thread deadlocks; use
    /// [`SeriesHandle::lock`] with this guard instead.
    pub fn lock(&self) -> RenderGuard<'_> {
        RenderGuard::acquire(&self.shared)
    }

    /// Attaches a series; its current points are queued for scaling.
    pub fn attach(&self, series: &SeriesHandle) -> ChartResult<()> {
        let id = series.id();
        let mut render = self.lock();
        if let Some(existing) = render.state.series.get(&id) {
            if existing.same_series(series) {
                return Ok(());
            }
            return Err(ChartError::InvalidConfiguration(format!(
                "series id {id:?} is already used by another series of this chart"
            )));
        }

        let locked = series.inner.series.lock();
        {
            let mut attached = series.inner.chart.write();
            if attached.as_ref().and_then(Weak::upgrade).is_some() {
                return Err(ChartError::SeriesAlreadyAttached(id));
            }
            *attached = Some(Arc::downgrade(&self.shared));
        }
        render.state.pending.extend(locked.points().map(|point| PendingChange {
            series: id,
            point: point.id,
            kind: ChangeKind::Added,
        }));
        let points = locked.len();
        drop(locked);

        render.state.series.insert(id, series.clone());
        debug!(chart = ?self.shared.id, series = ?id, points, "attached series");
        Ok(())
    }

    /// Detaches a series; its queued changes are dropped.
    pub fn detach(&self, series: &SeriesHandle) -> ChartResult<()> {
        let id = series.id();
        let mut render = self.lock();
        let registered = render
            .state
            .series
            .get(&id)
            .is_some_and(|handle| handle.same_series(series));
        if !registered {
            return Err(ChartError::UnknownSeries(id));
        }
        render.state.series.shift_remove(&id);
        {
            let _locked = series.inner.series.lock();
            *series.inner.chart.write() = None;
        }
        render.state.pending.retain(|change| change.series != id);
        debug!(chart = ?self.shared.id, series = ?id, "detached series");
        Ok(())
    }

    #[must_use]
    pub fn series_ids(&self) -> Vec<SeriesId> {
        self.lock().series_ids()
    }

    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.lock().pending_len()
    }

    #[must_use]
    pub fn viewport(&self) -> Viewport {
        self.lock().viewport()
    }

    pub fn set_viewport(&self, viewport: Viewport) -> ChartResult<()> {
        self.lock().set_viewport(viewport)
    }

    /// Raw visible range of an axis as of the last render pass.
    #[must_use]
    pub fn axis_range(&self, dimension: Dimension) -> Range {
        self.lock().axis(dimension).range()
    }

    /// Reconfigures an axis; takes effect on the next render pass.
    pub fn configure_axis<R>(&self, dimension: Dimension, f: impl FnOnce(&mut Axis) -> R) -> R {
        f(self.lock().axis_mut(dimension))
    }

    /// Replaces an axis from configuration, keeping its current range.
    pub fn apply_axis_config(&self, dimension: Dimension, config: &AxisConfig) -> ChartResult<()> {
        let mut axis = config.build(dimension)?;
        let mut render = self.lock();
        let current = render.axis_mut(dimension);
        axis.set_range(current.range());
        *current = axis;
        Ok(())
    }

    /// Runs one render pass and returns its frame.
    pub fn render_pass(&self, metrics: &dyn FontMetrics) -> RenderFrame {
        self.lock().render_pass(metrics)
    }

    /// Runs one render pass and hands the frame to `renderer`.
    pub fn render(
        &self,
        renderer: &mut dyn Renderer,
        metrics: &dyn FontMetrics,
    ) -> ChartResult<RenderFrame> {
        let frame = self.render_pass(metrics);
        renderer.render(&frame)?;
        Ok(frame)
    }
}

/// Held renderer-level lock of one chart.
pub struct RenderGuard<'a> {
    pub(crate) chart: ChartId,
    pub(crate) state: MutexGuard<'a, RenderState>,
}

impl<'a> RenderGuard<'a> {
    pub(crate) fn acquire(shared: &'a ChartShared) -> Self {
        Self {
            chart: shared.id,
            state: shared.state.lock(),
        }
    }

    #[must_use]
    pub fn chart_id(&self) -> ChartId {
        self.chart
    }

    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.state.pending.len()
    }

    #[must_use]
    pub fn series_ids(&self) -> Vec<SeriesId> {
        self.state.series.keys().copied().collect()
    }

    #[must_use]
    pub fn viewport(&self) -> Viewport {
        self.state.viewport
    }

    pub fn set_viewport(&mut self, viewport: Viewport) -> ChartResult<()> {
        if !viewport.is_valid() {
            return Err(ChartError::InvalidViewport {
                width: viewport.width,
                height: viewport.height,
            });
        }
        self.state.viewport = viewport;
        Ok(())
    }

    #[must_use]
    pub fn axis(&self, dimension: Dimension) -> &Axis {
        match dimension {
            Dimension::X => &self.state.x_axis,
            Dimension::Y => &self.state.y_axis,
        }
    }

    /// Mutable axis access; every point is rescaled on the next pass.
    pub fn axis_mut(&mut self, dimension: Dimension) -> &mut Axis {
        let state = &mut *self.state;
        state.rescale_all = true;
        match dimension {
            Dimension::X => &mut state.x_axis,
            Dimension::Y => &mut state.y_axis,
        }
    }

    /// Drains the pending queue, rescales and builds a frame, all under this lock.
    pub fn render_pass(&mut self, metrics: &dyn FontMetrics) -> RenderFrame {
        let chart = self.chart;
        self.state.render_pass(chart, metrics)
    }
}

impl RenderState {
    fn render_pass(&mut self, chart: ChartId, metrics: &dyn FontMetrics) -> RenderFrame {
        self.pass += 1;
        let drained = self.pending.len();
        let batches = self.drain_pending();
        for (series_id, points) in &batches {
            let Some(handle) = self.series.get(series_id) else {
                continue;
            };
            let mut series = handle.inner.series.lock();
            for id in points {
                if let Some(point) = series.point_mut(*id) {
                    rescale_point(point, &self.x_axis, &self.y_axis);
                }
            }
        }

        let (x_data, y_data) = self.aggregate_bounds();
        let x_range = self.x_axis.resolve_range(x_data);
        let y_range = self.y_axis.resolve_range(y_data);
        let x_moved = self.x_axis.set_range(x_range);
        let y_moved = self.y_axis.set_range(y_range);
        let forced = std::mem::take(&mut self.rescale_all);
        let rescaled_all = x_moved || y_moved || forced;
        if rescaled_all {
            rescale_all(&self.series, &self.x_axis, &self.y_axis);
        }

        let frame = self.build_frame(chart, metrics);
        debug!(
            chart = ?chart,
            pass = self.pass,
            drained,
            rescaled_all,
            points = frame.point_count(),
            ticks = frame.tick_count(),
            "render pass"
        );
        frame
    }

    fn drain_pending(&mut self) -> IndexMap<SeriesId, PointBatch> {
        let mut batches: IndexMap<SeriesId, PointBatch> = IndexMap::new();
        for change in self.pending.drain(..) {
            if change.kind == ChangeKind::Removed {
                continue;
            }
            batches.entry(change.series).or_default().push(change.point);
        }
        batches
    }

    /// Union of raw bounds over visible, non-empty series.
    fn aggregate_bounds(&self) -> (Range, Range) {
        let mut x: Option<Range> = None;
        let mut y: Option<Range> = None;
        for handle in self.series.values() {
            let series = handle.inner.series.lock();
            if !series.is_visible() || series.is_empty() {
                continue;
            }
            let (series_x, series_y) = (series.x_range(), series.y_range());
            x = Some(x.map_or(series_x, |range| range.union(series_x)));
            y = Some(y.map_or(series_y, |range| range.union(series_y)));
        }
        (x.unwrap_or(Range::ZERO), y.unwrap_or(Range::ZERO))
    }

    fn build_frame(&mut self, chart: ChartId, metrics: &dyn FontMetrics) -> RenderFrame {
        let mut frame = RenderFrame::new(chart, self.pass, self.viewport);
        frame.x_range = self.x_axis.range();
        frame.y_range = self.y_axis.range();
        frame.x_ticks = self.x_axis.ticks(self.viewport, metrics);
        frame.y_ticks = self.y_axis.ticks(self.viewport, metrics);
        frame.series = self
            .series
            .values()
            .filter_map(|handle| {
                let series = handle.inner.series.lock();
                series.is_visible().then(|| SeriesFrame {
                    id: series.id(),
                    name: series.name().to_owned(),
                    points: series
                        .points()
                        .map(|point| ScaledPoint {
                            id: point.id,
                            x: point.scaled_x,
                            y: point.scaled_y,
                        })
                        .collect(),
                })
            })
            .collect();
        frame
    }
}

fn rescale_point(point: &mut Point, x_axis: &Axis, y_axis: &Axis) {
    point.set_scaled(Dimension::X, x_axis.scale(point.x));
    point.set_scaled(Dimension::Y, y_axis.scale(point.y));
}

fn rescale_series(series: &mut Series, x_axis: &Axis, y_axis: &Axis) {
    for point in series.points_mut() {
        rescale_point(point, x_axis, y_axis);
    }
}

#[cfg(not(feature = "parallel-rescale"))]
fn rescale_all(series: &IndexMap<SeriesId, SeriesHandle>, x_axis: &Axis, y_axis: &Axis) {
    for handle in series.values() {
        rescale_series(&mut handle.inner.series.lock(), x_axis, y_axis);
    }
}

#[cfg(feature = "parallel-rescale")]
fn rescale_all(series: &IndexMap<SeriesId, SeriesHandle>, x_axis: &Axis, y_axis: &Axis) {
    use rayon::prelude::*;

    let handles: Vec<&SeriesHandle> = series.values().collect();
    handles.par_iter().for_each(|handle| {
        rescale_series(&mut handle.inner.series.lock(), x_axis, y_axis);
    });
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::{ChartConfig, ChartContext};
    use crate::core::{
        DataPoint, Dimension, MinimumViewport, Range, RangePolicy, RangePolicyConfig,
        StorageKind, TransformKind,
    };
    use crate::error::ChartError;
    use crate::format::{AutoUnitFormatter, NumberFormatter};
    use crate::render::{FixedFontMetrics, NullRenderer};

    /// Policy open towards one side, as a host-defined policy may be.
    #[derive(Debug)]
    struct OpenEnded {
        min: f64,
        max: f64,
    }

    impl RangePolicy for OpenEnded {
        fn max(&self, _data_min: f64, _data_max: f64) -> f64 {
            self.max
        }

        fn min(&self, _data_min: f64, _data_max: f64) -> f64 {
            self.min
        }

        fn configured_range(&self) -> Range {
            Range::UNBOUNDED
        }

        fn set_configured_range(&mut self, _range: Range) {}

        fn config(&self) -> RangePolicyConfig {
            RangePolicyConfig::Unbounded
        }
    }

    fn setup() -> (ChartContext, super::Chart, super::SeriesHandle) {
        let context = ChartContext::new();
        let chart = context.create_chart(&ChartConfig::default()).expect("chart");
        let series = context
            .create_series("latency", StorageKind::InsertionOrder)
            .expect("series");
        chart.attach(&series).expect("attach");
        (context, chart, series)
    }

    #[test]
    fn render_pass_scales_points_into_unit_square() {
        let (_context, chart, series) = setup();
        series.add_point(DataPoint::new(0.0, 10.0)).expect("add");
        series.add_point(DataPoint::new(5.0, 20.0)).expect("add");
        series.add_point(DataPoint::new(10.0, 30.0)).expect("add");
        assert_eq!(chart.pending_len(), 3);

        let frame = chart.render_pass(&FixedFontMetrics::default());
        assert_eq!(chart.pending_len(), 0);
        assert_eq!(frame.x_range, Range::new(0.0, 10.0).expect("range"));
        assert_eq!(frame.y_range, Range::new(10.0, 30.0).expect("range"));

        let points = &frame.series[0].points;
        assert_relative_eq!(points[1].x, 0.5);
        assert_relative_eq!(points[1].y, 0.5);
        assert_relative_eq!(points[2].x, 1.0);
        assert!(!frame.x_ticks.is_empty());
        assert!(!frame.y_ticks.is_empty());
    }

    #[test]
    fn changed_point_within_range_is_rescaled_alone() {
        let (_context, chart, series) = setup();
        let first = series.add_point(DataPoint::new(0.0, 0.0)).expect("add");
        series.add_point(DataPoint::new(10.0, 10.0)).expect("add");
        chart.render_pass(&FixedFontMetrics::default());

        series
            .update_point(first, DataPoint::new(5.0, 5.0))
            .expect("update");
        series.add_point(DataPoint::new(0.0, 0.0)).expect("add");
        let frame = chart.render_pass(&FixedFontMetrics::default());
        let moved = frame.series[0]
            .points
            .iter()
            .find(|point| point.id == first)
            .expect("point");
        assert_relative_eq!(moved.x, 0.5);
        assert_relative_eq!(moved.y, 0.5);
    }

    #[test]
    fn guard_of_other_chart_is_a_violation() {
        let (context, _chart, series) = setup();
        let other = context.create_chart(&ChartConfig::default()).expect("chart");
        let mut guard = other.lock();
        assert!(matches!(
            series.lock(&mut guard),
            Err(ChartError::ThreadSafetyViolation(_))
        ));
    }

    #[test]
    fn guard_batches_mutations_under_one_lock() {
        let (_context, chart, series) = setup();
        {
            let mut render = chart.lock();
            let mut guard = series.lock(&mut render).expect("lock");
            guard.add_point(DataPoint::new(1.0, 1.0)).expect("add");
            guard.add_point(DataPoint::new(2.0, 4.0)).expect("add");
            assert_eq!(guard.len(), 2);
        }
        assert_eq!(chart.pending_len(), 2);
    }

    #[test]
    fn series_attaches_to_one_chart_at_a_time() {
        let (context, chart, series) = setup();
        let other = context.create_chart(&ChartConfig::default()).expect("chart");
        assert!(matches!(
            other.attach(&series),
            Err(ChartError::SeriesAlreadyAttached(_))
        ));

        chart.detach(&series).expect("detach");
        assert_eq!(series.attached_chart(), None);
        series.add_point(DataPoint::new(3.0, 3.0)).expect("detached add");
        assert_eq!(chart.pending_len(), 0);

        other.attach(&series).expect("attach");
        assert_eq!(series.attached_chart(), Some(other.id()));
        assert_eq!(other.pending_len(), 1);
        assert!(matches!(
            chart.detach(&series),
            Err(ChartError::UnknownSeries(_))
        ));
    }

    #[test]
    fn hidden_series_do_not_contribute_bounds() {
        let (context, chart, series) = setup();
        let hidden = context
            .create_series("hidden", StorageKind::InsertionOrder)
            .expect("series");
        chart.attach(&hidden).expect("attach");
        series.add_point(DataPoint::new(0.0, 0.0)).expect("add");
        series.add_point(DataPoint::new(1.0, 1.0)).expect("add");
        hidden.add_point(DataPoint::new(100.0, 100.0)).expect("add");
        hidden.set_visible(false).expect("hide");

        let frame = chart.render_pass(&FixedFontMetrics::default());
        assert_eq!(frame.x_range, Range::new(0.0, 1.0).expect("range"));
        assert_eq!(frame.series.len(), 1);
    }

    #[test]
    fn log_axis_zeroes_unmappable_points() {
        let (_context, chart, series) = setup();
        chart.configure_axis(Dimension::Y, |axis| axis.set_transform(TransformKind::Log10));
        series.add_point(DataPoint::new(0.0, 1.0)).expect("add");
        series.add_point(DataPoint::new(1.0, 100.0)).expect("add");
        series.add_point(DataPoint::new(2.0, -5.0)).expect("add");

        let frame = chart.render_pass(&FixedFontMetrics::default());
        let ys: Vec<f64> = frame.series[0].points.iter().map(|point| point.y).collect();
        assert_eq!(ys[2], 0.0);
        assert!(ys.iter().all(|y| y.is_finite()));
    }

    #[test]
    fn axis_policy_applies_on_next_pass() {
        let (_context, chart, series) = setup();
        series.add_point(DataPoint::new(20.0, 20.0)).expect("add");
        series.add_point(DataPoint::new(80.0, 80.0)).expect("add");
        chart.configure_axis(Dimension::Y, |axis| {
            axis.set_range_policy(Box::new(
                MinimumViewport::new(Range::new(0.0, 100.0).expect("range")).expect("viewport"),
            ));
        });
        let mut renderer = NullRenderer::default();
        let frame = chart
            .render(&mut renderer, &FixedFontMetrics::default())
            .expect("render");
        assert_eq!(frame.y_range, Range::new(0.0, 100.0).expect("range"));
        assert_relative_eq!(frame.series[0].points[0].y, 0.2);
        assert_eq!(renderer.frames_rendered, 1);
    }

    #[test]
    fn half_infinite_range_zeroes_coordinates_without_failing() {
        let (_context, chart, series) = setup();
        series.add_point(DataPoint::new(0.0, 1.0)).expect("add");
        series.add_point(DataPoint::new(1.0, 5.0)).expect("add");
        chart.configure_axis(Dimension::Y, |axis| {
            axis.set_range_policy(Box::new(OpenEnded {
                min: f64::NEG_INFINITY,
                max: 10.0,
            }));
        });

        let mut renderer = NullRenderer::default();
        let frame = chart
            .render(&mut renderer, &FixedFontMetrics::default())
            .expect("render");
        assert_eq!(frame.y_range.min(), f64::NEG_INFINITY);
        assert!(frame.series[0].points.iter().all(|point| point.y == 0.0));
        assert!(frame.y_ticks.is_empty());
        assert!(frame.validate().is_ok());
        assert_eq!(renderer.frames_rendered, 1);
    }

    #[test]
    fn auto_units_survive_an_infinite_range() {
        let (_context, chart, series) = setup();
        series.add_point(DataPoint::new(0.0, 1.0)).expect("add");
        chart.configure_axis(Dimension::Y, |axis| {
            axis.set_formatter(Box::new(AutoUnitFormatter::new(NumberFormatter::default())));
            axis.set_range_policy(Box::new(OpenEnded {
                min: 0.0,
                max: f64::INFINITY,
            }));
        });

        let mut renderer = NullRenderer::default();
        let frame = chart
            .render(&mut renderer, &FixedFontMetrics::default())
            .expect("render");
        assert_eq!(frame.y_range.max(), f64::INFINITY);
        assert_eq!(frame.series[0].points[0].y, 0.0);
        assert!(frame.y_ticks.is_empty());
    }
}
