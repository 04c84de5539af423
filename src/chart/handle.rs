use std::collections::VecDeque;
use std::fmt;
use std::ops::Deref;
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, MutexGuard, RwLock};
use tracing::{error, trace};

use crate::chart::{ChartShared, RenderGuard};
use crate::core::{
    BoundsTracker, ChangeKind, ChartId, DataPoint, PendingChange, PointId, Series, SeriesId,
    SeriesListener, SeriesMutation,
};
use crate::error::{ChartError, ChartResult};

pub(crate) struct SeriesShared {
    id: SeriesId,
    pub(crate) series: Mutex<Series>,
    /// Back-reference to the attached chart; written only under `series`.
    pub(crate) chart: RwLock<Option<Weak<ChartShared>>>,
}

/// Shared, thread-safe handle to a series.
///
/// Mutations through the handle take the attached chart's renderer lock,
/// then the series lock, and queue the change for the next render pass.
/// A detached series only takes its own lock.
#[derive(Clone)]
pub struct SeriesHandle {
    pub(crate) inner: Arc<SeriesShared>,
}

impl fmt::Debug for SeriesHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SeriesHandle")
            .field("id", &self.inner.id)
            .field("chart", &self.attached_chart())
            .finish()
    }
}

impl SeriesHandle {
    pub(crate) fn new(series: Series) -> Self {
        Self {
            inner: Arc::new(SeriesShared {
                id: series.id(),
                series: Mutex::new(series),
                chart: RwLock::new(None),
            }),
        }
    }

    #[must_use]
    pub fn id(&self) -> SeriesId {
        self.inner.id
    }

    pub(crate) fn same_series(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn attached_shared(&self) -> Option<Arc<ChartShared>> {
        self.inner.chart.read().as_ref().and_then(Weak::upgrade)
    }

    /// Chart this series is currently attached to, if it is still alive.
    #[must_use]
    pub fn attached_chart(&self) -> Option<ChartId> {
        self.attached_shared().map(|chart| chart.id)
    }

    /// Locks the series under an already held renderer lock.
    ///
    /// Fails with [`ChartError::ThreadSafetyViolation`] when `guard` belongs
    /// to a chart other than the one this series is attached to.
    pub fn lock<'g>(&'g self, guard: &'g mut RenderGuard<'_>) -> ChartResult<SeriesGuard<'g>> {
        let registered = guard
            .state
            .series
            .get(&self.inner.id)
            .is_some_and(|handle| handle.same_series(self));
        if !registered {
            return Err(match self.attached_chart() {
                Some(owner) => {
                    error!(
                        series = ?self.inner.id,
                        owner = ?owner,
                        guard = ?guard.chart,
                        "series locked under the renderer lock of another chart"
                    );
                    ChartError::ThreadSafetyViolation(format!(
                        "series {:?} is attached to chart {:?} but was locked under chart {:?}",
                        self.inner.id, owner, guard.chart
                    ))
                }
                None => ChartError::SeriesNotAttached(self.inner.id),
            });
        }
        Ok(SeriesGuard {
            series: self.inner.series.lock(),
            pending: Some(&mut guard.state.pending),
        })
    }

    /// Runs `op` under the correct lock pair for the current attachment.
    fn mutate<T>(&self, op: impl FnOnce(&mut SeriesGuard<'_>) -> ChartResult<T>) -> ChartResult<T> {
        loop {
            if let Some(chart) = self.attached_shared() {
                let mut render = RenderGuard::acquire(&chart);
                let registered = render
                    .state
                    .series
                    .get(&self.inner.id)
                    .is_some_and(|handle| handle.same_series(self));
                if !registered {
                    // Detached while the renderer lock was being acquired.
                    continue;
                }
                let mut guard = self.lock(&mut render)?;
                return op(&mut guard);
            }

            let series = self.inner.series.lock();
            let attached = self
                .inner
                .chart
                .read()
                .as_ref()
                .is_some_and(|chart| chart.strong_count() > 0);
            if attached {
                // Attached while the series lock was being acquired.
                continue;
            }
            let mut guard = SeriesGuard {
                series,
                pending: None,
            };
            return op(&mut guard);
        }
    }

    /// Adds a sample and returns the identity of the stored point.
    pub fn add_point(&self, data: DataPoint) -> ChartResult<PointId> {
        self.mutate(|guard| guard.add_point(data))
    }

    /// Removes a point; returns `false` when the series does not contain it.
    pub fn remove_point(&self, id: PointId) -> ChartResult<bool> {
        self.mutate(|guard| Ok(guard.remove_point(id)))
    }

    /// Moves a point; returns `false` when the series does not contain it.
    pub fn update_point(&self, id: PointId, data: DataPoint) -> ChartResult<bool> {
        self.mutate(|guard| guard.update_point(id, data))
    }

    /// Removes every point; returns the number removed.
    pub fn clear(&self) -> ChartResult<usize> {
        self.mutate(|guard| Ok(guard.clear()))
    }

    pub fn set_visible(&self, visible: bool) -> ChartResult<()> {
        self.mutate(|guard| {
            guard.set_visible(visible);
            Ok(())
        })
    }

    pub fn add_listener(&self, listener: Box<dyn SeriesListener>) -> ChartResult<()> {
        self.mutate(|guard| {
            guard.add_listener(listener);
            Ok(())
        })
    }

    /// Reads the series under its own lock.
    pub fn read<R>(&self, f: impl FnOnce(&Series) -> R) -> R {
        f(&self.inner.series.lock())
    }

    #[must_use]
    pub fn bounds(&self) -> BoundsTracker {
        self.read(Series::bounds)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.read(Series::len)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read(Series::is_empty)
    }
}

/// Series lock held under a renderer lock (or alone for a detached series).
///
/// Dereferences to the series for reads; mutations go through the guard so
/// their changes reach the pending queue.
pub struct SeriesGuard<'g> {
    series: MutexGuard<'g, Series>,
    pending: Option<&'g mut VecDeque<PendingChange>>,
}

impl Deref for SeriesGuard<'_> {
    type Target = Series;

    fn deref(&self) -> &Series {
        &self.series
    }
}

impl SeriesGuard<'_> {
    fn enqueue(&mut self, mutation: &SeriesMutation) {
        if let Some(pending) = self.pending.as_deref_mut() {
            pending.extend(mutation.changes.iter().copied());
            trace!(
                series = ?self.series.id(),
                queued = mutation.changes.len(),
                depth = pending.len(),
                "queued pending changes"
            );
        }
    }

    pub fn add_point(&mut self, data: DataPoint) -> ChartResult<PointId> {
        let mutation = self.series.add(data)?;
        self.enqueue(&mutation);
        mutation.point().ok_or_else(|| {
            ChartError::InvalidData("add produced no point identity".to_owned())
        })
    }

    pub fn remove_point(&mut self, id: PointId) -> bool {
        match self.series.remove(id) {
            Some(mutation) => {
                self.enqueue(&mutation);
                true
            }
            None => false,
        }
    }

    pub fn update_point(&mut self, id: PointId, data: DataPoint) -> ChartResult<bool> {
        match self.series.update(id, data)? {
            Some(mutation) => {
                self.enqueue(&mutation);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn clear(&mut self) -> usize {
        let mutation = self.series.clear();
        self.enqueue(&mutation);
        mutation.changes.len()
    }

    /// Changes visibility; a series becoming visible has all points rescaled.
    pub fn set_visible(&mut self, visible: bool) {
        if self.series.is_visible() == visible {
            return;
        }
        self.series.set_visible(visible);
        if !visible {
            return;
        }
        let series = self.series.id();
        let changes: Vec<PendingChange> = self
            .series
            .points()
            .map(|point| PendingChange {
                series,
                point: point.id,
                kind: ChangeKind::Modified,
            })
            .collect();
        if let Some(pending) = self.pending.as_deref_mut() {
            pending.extend(changes);
        }
    }

    pub fn add_listener(&mut self, listener: Box<dyn SeriesListener>) {
        self.series.add_listener(listener);
    }
}
