use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::trace;

use crate::core::{
    BoundsChange, BoundsTracker, DataPoint, Point, PointId, PointStorage, Range, SeriesId,
    StorageKind,
};
use crate::error::ChartResult;

/// Kind of structural change recorded for the next render pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeKind {
    Added,
    Removed,
    Modified,
}

/// Mutation record queued until a render pass rescales the point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PendingChange {
    pub series: SeriesId,
    pub point: PointId,
    pub kind: ChangeKind,
}

/// Observer notified synchronously, under the series lock, of series changes.
pub trait SeriesListener: Send {
    fn on_bounds_changed(&mut self, series: SeriesId, change: BoundsChange, bounds: BoundsTracker);

    fn on_point_changed(&mut self, _change: PendingChange) {}
}

/// Outcome of one series mutation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeriesMutation {
    pub changes: SmallVec<[PendingChange; 2]>,
    pub bounds: BoundsChange,
}

impl SeriesMutation {
    /// Identity of the point added or updated by the mutation, if any.
    #[must_use]
    pub fn point(&self) -> Option<PointId> {
        self.changes
            .iter()
            .find(|change| change.kind != ChangeKind::Removed)
            .map(|change| change.point)
    }
}

/// Named collection of points with cached aggregate bounds.
///
/// `Series` itself is not synchronized; concurrent use goes through
/// [`SeriesHandle`](crate::chart::SeriesHandle).
pub struct Series {
    id: SeriesId,
    name: String,
    storage: Box<dyn PointStorage>,
    bounds: BoundsTracker,
    visible: bool,
    next_point_id: u64,
    listeners: Vec<Box<dyn SeriesListener>>,
}

impl fmt::Debug for Series {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Series")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("storage", &self.storage.kind())
            .field("len", &self.storage.len())
            .field("bounds", &self.bounds)
            .field("visible", &self.visible)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Series {
    pub fn new(id: SeriesId, name: impl Into<String>, storage: StorageKind) -> ChartResult<Self> {
        Ok(Self::with_storage(id, name, storage.build()?))
    }

    #[must_use]
    pub fn with_storage(
        id: SeriesId,
        name: impl Into<String>,
        storage: Box<dyn PointStorage>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            storage,
            bounds: BoundsTracker::new(),
            visible: true,
            next_point_id: 0,
            listeners: Vec::new(),
        }
    }

    #[must_use]
    pub fn id(&self) -> SeriesId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    #[must_use]
    pub fn storage_kind(&self) -> StorageKind {
        self.storage.kind()
    }

    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// `true` until the first point is added (and again after [`Series::clear`]).
    #[must_use]
    pub fn is_first_time(&self) -> bool {
        self.bounds.is_empty()
    }

    #[must_use]
    pub fn bounds(&self) -> BoundsTracker {
        self.bounds
    }

    #[must_use]
    pub fn min_x(&self) -> f64 {
        self.bounds.min_x()
    }

    #[must_use]
    pub fn max_x(&self) -> f64 {
        self.bounds.max_x()
    }

    #[must_use]
    pub fn min_y(&self) -> f64 {
        self.bounds.min_y()
    }

    #[must_use]
    pub fn max_y(&self) -> f64 {
        self.bounds.max_y()
    }

    #[must_use]
    pub fn x_range(&self) -> Range {
        self.bounds.x_range()
    }

    #[must_use]
    pub fn y_range(&self) -> Range {
        self.bounds.y_range()
    }

    #[must_use]
    pub fn point(&self, id: PointId) -> Option<&Point> {
        self.storage.get(id)
    }

    pub fn points(&self) -> impl Iterator<Item = &Point> + '_ {
        self.storage.iter()
    }

    pub(crate) fn point_mut(&mut self, id: PointId) -> Option<&mut Point> {
        self.storage.get_mut(id)
    }

    pub(crate) fn points_mut(&mut self) -> impl Iterator<Item = &mut Point> + '_ {
        self.storage.iter_mut()
    }

    pub fn add_listener(&mut self, listener: Box<dyn SeriesListener>) {
        self.listeners.push(listener);
    }

    /// Adds a sample and repairs the cached bounds before returning.
    pub fn add(&mut self, data: DataPoint) -> ChartResult<SeriesMutation> {
        let data = data.validate()?;
        let id = PointId(self.next_point_id);
        self.next_point_id += 1;

        let mut mutation = SeriesMutation::default();
        let displaced = self.storage.insert(Point::new(id, self.id, data));
        mutation.bounds = self.bounds.on_add(data);
        for old in displaced {
            mutation.bounds = mutation
                .bounds
                .union(self.bounds.on_remove(old.data(), self.storage.iter().map(Point::data)));
            mutation.changes.push(self.change(old.id, ChangeKind::Removed));
        }
        mutation.changes.push(self.change(id, ChangeKind::Added));
        trace!(series = ?self.id, point = ?id, x = data.x, y = data.y, "add point");
        self.notify(&mutation);
        Ok(mutation)
    }

    /// Removes a point; `None` when the series does not contain it.
    pub fn remove(&mut self, id: PointId) -> Option<SeriesMutation> {
        let removed = self.storage.remove(id)?;
        let mut mutation = SeriesMutation::default();
        mutation.bounds = self
            .bounds
            .on_remove(removed.data(), self.storage.iter().map(Point::data));
        mutation.changes.push(self.change(id, ChangeKind::Removed));
        trace!(series = ?self.id, point = ?id, "remove point");
        self.notify(&mutation);
        Some(mutation)
    }

    /// Moves an existing point to new coordinates.
    pub fn update(&mut self, id: PointId, data: DataPoint) -> ChartResult<Option<SeriesMutation>> {
        let data = data.validate()?;
        let Some((previous, displaced)) = self.storage.update(id, data) else {
            return Ok(None);
        };

        let mut mutation = SeriesMutation::default();
        mutation.bounds = self.bounds.on_add(data);
        mutation.bounds = mutation
            .bounds
            .union(self.bounds.on_remove(previous, self.storage.iter().map(Point::data)));
        for old in displaced {
            mutation.bounds = mutation
                .bounds
                .union(self.bounds.on_remove(old.data(), self.storage.iter().map(Point::data)));
            mutation.changes.push(self.change(old.id, ChangeKind::Removed));
        }
        mutation.changes.push(self.change(id, ChangeKind::Modified));
        trace!(series = ?self.id, point = ?id, x = data.x, y = data.y, "update point");
        self.notify(&mutation);
        Ok(Some(mutation))
    }

    /// Removes every point and resets bounds to `(0, 0)`.
    pub fn clear(&mut self) -> SeriesMutation {
        let removed = self.storage.drain_all();
        let mut mutation = SeriesMutation {
            bounds: self.bounds.reset(),
            ..SeriesMutation::default()
        };
        for point in &removed {
            mutation.changes.push(self.change(point.id, ChangeKind::Removed));
        }
        trace!(series = ?self.id, removed = removed.len(), "clear series");
        self.notify(&mutation);
        mutation
    }

    fn change(&self, point: PointId, kind: ChangeKind) -> PendingChange {
        PendingChange {
            series: self.id,
            point,
            kind,
        }
    }

    fn notify(&mut self, mutation: &SeriesMutation) {
        if self.listeners.is_empty() {
            return;
        }
        for listener in &mut self.listeners {
            if !mutation.bounds.is_none() {
                listener.on_bounds_changed(self.id, mutation.bounds, self.bounds);
            }
            for change in &mutation.changes {
                listener.on_point_changed(*change);
            }
        }
    }
}
