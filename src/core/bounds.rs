use serde::{Deserialize, Serialize};

use crate::core::{DataPoint, Range};

/// Individual cached extremum of a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BoundKind {
    MinX,
    MaxX,
    MinY,
    MaxY,
}

impl BoundKind {
    const fn bit(self) -> u8 {
        match self {
            Self::MinX => 1 << 0,
            Self::MaxX => 1 << 1,
            Self::MinY => 1 << 2,
            Self::MaxY => 1 << 3,
        }
    }
}

/// Bitmask of bounds moved by a single mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct BoundsChange {
    bits: u8,
}

impl BoundsChange {
    #[must_use]
    pub const fn none() -> Self {
        Self { bits: 0 }
    }

    #[must_use]
    pub const fn all() -> Self {
        Self {
            bits: BoundKind::MinX.bit()
                | BoundKind::MaxX.bit()
                | BoundKind::MinY.bit()
                | BoundKind::MaxY.bit(),
        }
    }

    #[must_use]
    pub const fn with(self, kind: BoundKind) -> Self {
        Self {
            bits: self.bits | kind.bit(),
        }
    }

    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self {
            bits: self.bits | other.bits,
        }
    }

    #[must_use]
    pub const fn contains(self, kind: BoundKind) -> bool {
        (self.bits & kind.bit()) != 0
    }

    #[must_use]
    pub const fn is_none(self) -> bool {
        self.bits == 0
    }
}

/// Incremental min/max cache over the points of one series.
///
/// Additions are O(1). Removals are O(1) for strictly interior points and
/// fall back to a rescan of the remaining points when the removed point sat
/// on (or beyond) a cached extremum, so duplicate extremal values are handled.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundsTracker {
    min_x: f64,
    max_x: f64,
    min_y: f64,
    max_y: f64,
    first_time: bool,
}

impl Default for BoundsTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl BoundsTracker {
    #[must_use]
    pub fn new() -> Self {
        Self {
            min_x: 0.0,
            max_x: 0.0,
            min_y: 0.0,
            max_y: 0.0,
            first_time: true,
        }
    }

    /// Builds a tracker from scratch over `points`.
    #[must_use]
    pub fn from_points(points: impl IntoIterator<Item = DataPoint>) -> Self {
        let mut tracker = Self::new();
        for point in points {
            tracker.on_add(point);
        }
        tracker
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.first_time
    }

    #[must_use]
    pub fn min_x(&self) -> f64 {
        self.min_x
    }

    #[must_use]
    pub fn max_x(&self) -> f64 {
        self.max_x
    }

    #[must_use]
    pub fn min_y(&self) -> f64 {
        self.min_y
    }

    #[must_use]
    pub fn max_y(&self) -> f64 {
        self.max_y
    }

    #[must_use]
    pub fn x_range(&self) -> Range {
        Range::ordered(self.min_x, self.max_x)
    }

    #[must_use]
    pub fn y_range(&self) -> Range {
        Range::ordered(self.min_y, self.max_y)
    }

    /// Resets to the empty state: all bounds `0.0`, first insertion pending.
    pub fn reset(&mut self) -> BoundsChange {
        let before = *self;
        *self = Self::new();
        self.diff(before)
    }

    /// Accounts for an added point. Ties keep the previously cached extremum.
    pub fn on_add(&mut self, point: DataPoint) -> BoundsChange {
        if self.first_time {
            self.min_x = point.x;
            self.max_x = point.x;
            self.min_y = point.y;
            self.max_y = point.y;
            self.first_time = false;
            return BoundsChange::all();
        }

        let mut change = BoundsChange::none();
        if point.x > self.max_x {
            self.max_x = point.x;
            change = change.with(BoundKind::MaxX);
        }
        if point.x < self.min_x {
            self.min_x = point.x;
            change = change.with(BoundKind::MinX);
        }
        if point.y > self.max_y {
            self.max_y = point.y;
            change = change.with(BoundKind::MaxY);
        }
        if point.y < self.min_y {
            self.min_y = point.y;
            change = change.with(BoundKind::MinY);
        }
        change
    }

    /// Accounts for a removed point given the points still in the series.
    ///
    /// Interior removals leave the cache untouched. Removing a point lying on
    /// a cached extremum rescans `remaining` for the affected bounds only.
    pub fn on_remove<I>(&mut self, removed: DataPoint, remaining: I) -> BoundsChange
    where
        I: IntoIterator<Item = DataPoint>,
    {
        if self.first_time {
            return BoundsChange::none();
        }

        let rescan_max_x = removed.x >= self.max_x;
        let rescan_min_x = removed.x <= self.min_x;
        let rescan_max_y = removed.y >= self.max_y;
        let rescan_min_y = removed.y <= self.min_y;
        if !(rescan_max_x || rescan_min_x || rescan_max_y || rescan_min_y) {
            return BoundsChange::none();
        }

        let before = *self;
        let mut seen = false;
        let mut min_x = f64::INFINITY;
        let mut max_x = f64::NEG_INFINITY;
        let mut min_y = f64::INFINITY;
        let mut max_y = f64::NEG_INFINITY;
        for point in remaining {
            seen = true;
            min_x = min_x.min(point.x);
            max_x = max_x.max(point.x);
            min_y = min_y.min(point.y);
            max_y = max_y.max(point.y);
        }
        if !seen {
            return self.reset();
        }
        if rescan_max_x {
            self.max_x = max_x;
        }
        if rescan_min_x {
            self.min_x = min_x;
        }
        if rescan_max_y {
            self.max_y = max_y;
        }
        if rescan_min_y {
            self.min_y = min_y;
        }
        self.diff(before)
    }

    fn diff(&self, before: Self) -> BoundsChange {
        let mut change = BoundsChange::none();
        if self.min_x.to_bits() != before.min_x.to_bits() {
            change = change.with(BoundKind::MinX);
        }
        if self.max_x.to_bits() != before.max_x.to_bits() {
            change = change.with(BoundKind::MaxX);
        }
        if self.min_y.to_bits() != before.min_y.to_bits() {
            change = change.with(BoundKind::MinY);
        }
        if self.max_y.to_bits() != before.max_y.to_bits() {
            change = change.with(BoundKind::MaxY);
        }
        change
    }
}
