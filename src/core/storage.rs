use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fmt;

use indexmap::IndexMap;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::core::{DataPoint, Point, PointId};
use crate::error::{ChartError, ChartResult};

/// Points pushed out of a storage as a side effect of an insert or update.
pub type Displaced = SmallVec<[Point; 1]>;

/// Storage discipline of a series.
///
/// Implementations decide ordering and eviction; bounds bookkeeping is done
/// by the owning series from the returned displaced points.
pub trait PointStorage: fmt::Debug + Send {
    fn kind(&self) -> StorageKind;

    /// Inserts `point`, returning the points it displaced.
    fn insert(&mut self, point: Point) -> Displaced;

    fn remove(&mut self, id: PointId) -> Option<Point>;

    /// Moves point `id` to `data`, returning its previous coordinates and any
    /// points displaced by the move.
    fn update(&mut self, id: PointId, data: DataPoint) -> Option<(DataPoint, Displaced)>;

    fn get(&self, id: PointId) -> Option<&Point>;
    fn get_mut(&mut self, id: PointId) -> Option<&mut Point>;
    fn iter(&self) -> Box<dyn Iterator<Item = &Point> + '_>;
    fn iter_mut(&mut self) -> Box<dyn Iterator<Item = &mut Point> + '_>;
    fn len(&self) -> usize;

    /// Removes every point, returning them in storage order.
    fn drain_all(&mut self) -> Vec<Point>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Serializable selection of a storage discipline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StorageKind {
    #[default]
    InsertionOrder,
    SortedByX,
    ReplacingX,
    RingBuffer {
        capacity: usize,
    },
}

impl StorageKind {
    pub fn build(self) -> ChartResult<Box<dyn PointStorage>> {
        Ok(match self {
            Self::InsertionOrder => Box::new(InsertionOrder::default()),
            Self::SortedByX => Box::new(SortedByX::default()),
            Self::ReplacingX => Box::new(ReplacingX::default()),
            Self::RingBuffer { capacity } => Box::new(RingBuffer::new(capacity)?),
        })
    }
}

/// Keeps points in insertion order.
#[derive(Debug, Default)]
pub struct InsertionOrder {
    points: IndexMap<PointId, Point>,
}

impl PointStorage for InsertionOrder {
    fn kind(&self) -> StorageKind {
        StorageKind::InsertionOrder
    }

    fn insert(&mut self, point: Point) -> Displaced {
        self.points.insert(point.id, point);
        Displaced::new()
    }

    fn remove(&mut self, id: PointId) -> Option<Point> {
        self.points.shift_remove(&id)
    }

    fn update(&mut self, id: PointId, data: DataPoint) -> Option<(DataPoint, Displaced)> {
        let point = self.points.get_mut(&id)?;
        let previous = point.data();
        point.x = data.x;
        point.y = data.y;
        Some((previous, Displaced::new()))
    }

    fn get(&self, id: PointId) -> Option<&Point> {
        self.points.get(&id)
    }

    fn get_mut(&mut self, id: PointId) -> Option<&mut Point> {
        self.points.get_mut(&id)
    }

    fn iter(&self) -> Box<dyn Iterator<Item = &Point> + '_> {
        Box::new(self.points.values())
    }

    fn iter_mut(&mut self) -> Box<dyn Iterator<Item = &mut Point> + '_> {
        Box::new(self.points.values_mut())
    }

    fn len(&self) -> usize {
        self.points.len()
    }

    fn drain_all(&mut self) -> Vec<Point> {
        self.points.drain(..).map(|(_, point)| point).collect()
    }
}

type SortKey = (OrderedFloat<f64>, PointId);

/// Keeps points ordered by ascending x; equal x values keep insertion order.
#[derive(Debug, Default)]
pub struct SortedByX {
    points: BTreeMap<SortKey, Point>,
    keys: HashMap<PointId, SortKey>,
}

impl SortedByX {
    fn key_of(point: &Point) -> SortKey {
        (OrderedFloat(point.x), point.id)
    }
}

impl PointStorage for SortedByX {
    fn kind(&self) -> StorageKind {
        StorageKind::SortedByX
    }

    fn insert(&mut self, point: Point) -> Displaced {
        let key = Self::key_of(&point);
        self.keys.insert(point.id, key);
        self.points.insert(key, point);
        Displaced::new()
    }

    fn remove(&mut self, id: PointId) -> Option<Point> {
        let key = self.keys.remove(&id)?;
        self.points.remove(&key)
    }

    fn update(&mut self, id: PointId, data: DataPoint) -> Option<(DataPoint, Displaced)> {
        let mut point = self.remove(id)?;
        let previous = point.data();
        point.x = data.x;
        point.y = data.y;
        self.insert(point);
        Some((previous, Displaced::new()))
    }

    fn get(&self, id: PointId) -> Option<&Point> {
        let key = self.keys.get(&id)?;
        self.points.get(key)
    }

    fn get_mut(&mut self, id: PointId) -> Option<&mut Point> {
        let key = self.keys.get(&id)?;
        self.points.get_mut(key)
    }

    fn iter(&self) -> Box<dyn Iterator<Item = &Point> + '_> {
        Box::new(self.points.values())
    }

    fn iter_mut(&mut self) -> Box<dyn Iterator<Item = &mut Point> + '_> {
        Box::new(self.points.values_mut())
    }

    fn len(&self) -> usize {
        self.points.len()
    }

    fn drain_all(&mut self) -> Vec<Point> {
        self.keys.clear();
        std::mem::take(&mut self.points).into_values().collect()
    }
}

/// Keeps at most one point per x value; a newer point replaces the older one.
#[derive(Debug, Default)]
pub struct ReplacingX {
    points: IndexMap<PointId, Point>,
    by_x: HashMap<OrderedFloat<f64>, PointId>,
}

impl PointStorage for ReplacingX {
    fn kind(&self) -> StorageKind {
        StorageKind::ReplacingX
    }

    fn insert(&mut self, point: Point) -> Displaced {
        let mut displaced = Displaced::new();
        if let Some(old_id) = self.by_x.insert(OrderedFloat(point.x), point.id) {
            if let Some(old) = self.points.shift_remove(&old_id) {
                displaced.push(old);
            }
        }
        self.points.insert(point.id, point);
        displaced
    }

    fn remove(&mut self, id: PointId) -> Option<Point> {
        let point = self.points.shift_remove(&id)?;
        let key = OrderedFloat(point.x);
        if self.by_x.get(&key) == Some(&id) {
            self.by_x.remove(&key);
        }
        Some(point)
    }

    fn update(&mut self, id: PointId, data: DataPoint) -> Option<(DataPoint, Displaced)> {
        let previous = self.points.get(&id)?.data();
        let mut displaced = Displaced::new();
        if previous.x.to_bits() != data.x.to_bits() {
            self.by_x.remove(&OrderedFloat(previous.x));
            if let Some(other) = self.by_x.insert(OrderedFloat(data.x), id) {
                if let Some(old) = self.points.shift_remove(&other) {
                    displaced.push(old);
                }
            }
        }
        let point = self.points.get_mut(&id)?;
        point.x = data.x;
        point.y = data.y;
        Some((previous, displaced))
    }

    fn get(&self, id: PointId) -> Option<&Point> {
        self.points.get(&id)
    }

    fn get_mut(&mut self, id: PointId) -> Option<&mut Point> {
        self.points.get_mut(&id)
    }

    fn iter(&self) -> Box<dyn Iterator<Item = &Point> + '_> {
        Box::new(self.points.values())
    }

    fn iter_mut(&mut self) -> Box<dyn Iterator<Item = &mut Point> + '_> {
        Box::new(self.points.values_mut())
    }

    fn len(&self) -> usize {
        self.points.len()
    }

    fn drain_all(&mut self) -> Vec<Point> {
        self.by_x.clear();
        self.points.drain(..).map(|(_, point)| point).collect()
    }
}

/// Bounded buffer evicting the oldest point once `capacity` is reached.
#[derive(Debug)]
pub struct RingBuffer {
    capacity: usize,
    points: VecDeque<Point>,
}

impl RingBuffer {
    pub fn new(capacity: usize) -> ChartResult<Self> {
        if capacity == 0 {
            return Err(ChartError::InvalidConfiguration(
                "ring buffer capacity must be > 0".to_owned(),
            ));
        }
        Ok(Self {
            capacity,
            points: VecDeque::with_capacity(capacity),
        })
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn position(&self, id: PointId) -> Option<usize> {
        self.points.iter().position(|point| point.id == id)
    }
}

impl PointStorage for RingBuffer {
    fn kind(&self) -> StorageKind {
        StorageKind::RingBuffer {
            capacity: self.capacity,
        }
    }

    fn insert(&mut self, point: Point) -> Displaced {
        let mut displaced = Displaced::new();
        while self.points.len() >= self.capacity {
            match self.points.pop_front() {
                Some(oldest) => displaced.push(oldest),
                None => break,
            }
        }
        self.points.push_back(point);
        displaced
    }

    fn remove(&mut self, id: PointId) -> Option<Point> {
        let index = self.position(id)?;
        self.points.remove(index)
    }

    fn update(&mut self, id: PointId, data: DataPoint) -> Option<(DataPoint, Displaced)> {
        let point = self.get_mut(id)?;
        let previous = point.data();
        point.x = data.x;
        point.y = data.y;
        Some((previous, Displaced::new()))
    }

    fn get(&self, id: PointId) -> Option<&Point> {
        self.points.iter().find(|point| point.id == id)
    }

    fn get_mut(&mut self, id: PointId) -> Option<&mut Point> {
        self.points.iter_mut().find(|point| point.id == id)
    }

    fn iter(&self) -> Box<dyn Iterator<Item = &Point> + '_> {
        Box::new(self.points.iter())
    }

    fn iter_mut(&mut self) -> Box<dyn Iterator<Item = &mut Point> + '_> {
        Box::new(self.points.iter_mut())
    }

    fn len(&self) -> usize {
        self.points.len()
    }

    fn drain_all(&mut self) -> Vec<Point> {
        self.points.drain(..).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{PointStorage, ReplacingX, RingBuffer, SortedByX, StorageKind};
    use crate::core::{DataPoint, Point, PointId, SeriesId};

    fn point(id: u64, x: f64, y: f64) -> Point {
        Point::new(PointId(id), SeriesId(1), DataPoint::new(x, y))
    }

    fn xs(storage: &dyn PointStorage) -> Vec<f64> {
        storage.iter().map(|point| point.x).collect()
    }

    #[test]
    fn sorted_storage_orders_by_x_and_repositions_on_update() {
        let mut storage = SortedByX::default();
        storage.insert(point(1, 3.0, 0.0));
        storage.insert(point(2, 1.0, 0.0));
        storage.insert(point(3, 2.0, 0.0));
        assert_eq!(xs(&storage), vec![1.0, 2.0, 3.0]);

        storage.update(PointId(2), DataPoint::new(9.0, 1.0));
        assert_eq!(xs(&storage), vec![2.0, 3.0, 9.0]);
        assert_eq!(storage.get(PointId(2)).map(|p| p.y), Some(1.0));
    }

    #[test]
    fn replacing_storage_displaces_same_x() {
        let mut storage = ReplacingX::default();
        storage.insert(point(1, 1.0, 10.0));
        let displaced = storage.insert(point(2, 1.0, 20.0));
        assert_eq!(displaced.len(), 1);
        assert_eq!(displaced[0].id, PointId(1));
        assert_eq!(storage.len(), 1);
        assert_eq!(storage.get(PointId(2)).map(|p| p.y), Some(20.0));
    }

    #[test]
    fn ring_buffer_evicts_oldest() {
        let mut storage = RingBuffer::new(2).expect("capacity");
        storage.insert(point(1, 1.0, 0.0));
        storage.insert(point(2, 2.0, 0.0));
        let displaced = storage.insert(point(3, 3.0, 0.0));
        assert_eq!(displaced.iter().map(|p| p.id).collect::<Vec<_>>(), vec![PointId(1)]);
        assert_eq!(xs(&storage), vec![2.0, 3.0]);
    }

    #[test]
    fn zero_capacity_ring_buffer_is_rejected() {
        assert!(StorageKind::RingBuffer { capacity: 0 }.build().is_err());
    }
}
