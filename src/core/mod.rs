pub mod bounds;
pub mod range;
pub mod range_policy;
pub mod series;
pub mod storage;
pub mod transform;
pub mod types;

pub use bounds::{BoundKind, BoundsChange, BoundsTracker};
pub use range::Range;
pub use range_policy::{
    FixedViewport, ForcedPoint, HighestValues, MinimumViewport, RangePolicy, RangePolicyConfig,
    Unbounded,
};
pub use series::{ChangeKind, PendingChange, Series, SeriesListener, SeriesMutation};
pub use storage::{
    Displaced, InsertionOrder, PointStorage, ReplacingX, RingBuffer, SortedByX, StorageKind,
};
pub use transform::TransformKind;
pub use types::{
    ChartId, DataPoint, Dimension, Point, PointId, SeriesId, Viewport, datetime_to_unix_seconds,
    decimal_to_f64,
};
