use std::sync::atomic::{AtomicU64, Ordering};

use crate::chart::{Chart, ChartConfig, SeriesHandle};
use crate::core::{ChartId, Series, SeriesId, StorageKind};
use crate::error::ChartResult;

/// Registry handing out chart and series identities.
///
/// Identities are unique per context; charts only accept series created by
/// the same context they were created by.
#[derive(Debug, Default)]
pub struct ChartContext {
    next_chart: AtomicU64,
    next_series: AtomicU64,
}

impl ChartContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_chart(&self, config: &ChartConfig) -> ChartResult<Chart> {
        let id = ChartId(self.next_chart.fetch_add(1, Ordering::Relaxed));
        Chart::new(id, config)
    }

    pub fn create_series(
        &self,
        name: impl Into<String>,
        storage: StorageKind,
    ) -> ChartResult<SeriesHandle> {
        let id = SeriesId(self.next_series.fetch_add(1, Ordering::Relaxed));
        Ok(SeriesHandle::new(Series::new(id, name, storage)?))
    }

    #[must_use]
    pub fn charts_created(&self) -> u64 {
        self.next_chart.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn series_created(&self) -> u64 {
        self.next_series.load(Ordering::Relaxed)
    }
}
