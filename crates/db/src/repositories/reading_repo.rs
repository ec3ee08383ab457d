//! In-memory [`ReadingStore`] (append-only, per-sensor series).

use std::collections::HashMap;

use async_trait::async_trait;
use scada_core::reading::{NewReading, Reading};
use scada_core::types::{DbId, Timestamp};
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::store::ReadingStore;

#[derive(Debug, Default)]
struct Inner {
    next_id: DbId,
    by_sensor: HashMap<String, Vec<Reading>>,
}

/// Reading store kept entirely in process memory.
///
/// Series are kept in insertion order; queries sort by timestamp
/// descending, breaking ties by id so later appends come first.
#[derive(Debug, Default)]
pub struct MemoryReadingStore {
    inner: RwLock<Inner>,
}

impl MemoryReadingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of readings across all sensors.
    pub async fn len(&self) -> usize {
        self.inner.read().await.by_sensor.values().map(Vec::len).sum()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Sort most-recent-first with a stable id tie-break.
fn newest_first(readings: &mut [Reading]) {
    readings.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
}

#[async_trait]
impl ReadingStore for MemoryReadingStore {
    async fn append(&self, reading: NewReading) -> Result<Reading, StoreError> {
        let mut inner = self.inner.write().await;
        inner.next_id += 1;
        let stored = reading.into_reading(inner.next_id);
        inner
            .by_sensor
            .entry(stored.sensor_id.clone())
            .or_default()
            .push(stored.clone());
        tracing::trace!(sensor_id = %stored.sensor_id, id = stored.id, "Reading appended");
        Ok(stored)
    }

    async fn recent(&self, sensor_id: &str, limit: usize) -> Result<Vec<Reading>, StoreError> {
        let inner = self.inner.read().await;
        let mut readings = inner.by_sensor.get(sensor_id).cloned().unwrap_or_default();
        newest_first(&mut readings);
        readings.truncate(limit);
        Ok(readings)
    }

    async fn range(
        &self,
        sensor_id: &str,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<Vec<Reading>, StoreError> {
        let inner = self.inner.read().await;
        let mut readings: Vec<Reading> = inner
            .by_sensor
            .get(sensor_id)
            .map(|series| {
                series
                    .iter()
                    .filter(|r| r.timestamp >= start && r.timestamp <= end)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        newest_first(&mut readings);
        Ok(readings)
    }

    async fn warnings(
        &self,
        sensor_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Reading>, StoreError> {
        let inner = self.inner.read().await;
        let mut readings: Vec<Reading> = match sensor_id {
            Some(id) => inner
                .by_sensor
                .get(id)
                .map(|series| series.iter().filter(|r| r.is_warning()).cloned().collect())
                .unwrap_or_default(),
            None => inner
                .by_sensor
                .values()
                .flatten()
                .filter(|r| r.is_warning())
                .cloned()
                .collect(),
        };
        newest_first(&mut readings);
        readings.truncate(limit);
        Ok(readings)
    }

    async fn all(&self, sensor_id: Option<&str>) -> Result<Vec<Reading>, StoreError> {
        let inner = self.inner.read().await;
        let mut readings: Vec<Reading> = match sensor_id {
            Some(id) => inner.by_sensor.get(id).cloned().unwrap_or_default(),
            None => inner.by_sensor.values().flatten().cloned().collect(),
        };
        newest_first(&mut readings);
        Ok(readings)
    }

    async fn delete_for_sensor(&self, sensor_id: &str) -> Result<u64, StoreError> {
        let mut inner = self.inner.write().await;
        let removed = inner
            .by_sensor
            .remove(sensor_id)
            .map(|series| series.len() as u64)
            .unwrap_or(0);
        Ok(removed)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
