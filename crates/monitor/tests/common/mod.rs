#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use scada_core::reading::{Measurement, NewReading, Reading};
use scada_core::sensor::{NewSensor, Sensor, Thresholds};
use scada_core::types::Timestamp;
use scada_db::{MemoryReadingStore, MemorySensorRegistry, ReadingStore, StoreError};
use scada_events::{EventBus, MonitorEvent, MonitorEventKind};
use scada_monitor::service::SourceFactory;
use scada_monitor::{MeasurementSource, MonitorConfig, MonitorService, SamplerContext};
use tokio::sync::broadcast;

/// Tick used by every test.
pub const TICK: Duration = Duration::from_millis(100);

/// Sleep half a tick. Called once right after `start` so that later
/// whole-tick sleeps never end on the same instant as a sampler tick.
pub async fn settle() {
    tokio::time::sleep(TICK / 2).await;
}

/// Sleep for `ticks` whole sampler ticks.
pub async fn sleep_ticks(ticks: u32) {
    tokio::time::sleep(TICK * ticks).await;
}

/// Replays a fixed list of measurements, then holds the last value.
pub struct ScriptedSource {
    script: VecDeque<Measurement>,
}

impl ScriptedSource {
    pub fn new(values: &[(f64, f64)]) -> Self {
        Self {
            script: values
                .iter()
                .map(|&(t, p)| Measurement::new(t, p))
                .collect(),
        }
    }
}

impl MeasurementSource for ScriptedSource {
    fn next(&mut self, previous: Measurement, _motor_on: bool) -> Measurement {
        self.script.pop_front().unwrap_or(previous)
    }
}

pub fn scripted_factory(values: &[(f64, f64)]) -> SourceFactory {
    let values = values.to_vec();
    Arc::new(move || Box::new(ScriptedSource::new(&values)))
}

/// In-memory store whose next `n` appends fail.
#[derive(Default)]
pub struct FlakyStore {
    pub inner: MemoryReadingStore,
    failures_left: AtomicUsize,
}

impl FlakyStore {
    pub fn failing(n: usize) -> Self {
        Self {
            inner: MemoryReadingStore::new(),
            failures_left: AtomicUsize::new(n),
        }
    }
}

#[async_trait]
impl ReadingStore for FlakyStore {
    async fn append(&self, reading: NewReading) -> Result<Reading, StoreError> {
        let injected = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(StoreError::Unavailable("injected failure".to_string()));
        }
        self.inner.append(reading).await
    }

    async fn recent(&self, sensor_id: &str, limit: usize) -> Result<Vec<Reading>, StoreError> {
        self.inner.recent(sensor_id, limit).await
    }

    async fn range(
        &self,
        sensor_id: &str,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<Vec<Reading>, StoreError> {
        self.inner.range(sensor_id, start, end).await
    }

    async fn warnings(
        &self,
        sensor_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Reading>, StoreError> {
        self.inner.warnings(sensor_id, limit).await
    }

    async fn all(&self, sensor_id: Option<&str>) -> Result<Vec<Reading>, StoreError> {
        self.inner.all(sensor_id).await
    }

    async fn delete_for_sensor(&self, sensor_id: &str) -> Result<u64, StoreError> {
        self.inner.delete_for_sensor(sensor_id).await
    }
}

/// In-memory store whose appends take a quarter tick to complete.
#[derive(Default)]
pub struct SlowStore {
    pub inner: MemoryReadingStore,
}

#[async_trait]
impl ReadingStore for SlowStore {
    async fn append(&self, reading: NewReading) -> Result<Reading, StoreError> {
        tokio::time::sleep(TICK / 4).await;
        self.inner.append(reading).await
    }

    async fn recent(&self, sensor_id: &str, limit: usize) -> Result<Vec<Reading>, StoreError> {
        self.inner.recent(sensor_id, limit).await
    }

    async fn range(
        &self,
        sensor_id: &str,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<Vec<Reading>, StoreError> {
        self.inner.range(sensor_id, start, end).await
    }

    async fn warnings(
        &self,
        sensor_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Reading>, StoreError> {
        self.inner.warnings(sensor_id, limit).await
    }

    async fn all(&self, sensor_id: Option<&str>) -> Result<Vec<Reading>, StoreError> {
        self.inner.all(sensor_id).await
    }

    async fn delete_for_sensor(&self, sensor_id: &str) -> Result<u64, StoreError> {
        self.inner.delete_for_sensor(sensor_id).await
    }
}

pub fn test_config() -> MonitorConfig {
    MonitorConfig {
        tick: TICK,
        ..MonitorConfig::default()
    }
}

/// A sensor with 25/25 thresholds and the motor on.
pub fn sensor(sensor_id: &str) -> Sensor {
    Sensor::from_new(new_sensor(sensor_id), Thresholds::default(), Utc::now())
        .expect("valid sensor")
}

pub fn new_sensor(sensor_id: &str) -> NewSensor {
    NewSensor {
        sensor_id: sensor_id.to_string(),
        name: format!("Sensor {sensor_id}"),
        motor_on: Some(true),
        temp_threshold: Some(25.0),
        pressure_threshold: Some(25.0),
    }
}

pub fn sampler_context(store: Arc<dyn ReadingStore>, events: Arc<EventBus>) -> SamplerContext {
    SamplerContext {
        store,
        events,
        tick: TICK,
    }
}

/// Service over a fresh in-memory store, driven by `script`.
pub fn service_with_script(
    script: &[(f64, f64)],
) -> (MonitorService, Arc<MemoryReadingStore>) {
    service_with_store(Arc::new(MemoryReadingStore::new()), script)
}

/// Service over `store`, driven by `script`.
pub fn service_with_store<S: ReadingStore + 'static>(
    store: Arc<S>,
    script: &[(f64, f64)],
) -> (MonitorService, Arc<S>) {
    let service = MonitorService::new(
        store.clone(),
        Arc::new(MemorySensorRegistry::new()),
        Arc::new(EventBus::default()),
        test_config(),
    )
    .with_source_factory(scripted_factory(script));
    (service, store)
}

/// Drain every event currently buffered in `rx`.
pub fn drain(rx: &mut broadcast::Receiver<MonitorEvent>) -> Vec<MonitorEventKind> {
    let mut out = Vec::new();
    while let Ok(event) = rx.try_recv() {
        out.push(event.kind);
    }
    out
}
