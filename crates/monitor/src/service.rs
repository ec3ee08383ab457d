//! Monitor service façade.
//!
//! [`MonitorService`] owns the sensor registry, the reading store, the event
//! bus, and at most one [`Sampler`] session per sensor. It is the surface a
//! CLI or API layer talks to: lifecycle control, motor toggles, direct
//! ingestion, and history/trend queries.
//!
//! Lock order: every operation that mutates a sensor, its session, or its
//! readings takes the `sessions` lock before any registry or store call.
//! A `start` therefore never observes a half-applied motor or threshold
//! change, and `delete_sensor` (write lock) excludes concurrent starts and
//! submissions for its whole cascade. Read-only queries skip the lock.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use scada_core::error::CoreError;
use scada_core::lifecycle::{LifecycleAction, SamplerStatus};
use scada_core::reading::{resolve_limit, NewReading, Reading, SubmitReading};
use scada_core::sensor::{MotorChange, NewSensor, Sensor, ThresholdUpdate};
use scada_core::trend::{summarize, TrendSummary};
use scada_core::types::Timestamp;
use scada_db::{ReadingStore, SensorRegistry};
use scada_events::{EventBus, MonitorEvent, MonitorEventKind};
use tokio::sync::{broadcast, RwLock};

use crate::config::MonitorConfig;
use crate::sampler::{Sampler, SamplerContext, SamplerSnapshot};
use crate::source::{MeasurementSource, RandomWalk};

/// How long `shutdown` waits for each sampler task to exit.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Builds a fresh measurement source for each new sampler session.
pub type SourceFactory = Arc<dyn Fn() -> Box<dyn MeasurementSource> + Send + Sync>;

pub struct MonitorService {
    store: Arc<dyn ReadingStore>,
    registry: Arc<dyn SensorRegistry>,
    events: Arc<EventBus>,
    config: MonitorConfig,
    sessions: RwLock<HashMap<String, Arc<Sampler>>>,
    source_factory: SourceFactory,
}

impl MonitorService {
    pub fn new(
        store: Arc<dyn ReadingStore>,
        registry: Arc<dyn SensorRegistry>,
        events: Arc<EventBus>,
        config: MonitorConfig,
    ) -> Self {
        Self {
            store,
            registry,
            events,
            config,
            sessions: RwLock::new(HashMap::new()),
            source_factory: Arc::new(|| Box::new(RandomWalk::new())),
        }
    }

    /// Replace the measurement source used by sessions started from now on.
    pub fn with_source_factory(mut self, factory: SourceFactory) -> Self {
        self.source_factory = factory;
        self
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.events.subscribe()
    }

    // ---- sensor registry ----

    pub async fn register_sensor(&self, new: NewSensor) -> Result<Sensor, CoreError> {
        let sensor = Sensor::from_new(new, self.config.default_thresholds, Utc::now())?;
        let _sessions = self.sessions.read().await;
        let sensor = self.registry.insert(sensor).await?;
        tracing::info!(
            sensor_id = %sensor.sensor_id,
            name = %sensor.name,
            temp_threshold = sensor.thresholds.temperature,
            pressure_threshold = sensor.thresholds.pressure,
            "Sensor registered",
        );
        Ok(sensor)
    }

    pub async fn get_sensor(&self, sensor_id: &str) -> Result<Sensor, CoreError> {
        self.registry
            .get(sensor_id)
            .await?
            .ok_or_else(|| CoreError::SensorNotFound(sensor_id.to_string()))
    }

    pub async fn list_sensors(&self) -> Result<Vec<Sensor>, CoreError> {
        Ok(self.registry.list().await?)
    }

    /// Partially update a sensor's thresholds. A live session uses the new
    /// values from its next tick.
    pub async fn update_thresholds(
        &self,
        sensor_id: &str,
        update: ThresholdUpdate,
    ) -> Result<Sensor, CoreError> {
        let sessions = self.sessions.read().await;
        let sensor = self.registry.update_thresholds(sensor_id, update).await?;
        if let Some(sampler) = sessions.get(sensor_id) {
            sampler.set_thresholds(sensor.thresholds);
        }
        tracing::info!(
            sensor_id,
            temp_threshold = sensor.thresholds.temperature,
            pressure_threshold = sensor.thresholds.pressure,
            "Thresholds updated",
        );
        Ok(sensor)
    }

    /// Delete a sensor together with its session and readings.
    ///
    /// The `sessions` write lock is held for the whole cascade, so no
    /// `start` or submission can slip in between joining the session and
    /// removing the sensor.
    pub async fn delete_sensor(&self, sensor_id: &str) -> Result<u64, CoreError> {
        let mut sessions = self.sessions.write().await;
        self.get_sensor(sensor_id).await?;

        if let Some(sampler) = sessions.remove(sensor_id) {
            // A critical shutdown may have stopped it since the check.
            if sampler.status() != SamplerStatus::Stopped {
                if let Err(e) = sampler.stop() {
                    tracing::debug!(sensor_id, error = %e, "Sampler already stopped");
                }
            }
            sampler.join().await;
        }

        self.registry.delete(sensor_id).await?;
        let removed = self.store.delete_for_sensor(sensor_id).await?;
        drop(sessions);

        tracing::info!(sensor_id, readings_removed = removed, "Sensor deleted");
        Ok(removed)
    }

    // ---- lifecycle ----

    /// Start a new sampler session for the sensor.
    ///
    /// Replaces a previous session that has stopped. Fails if a session is
    /// still running.
    pub async fn start(&self, sensor_id: &str) -> Result<SamplerStatus, CoreError> {
        let mut sessions = self.sessions.write().await;
        let sensor = self.get_sensor(sensor_id).await?;

        if let Some(existing) = sessions.get(sensor_id) {
            let status = existing.status();
            if status.is_running() {
                return Err(CoreError::InvalidLifecycleTransition {
                    sensor_id: sensor_id.to_string(),
                    action: LifecycleAction::Start,
                    status,
                });
            }
        }

        let ctx = SamplerContext {
            store: Arc::clone(&self.store),
            events: Arc::clone(&self.events),
            tick: self.config.tick,
        };
        let sampler = Arc::new(Sampler::new(
            &sensor,
            self.config.initial,
            (self.source_factory)(),
            ctx,
        ));
        let status = sampler.start()?;
        sessions.insert(sensor_id.to_string(), sampler);
        Ok(status)
    }

    pub async fn pause(&self, sensor_id: &str) -> Result<SamplerStatus, CoreError> {
        self.session(sensor_id, LifecycleAction::Pause)
            .await?
            .pause()
    }

    /// Resume a paused session. A session ended by a critical shutdown
    /// cannot be resumed; call `start` for a new one.
    pub async fn resume(&self, sensor_id: &str) -> Result<SamplerStatus, CoreError> {
        self.session(sensor_id, LifecycleAction::Resume)
            .await?
            .resume()
    }

    pub async fn stop(&self, sensor_id: &str) -> Result<SamplerStatus, CoreError> {
        self.session(sensor_id, LifecycleAction::Stop)
            .await?
            .stop()
    }

    /// Current session status; `Idle` when no session was ever started.
    pub async fn status(&self, sensor_id: &str) -> Result<SamplerStatus, CoreError> {
        Ok(self
            .snapshot(sensor_id)
            .await?
            .map_or(SamplerStatus::Idle, |s| s.status))
    }

    pub async fn snapshot(&self, sensor_id: &str) -> Result<Option<SamplerSnapshot>, CoreError> {
        let sessions = self.sessions.read().await;
        self.get_sensor(sensor_id).await?;
        Ok(sessions.get(sensor_id).map(|s| s.snapshot()))
    }

    pub async fn turn_motor_on(&self, sensor_id: &str) -> Result<MotorChange, CoreError> {
        self.set_motor(sensor_id, true).await
    }

    pub async fn turn_motor_off(&self, sensor_id: &str) -> Result<MotorChange, CoreError> {
        self.set_motor(sensor_id, false).await
    }

    async fn set_motor(&self, sensor_id: &str, motor_on: bool) -> Result<MotorChange, CoreError> {
        let sessions = self.sessions.read().await;
        let (_, change) = self.registry.set_motor(sensor_id, motor_on).await?;

        match change {
            MotorChange::Switched { motor_on } => {
                if let Some(sampler) = sessions.get(sensor_id) {
                    sampler.set_motor(motor_on);
                }
                tracing::info!(sensor_id, motor_on, "Motor switched");
                self.events.publish(MonitorEvent::new(
                    sensor_id,
                    MonitorEventKind::MotorChanged { motor_on },
                ));
            }
            MotorChange::Unchanged { motor_on } => {
                tracing::debug!(sensor_id, motor_on, "Motor already in requested state");
            }
        }
        Ok(change)
    }

    /// Look up the session a control action applies to.
    async fn session(
        &self,
        sensor_id: &str,
        action: LifecycleAction,
    ) -> Result<Arc<Sampler>, CoreError> {
        let sessions = self.sessions.read().await;
        self.get_sensor(sensor_id).await?;
        sessions
            .get(sensor_id)
            .cloned()
            .ok_or_else(|| CoreError::InvalidLifecycleTransition {
                sensor_id: sensor_id.to_string(),
                action,
                status: SamplerStatus::Idle,
            })
    }

    // ---- ingestion ----

    /// Ingest an externally measured reading, classified against the
    /// sensor's current thresholds.
    ///
    /// A warning here is reported as a `ThresholdWarning` event only; it
    /// never shuts down the sensor's sampler session.
    pub async fn submit_reading(&self, input: SubmitReading) -> Result<Reading, CoreError> {
        input.validate()?;
        let _sessions = self.sessions.read().await;
        let sensor = self.get_sensor(&input.sensor_id).await?;

        let reading = NewReading::evaluated(
            sensor.sensor_id,
            input.measurement(),
            input.motor_on,
            &sensor.thresholds,
            Utc::now(),
        );
        let reading = self.store.append(reading).await?;

        self.events.publish(MonitorEvent::new(
            reading.sensor_id.clone(),
            MonitorEventKind::ReadingRecorded {
                reading: reading.clone(),
            },
        ));
        if let Some(message) = reading.warning_message.clone() {
            tracing::warn!(sensor_id = %reading.sensor_id, %message, "Submitted reading breached thresholds");
            self.events.publish(MonitorEvent::new(
                reading.sensor_id.clone(),
                MonitorEventKind::ThresholdWarning {
                    reading: Some(reading.clone()),
                    message,
                },
            ));
        }
        Ok(reading)
    }

    /// Submit readings in order, stopping at the first failure.
    ///
    /// Items before the failing one stay stored.
    pub async fn submit_bulk(&self, inputs: Vec<SubmitReading>) -> Result<Vec<Reading>, CoreError> {
        let mut stored = Vec::with_capacity(inputs.len());
        for input in inputs {
            stored.push(self.submit_reading(input).await?);
        }
        tracing::debug!(count = stored.len(), "Bulk submission stored");
        Ok(stored)
    }

    // ---- queries ----

    pub async fn recent(&self, sensor_id: &str, limit: Option<i64>) -> Result<Vec<Reading>, CoreError> {
        self.get_sensor(sensor_id).await?;
        let limit = resolve_limit(limit, self.config.recent_default_limit);
        Ok(self.store.recent(sensor_id, limit).await?)
    }

    /// Readings with `start <= timestamp <= end`, most recent first.
    pub async fn range(
        &self,
        sensor_id: &str,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<Vec<Reading>, CoreError> {
        if start > end {
            return Err(CoreError::Validation(format!(
                "range start {start} is after end {end}"
            )));
        }
        self.get_sensor(sensor_id).await?;
        Ok(self.store.range(sensor_id, start, end).await?)
    }

    /// Warning readings, for one sensor or across all sensors.
    pub async fn warnings(
        &self,
        sensor_id: Option<&str>,
        limit: Option<i64>,
    ) -> Result<Vec<Reading>, CoreError> {
        if let Some(id) = sensor_id {
            self.get_sensor(id).await?;
        }
        let limit = resolve_limit(limit, self.config.warnings_default_limit);
        Ok(self.store.warnings(sensor_id, limit).await?)
    }

    /// Full reading history, most recent first, for one sensor or all.
    pub async fn all_readings(&self, sensor_id: Option<&str>) -> Result<Vec<Reading>, CoreError> {
        if let Some(id) = sensor_id {
            self.get_sensor(id).await?;
        }
        Ok(self.store.all(sensor_id).await?)
    }

    /// Summary statistics over the sensor's most recent `limit` readings.
    pub async fn trend(&self, sensor_id: &str, limit: Option<i64>) -> Result<TrendSummary, CoreError> {
        self.get_sensor(sensor_id).await?;
        let limit = resolve_limit(limit, self.config.trend_default_limit);
        let window = self.store.recent(sensor_id, limit).await?;
        summarize(sensor_id, &window)
    }

    // ---- shutdown ----

    /// Stop every running session and wait for its task to exit.
    pub async fn shutdown(&self) {
        tracing::info!("Shutting down monitor service");

        let mut sessions = self.sessions.write().await;
        for (sensor_id, sampler) in sessions.drain() {
            if sampler.status() != SamplerStatus::Stopped {
                if let Err(e) = sampler.stop() {
                    tracing::warn!(sensor_id = %sensor_id, error = %e, "Failed to stop sampler");
                }
            }
            if tokio::time::timeout(SHUTDOWN_TIMEOUT, sampler.join())
                .await
                .is_err()
            {
                tracing::warn!(sensor_id = %sensor_id, "Sampler task did not exit in time");
            }
        }

        tracing::info!("Monitor service shut down complete");
    }
}
