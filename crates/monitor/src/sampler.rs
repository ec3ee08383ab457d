//! Per-sensor background sampler.
//!
//! A [`Sampler`] owns one Tokio task that wakes once per tick and, while
//! active, derives the next measurement, classifies it against the sensor's
//! thresholds, appends it to the [`ReadingStore`], and publishes events.
//!
//! Control calls (`pause`, `resume`, `stop`, motor and threshold changes)
//! only take a short `std::sync::Mutex` critical section and never wait on
//! the task. `stop` cancels the task's [`CancellationToken`]; the task
//! observes it before its next production step.
//!
//! Any threshold breach is a critical shutdown: the session moves straight
//! to `Stopped` and cannot be resumed. The breaching reading gets one more
//! append attempt before the task exits; `ThresholdWarning` is published
//! even if it is never stored.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use scada_core::error::CoreError;
use scada_core::lifecycle::{next_status, LifecycleAction, SamplerStatus, StopReason};
use scada_core::reading::{Measurement, NewReading};
use scada_core::sensor::{Sensor, Thresholds};
use scada_core::types::Timestamp;
use scada_db::ReadingStore;
use scada_events::{EventBus, MonitorEvent, MonitorEventKind};
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::source::MeasurementSource;

/// Collaborators shared by every sampler a service creates.
#[derive(Clone)]
pub struct SamplerContext {
    pub store: Arc<dyn ReadingStore>,
    pub events: Arc<EventBus>,
    pub tick: Duration,
}

/// Point-in-time copy of a sampler's shared state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SamplerSnapshot {
    pub status: SamplerStatus,
    pub stop_reason: Option<StopReason>,
    pub motor_on: bool,
    pub thresholds: Thresholds,
    /// Most recently produced measurement (the session's seed before any tick).
    pub last: Measurement,
}

/// Mutable state shared between the controller and the sampler task.
#[derive(Debug)]
struct SamplerState {
    status: SamplerStatus,
    stop_reason: Option<StopReason>,
    motor_on: bool,
    thresholds: Thresholds,
    last: Measurement,
    last_timestamp: Option<Timestamp>,
}

/// Lock helper: a poisoned lock still holds consistent plain data.
fn lock(state: &Mutex<SamplerState>) -> MutexGuard<'_, SamplerState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One sampler session for a single sensor.
///
/// Sessions are single-use: once `Stopped` (by the operator or by a critical
/// shutdown) a new `Sampler` must be constructed to sample again.
pub struct Sampler {
    sensor_id: String,
    state: Arc<Mutex<SamplerState>>,
    ctx: SamplerContext,
    cancel: CancellationToken,
    /// Consumed by `start`; `None` once the task owns it.
    source: Mutex<Option<Box<dyn MeasurementSource>>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Sampler {
    /// Create an idle session seeded with `initial`.
    pub fn new(
        sensor: &Sensor,
        initial: Measurement,
        source: Box<dyn MeasurementSource>,
        ctx: SamplerContext,
    ) -> Self {
        Self {
            sensor_id: sensor.sensor_id.clone(),
            state: Arc::new(Mutex::new(SamplerState {
                status: SamplerStatus::Idle,
                stop_reason: None,
                motor_on: sensor.motor_on,
                thresholds: sensor.thresholds,
                last: initial,
                last_timestamp: None,
            })),
            ctx,
            cancel: CancellationToken::new(),
            source: Mutex::new(Some(source)),
            task: Mutex::new(None),
        }
    }

    pub fn sensor_id(&self) -> &str {
        &self.sensor_id
    }

    pub fn status(&self) -> SamplerStatus {
        lock(&self.state).status
    }

    pub fn snapshot(&self) -> SamplerSnapshot {
        let state = lock(&self.state);
        SamplerSnapshot {
            status: state.status,
            stop_reason: state.stop_reason,
            motor_on: state.motor_on,
            thresholds: state.thresholds,
            last: state.last,
        }
    }

    /// Spawn the background task. Must be called within a Tokio runtime.
    pub fn start(&self) -> Result<SamplerStatus, CoreError> {
        let (status, source) = {
            let mut state = lock(&self.state);
            let source = self
                .source
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take()
                .ok_or_else(|| self.invalid(LifecycleAction::Start, state.status))?;
            (self.transition(&mut state, LifecycleAction::Start)?, source)
        };

        let worker = Worker {
            sensor_id: self.sensor_id.clone(),
            state: Arc::clone(&self.state),
            ctx: self.ctx.clone(),
            cancel: self.cancel.clone(),
            source,
            pending: None,
        };
        let handle = tokio::spawn(worker.run());
        *self.task.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);

        tracing::info!(
            sensor_id = %self.sensor_id,
            tick_ms = self.ctx.tick.as_millis() as u64,
            "Sampler started",
        );
        self.publish_status(status, None);
        Ok(status)
    }

    /// Skip production on subsequent ticks. Idempotent while paused.
    pub fn pause(&self) -> Result<SamplerStatus, CoreError> {
        let (before, after) = {
            let mut state = lock(&self.state);
            let before = state.status;
            (before, self.transition(&mut state, LifecycleAction::Pause)?)
        };
        if before != after {
            tracing::info!(sensor_id = %self.sensor_id, "Sampler paused");
            self.publish_status(after, None);
        }
        Ok(after)
    }

    /// Resume production. Idempotent while active; fails once stopped.
    pub fn resume(&self) -> Result<SamplerStatus, CoreError> {
        let (before, after) = {
            let mut state = lock(&self.state);
            let before = state.status;
            (before, self.transition(&mut state, LifecycleAction::Resume)?)
        };
        if before != after {
            tracing::info!(sensor_id = %self.sensor_id, "Sampler resumed");
            self.publish_status(after, None);
        }
        Ok(after)
    }

    /// Stop the session. Terminal; the task exits before its next tick.
    pub fn stop(&self) -> Result<SamplerStatus, CoreError> {
        let after = {
            let mut state = lock(&self.state);
            let after = self.transition(&mut state, LifecycleAction::Stop)?;
            state.stop_reason = Some(StopReason::Operator);
            after
        };
        self.cancel.cancel();
        tracing::info!(sensor_id = %self.sensor_id, "Sampler stopped");
        self.publish_status(after, Some(StopReason::Operator));
        Ok(after)
    }

    /// Update the motor flag used for subsequent samples.
    pub fn set_motor(&self, motor_on: bool) {
        lock(&self.state).motor_on = motor_on;
    }

    /// Update the thresholds used for subsequent samples.
    pub fn set_thresholds(&self, thresholds: Thresholds) {
        lock(&self.state).thresholds = thresholds;
    }

    /// Wait for the background task to exit.
    ///
    /// Returns immediately if the task was never started or already joined.
    pub async fn join(&self) {
        let handle = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::error!(sensor_id = %self.sensor_id, error = %e, "Sampler task failed");
            }
        }
    }

    fn transition(
        &self,
        state: &mut SamplerState,
        action: LifecycleAction,
    ) -> Result<SamplerStatus, CoreError> {
        let next = next_status(state.status, action)
            .ok_or_else(|| self.invalid(action, state.status))?;
        state.status = next;
        Ok(next)
    }

    fn invalid(&self, action: LifecycleAction, status: SamplerStatus) -> CoreError {
        CoreError::InvalidLifecycleTransition {
            sensor_id: self.sensor_id.clone(),
            action,
            status,
        }
    }

    fn publish_status(&self, status: SamplerStatus, reason: Option<StopReason>) {
        self.ctx.events.publish(MonitorEvent::new(
            self.sensor_id.clone(),
            MonitorEventKind::LifecycleChanged { status, reason },
        ));
    }
}

impl Drop for Sampler {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

// ---------------------------------------------------------------------------
// Background task
// ---------------------------------------------------------------------------

/// State owned exclusively by the spawned task.
struct Worker {
    sensor_id: String,
    state: Arc<Mutex<SamplerState>>,
    ctx: SamplerContext,
    cancel: CancellationToken,
    source: Box<dyn MeasurementSource>,
    /// A reading whose append failed; retried on the next active tick and
    /// once more when the task exits.
    pending: Option<NewReading>,
}

impl Worker {
    async fn run(mut self) {
        let mut ticker = tokio::time::interval(self.ctx.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let cancel = self.cancel.clone();

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    if !self.tick().await {
                        break;
                    }
                }
            }
        }

        self.flush_pending().await;
        tracing::debug!(sensor_id = %self.sensor_id, "Sampler task exited");
    }

    /// One tick. Returns `false` once the session is over.
    async fn tick(&mut self) -> bool {
        if let Some(pending) = self.pending.take() {
            if !self.is_active() {
                self.pending = Some(pending);
                return !self.cancel.is_cancelled();
            }
            if !self.record(pending).await {
                return true;
            }
        }

        let Some(reading) = self.produce() else {
            return !self.cancel.is_cancelled();
        };

        let Some(message) = reading.warning_message.clone() else {
            self.record(reading).await;
            return true;
        };

        // The task ends after this tick, so a breaching reading gets one
        // immediate second attempt instead of waiting for the next tick.
        if !self.record(reading).await && !self.flush_pending().await {
            self.publish(MonitorEventKind::ThresholdWarning {
                reading: None,
                message: message.clone(),
            });
        }
        self.critical_shutdown(message);
        false
    }

    /// Retry the parked reading once. Returns `false`, dropping it, if the
    /// append fails again.
    async fn flush_pending(&mut self) -> bool {
        let Some(parked) = self.pending.take() else {
            return true;
        };
        if self.record(parked).await {
            return true;
        }
        if let Some(lost) = self.pending.take() {
            tracing::error!(
                sensor_id = %self.sensor_id,
                timestamp = %lost.timestamp,
                temperature = lost.temperature,
                pressure = lost.pressure,
                "Reading lost at shutdown",
            );
            self.publish(MonitorEventKind::StoreFailure {
                error: format!("reading at {} was not stored before shutdown", lost.timestamp),
            });
        }
        false
    }

    fn is_active(&self) -> bool {
        lock(&self.state).status == SamplerStatus::Active
    }

    /// Derive and classify the next sample, or `None` when not active.
    fn produce(&mut self) -> Option<NewReading> {
        let mut state = lock(&self.state);
        if state.status != SamplerStatus::Active || self.cancel.is_cancelled() {
            return None;
        }

        let next = self.source.next(state.last, state.motor_on);
        state.last = next;

        // Wall clock may step backwards; keep this session's stream non-decreasing.
        let now = Utc::now();
        let timestamp = match state.last_timestamp {
            Some(prev) if prev > now => prev,
            _ => now,
        };
        state.last_timestamp = Some(timestamp);

        Some(NewReading::evaluated(
            self.sensor_id.clone(),
            next,
            state.motor_on,
            &state.thresholds,
            timestamp,
        ))
    }

    /// Append `reading` and publish its events. Returns `false` if the
    /// append failed and the reading was parked for retry.
    async fn record(&mut self, reading: NewReading) -> bool {
        match self.ctx.store.append(reading.clone()).await {
            Ok(stored) => {
                tracing::debug!(
                    sensor_id = %self.sensor_id,
                    temperature = stored.temperature,
                    pressure = stored.pressure,
                    motor_on = stored.motor_on,
                    "Reading recorded",
                );
                let warning = stored.warning_message.clone();
                self.publish(MonitorEventKind::ReadingRecorded {
                    reading: stored.clone(),
                });
                if let Some(message) = warning {
                    tracing::warn!(sensor_id = %self.sensor_id, %message, "Threshold warning");
                    self.publish(MonitorEventKind::ThresholdWarning {
                        reading: Some(stored),
                        message,
                    });
                }
                true
            }
            Err(e) => {
                tracing::error!(
                    sensor_id = %self.sensor_id,
                    error = %e,
                    "Failed to append reading, retrying next tick",
                );
                self.publish(MonitorEventKind::StoreFailure {
                    error: e.to_string(),
                });
                self.pending = Some(reading);
                false
            }
        }
    }

    /// Move the session to `Stopped` after a threshold breach.
    fn critical_shutdown(&mut self, message: String) {
        let tripped = {
            let mut state = lock(&self.state);
            if state.status.is_running() {
                state.status = SamplerStatus::Stopped;
                state.stop_reason = Some(StopReason::CriticalShutdown);
                true
            } else {
                false
            }
        };
        self.cancel.cancel();

        if !tripped {
            return;
        }

        tracing::error!(
            sensor_id = %self.sensor_id,
            %message,
            "Critical threshold breach, shutting down sampler",
        );
        self.publish(MonitorEventKind::CriticalShutdown { message });
        self.publish(MonitorEventKind::LifecycleChanged {
            status: SamplerStatus::Stopped,
            reason: Some(StopReason::CriticalShutdown),
        });
    }

    fn publish(&self, kind: MonitorEventKind) {
        self.ctx
            .events
            .publish(MonitorEvent::new(self.sensor_id.clone(), kind));
    }
}
