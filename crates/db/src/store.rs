//! Storage traits consumed by the monitor core.

use async_trait::async_trait;
use scada_core::reading::{NewReading, Reading};
use scada_core::sensor::{MotorChange, Sensor, ThresholdUpdate};
use scada_core::types::Timestamp;

use crate::error::StoreError;

/// Time-ordered readings per sensor.
///
/// Implementations must tolerate concurrent appends and reads, and must not
/// assume appends arrive in timestamp order (bulk submissions may be out of
/// order). Query results are ordered by timestamp, most recent first.
#[async_trait]
pub trait ReadingStore: Send + Sync {
    /// Append a reading and return it with its assigned id.
    async fn append(&self, reading: NewReading) -> Result<Reading, StoreError>;

    /// The `limit` most recent readings for a sensor.
    async fn recent(&self, sensor_id: &str, limit: usize) -> Result<Vec<Reading>, StoreError>;

    /// Readings for a sensor with `start <= timestamp <= end`.
    async fn range(
        &self,
        sensor_id: &str,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<Vec<Reading>, StoreError>;

    /// The `limit` most recent warning readings, for one sensor or all.
    async fn warnings(
        &self,
        sensor_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Reading>, StoreError>;

    /// Full history, for one sensor or across all sensors. Unbounded.
    async fn all(&self, sensor_id: Option<&str>) -> Result<Vec<Reading>, StoreError>;

    /// Delete every reading for a sensor. Returns the number removed.
    async fn delete_for_sensor(&self, sensor_id: &str) -> Result<u64, StoreError>;
}

/// Registered sensors keyed by their immutable identifier.
#[async_trait]
pub trait SensorRegistry: Send + Sync {
    /// Look up a sensor. `Ok(None)` when it is not registered.
    async fn get(&self, sensor_id: &str) -> Result<Option<Sensor>, StoreError>;

    /// All sensors, ordered by identifier.
    async fn list(&self) -> Result<Vec<Sensor>, StoreError>;

    /// Register a sensor. Fails with [`StoreError::Conflict`] on a duplicate id.
    async fn insert(&self, sensor: Sensor) -> Result<Sensor, StoreError>;

    /// Apply a partial threshold update and return the updated sensor.
    async fn update_thresholds(
        &self,
        sensor_id: &str,
        update: ThresholdUpdate,
    ) -> Result<Sensor, StoreError>;

    /// Set the motor flag and report whether it changed.
    async fn set_motor(
        &self,
        sensor_id: &str,
        motor_on: bool,
    ) -> Result<(Sensor, MotorChange), StoreError>;

    /// Remove a sensor. Returns `false` if it was not registered.
    async fn delete(&self, sensor_id: &str) -> Result<bool, StoreError>;
}
