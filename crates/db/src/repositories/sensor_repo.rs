//! In-memory [`SensorRegistry`].

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use scada_core::sensor::{MotorChange, Sensor, ThresholdUpdate};
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::store::SensorRegistry;

/// Sensor registry kept in process memory, ordered by sensor id.
#[derive(Debug, Default)]
pub struct MemorySensorRegistry {
    sensors: RwLock<BTreeMap<String, Sensor>>,
}

impl MemorySensorRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SensorRegistry for MemorySensorRegistry {
    async fn get(&self, sensor_id: &str) -> Result<Option<Sensor>, StoreError> {
        Ok(self.sensors.read().await.get(sensor_id).cloned())
    }

    async fn list(&self) -> Result<Vec<Sensor>, StoreError> {
        Ok(self.sensors.read().await.values().cloned().collect())
    }

    async fn insert(&self, sensor: Sensor) -> Result<Sensor, StoreError> {
        let mut sensors = self.sensors.write().await;
        if sensors.contains_key(&sensor.sensor_id) {
            return Err(StoreError::Conflict(sensor.sensor_id));
        }
        sensors.insert(sensor.sensor_id.clone(), sensor.clone());
        Ok(sensor)
    }

    async fn update_thresholds(
        &self,
        sensor_id: &str,
        update: ThresholdUpdate,
    ) -> Result<Sensor, StoreError> {
        let mut sensors = self.sensors.write().await;
        let sensor = sensors
            .get_mut(sensor_id)
            .ok_or_else(|| StoreError::NotFound(sensor_id.to_string()))?;
        sensor
            .apply_thresholds(update, Utc::now())
            .map_err(|e| StoreError::Rejected(e.to_string()))?;
        Ok(sensor.clone())
    }

    async fn set_motor(
        &self,
        sensor_id: &str,
        motor_on: bool,
    ) -> Result<(Sensor, MotorChange), StoreError> {
        let mut sensors = self.sensors.write().await;
        let sensor = sensors
            .get_mut(sensor_id)
            .ok_or_else(|| StoreError::NotFound(sensor_id.to_string()))?;
        let change = sensor.set_motor(motor_on, Utc::now());
        Ok((sensor.clone(), change))
    }

    async fn delete(&self, sensor_id: &str) -> Result<bool, StoreError> {
        Ok(self.sensors.write().await.remove(sensor_id).is_some())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
