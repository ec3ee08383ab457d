//! Monitored sensor entity and its registration / update DTOs.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::Timestamp;
use crate::validation::{validate_finite, validate_sensor_id};

/// Temperature threshold (°C) used when a registration omits one.
pub const DEFAULT_TEMP_THRESHOLD: f64 = 25.0;

/// Pressure threshold (PSI) used when a registration omits one.
pub const DEFAULT_PRESSURE_THRESHOLD: f64 = 25.0;

/// Warning thresholds for a sensor. A value at or above a threshold warns.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Temperature threshold in °C.
    pub temperature: f64,
    /// Pressure threshold in PSI.
    pub pressure: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMP_THRESHOLD,
            pressure: DEFAULT_PRESSURE_THRESHOLD,
        }
    }
}

/// A registered sensor.
///
/// `sensor_id` never changes after registration. Only the thresholds and
/// the motor flag are mutable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sensor {
    pub sensor_id: String,
    pub name: String,
    pub motor_on: bool,
    pub thresholds: Thresholds,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for registering a new sensor.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewSensor {
    pub sensor_id: String,
    pub name: String,
    #[serde(default)]
    pub motor_on: Option<bool>,
    #[serde(default)]
    pub temp_threshold: Option<f64>,
    #[serde(default)]
    pub pressure_threshold: Option<f64>,
}

/// DTO for a partial threshold update. `None` leaves a threshold unchanged.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ThresholdUpdate {
    #[serde(default)]
    pub temp_threshold: Option<f64>,
    #[serde(default)]
    pub pressure_threshold: Option<f64>,
}

/// Outcome of a motor on/off request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MotorChange {
    /// The motor flag flipped to `motor_on`.
    Switched { motor_on: bool },
    /// The motor was already in the requested state.
    Unchanged { motor_on: bool },
}

impl Sensor {
    /// Build a sensor from a registration request.
    ///
    /// Missing thresholds are replaced by `defaults`; a missing motor flag
    /// defaults to off.
    pub fn from_new(
        new: NewSensor,
        defaults: Thresholds,
        now: Timestamp,
    ) -> Result<Self, CoreError> {
        validate_sensor_id(&new.sensor_id)?;
        if new.name.trim().is_empty() {
            return Err(CoreError::Validation("name must not be empty".to_string()));
        }

        let thresholds = Thresholds {
            temperature: new.temp_threshold.unwrap_or(defaults.temperature),
            pressure: new.pressure_threshold.unwrap_or(defaults.pressure),
        };
        validate_finite(thresholds.temperature, "temp_threshold")?;
        validate_finite(thresholds.pressure, "pressure_threshold")?;

        Ok(Self {
            sensor_id: new.sensor_id,
            name: new.name,
            motor_on: new.motor_on.unwrap_or(false),
            thresholds,
            created_at: now,
            updated_at: now,
        })
    }

    /// Apply a partial threshold update, validating each supplied value.
    ///
    /// Nothing is changed if any supplied value is invalid.
    pub fn apply_thresholds(
        &mut self,
        update: ThresholdUpdate,
        now: Timestamp,
    ) -> Result<(), CoreError> {
        if let Some(t) = update.temp_threshold {
            validate_finite(t, "temp_threshold")?;
        }
        if let Some(p) = update.pressure_threshold {
            validate_finite(p, "pressure_threshold")?;
        }

        if let Some(t) = update.temp_threshold {
            self.thresholds.temperature = t;
        }
        if let Some(p) = update.pressure_threshold {
            self.thresholds.pressure = p;
        }
        self.updated_at = now;
        Ok(())
    }

    /// Set the motor flag and report whether it actually changed.
    pub fn set_motor(&mut self, motor_on: bool, now: Timestamp) -> MotorChange {
        if self.motor_on == motor_on {
            return MotorChange::Unchanged { motor_on };
        }
        self.motor_on = motor_on;
        self.updated_at = now;
        MotorChange::Switched { motor_on }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn new_sensor() -> NewSensor {
        NewSensor {
            sensor_id: "S1".to_string(),
            name: "Boiler".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn registration_substitutes_default_thresholds() {
        let sensor = Sensor::from_new(new_sensor(), Thresholds::default(), Utc::now()).unwrap();
        assert_eq!(sensor.thresholds, Thresholds::default());
        assert!(!sensor.motor_on);
    }

    #[test]
    fn registration_keeps_explicit_thresholds() {
        let new = NewSensor {
            temp_threshold: Some(80.0),
            pressure_threshold: Some(40.0),
            motor_on: Some(true),
            ..new_sensor()
        };
        let sensor = Sensor::from_new(new, Thresholds::default(), Utc::now()).unwrap();
        assert_eq!(sensor.thresholds.temperature, 80.0);
        assert_eq!(sensor.thresholds.pressure, 40.0);
        assert!(sensor.motor_on);
    }

    #[test]
    fn registration_rejects_non_finite_threshold() {
        let new = NewSensor {
            temp_threshold: Some(f64::NAN),
            ..new_sensor()
        };
        assert!(Sensor::from_new(new, Thresholds::default(), Utc::now()).is_err());
    }

    #[test]
    fn partial_update_leaves_other_threshold() {
        let mut sensor =
            Sensor::from_new(new_sensor(), Thresholds::default(), Utc::now()).unwrap();
        sensor
            .apply_thresholds(
                ThresholdUpdate {
                    temp_threshold: Some(30.0),
                    pressure_threshold: None,
                },
                Utc::now(),
            )
            .unwrap();
        assert_eq!(sensor.thresholds.temperature, 30.0);
        assert_eq!(sensor.thresholds.pressure, DEFAULT_PRESSURE_THRESHOLD);
    }

    #[test]
    fn invalid_update_changes_nothing() {
        let mut sensor =
            Sensor::from_new(new_sensor(), Thresholds::default(), Utc::now()).unwrap();
        let result = sensor.apply_thresholds(
            ThresholdUpdate {
                temp_threshold: Some(30.0),
                pressure_threshold: Some(f64::INFINITY),
            },
            Utc::now(),
        );
        assert!(result.is_err());
        assert_eq!(sensor.thresholds, Thresholds::default());
    }

    #[test]
    fn motor_off_when_already_off_is_unchanged() {
        let mut sensor =
            Sensor::from_new(new_sensor(), Thresholds::default(), Utc::now()).unwrap();
        assert_eq!(
            sensor.set_motor(false, Utc::now()),
            MotorChange::Unchanged { motor_on: false }
        );
        assert_eq!(
            sensor.set_motor(true, Utc::now()),
            MotorChange::Switched { motor_on: true }
        );
    }
}
