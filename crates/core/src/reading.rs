//! Reading entity, the DTOs that produce it, and query limit policy.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::sensor::Thresholds;
use crate::thresholds::evaluate;
use crate::types::{DbId, Timestamp};
use crate::validation::validate_finite;

/// Window used by `recent` when the caller gives no usable limit.
pub const DEFAULT_RECENT_LIMIT: usize = 10;

/// Window used by `warnings` when the caller gives no usable limit.
pub const DEFAULT_WARNINGS_LIMIT: usize = 50;

/// A raw temperature / pressure pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    /// Temperature in °C.
    pub temperature: f64,
    /// Pressure in PSI.
    pub pressure: f64,
}

impl Measurement {
    pub fn new(temperature: f64, pressure: f64) -> Self {
        Self {
            temperature,
            pressure,
        }
    }
}

/// A stored sample. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reading {
    pub id: DbId,
    pub sensor_id: String,
    pub temperature: f64,
    pub pressure: f64,
    pub motor_on: bool,
    pub timestamp: Timestamp,
    pub temp_warning: bool,
    pub pressure_warning: bool,
    pub warning_message: Option<String>,
}

impl Reading {
    /// Whether either warning flag is set.
    pub fn is_warning(&self) -> bool {
        self.temp_warning || self.pressure_warning
    }
}

/// DTO for appending a reading to a store. The store assigns `id`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewReading {
    pub sensor_id: String,
    pub temperature: f64,
    pub pressure: f64,
    pub motor_on: bool,
    pub timestamp: Timestamp,
    pub temp_warning: bool,
    pub pressure_warning: bool,
    pub warning_message: Option<String>,
}

impl NewReading {
    /// Classify `measurement` against `thresholds` and build the reading.
    pub fn evaluated(
        sensor_id: impl Into<String>,
        measurement: Measurement,
        motor_on: bool,
        thresholds: &Thresholds,
        timestamp: Timestamp,
    ) -> Self {
        let verdict = evaluate(measurement.temperature, measurement.pressure, thresholds);
        Self {
            sensor_id: sensor_id.into(),
            temperature: measurement.temperature,
            pressure: measurement.pressure,
            motor_on,
            timestamp,
            temp_warning: verdict.temp_warning,
            pressure_warning: verdict.pressure_warning,
            warning_message: verdict.message,
        }
    }

    /// Whether either warning flag is set.
    pub fn is_warning(&self) -> bool {
        self.temp_warning || self.pressure_warning
    }

    /// Attach a store-assigned id.
    pub fn into_reading(self, id: DbId) -> Reading {
        Reading {
            id,
            sensor_id: self.sensor_id,
            temperature: self.temperature,
            pressure: self.pressure,
            motor_on: self.motor_on,
            timestamp: self.timestamp,
            temp_warning: self.temp_warning,
            pressure_warning: self.pressure_warning,
            warning_message: self.warning_message,
        }
    }
}

/// DTO for direct (non-sampler) reading submission.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitReading {
    pub sensor_id: String,
    pub temperature: f64,
    pub pressure: f64,
    #[serde(default)]
    pub motor_on: bool,
}

impl SubmitReading {
    /// Reject non-finite measurement values.
    pub fn validate(&self) -> Result<(), CoreError> {
        validate_finite(self.temperature, "temperature")?;
        validate_finite(self.pressure, "pressure")?;
        Ok(())
    }

    pub fn measurement(&self) -> Measurement {
        Measurement::new(self.temperature, self.pressure)
    }
}

/// Resolve a caller-supplied limit: absent or non-positive falls back to `default`.
pub fn resolve_limit(limit: Option<i64>, default: usize) -> usize {
    match limit {
        Some(n) if n > 0 => usize::try_from(n).unwrap_or(usize::MAX),
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    #[test]
    fn evaluated_reading_carries_verdict() {
        let reading = NewReading::evaluated(
            "S1",
            Measurement::new(26.0, 10.0),
            true,
            &Thresholds::default(),
            Utc::now(),
        );
        assert!(reading.temp_warning);
        assert!(!reading.pressure_warning);
        assert!(reading.motor_on);
        assert!(reading.warning_message.is_some());

        let stored = reading.into_reading(7);
        assert_eq!(stored.id, 7);
        assert!(stored.is_warning());
    }

    #[test]
    fn submit_rejects_nan() {
        let submit = SubmitReading {
            sensor_id: "S1".into(),
            temperature: f64::NAN,
            pressure: 1.0,
            motor_on: false,
        };
        assert!(submit.validate().is_err());
    }

    #[test]
    fn limit_falls_back_to_default() {
        assert_eq!(resolve_limit(None, 10), 10);
        assert_eq!(resolve_limit(Some(0), 10), 10);
        assert_eq!(resolve_limit(Some(-3), 50), 50);
        assert_eq!(resolve_limit(Some(3), 10), 3);
    }
}
