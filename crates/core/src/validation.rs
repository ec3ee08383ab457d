//! Shared input validation helpers.
//!
//! Used by sensor registration, threshold updates, and direct reading
//! submission. Every failure is a `CoreError::Validation` naming the field.

use crate::error::CoreError;

/// Maximum accepted length of a sensor identifier.
pub const MAX_SENSOR_ID_LEN: usize = 64;

/// Validate that a numeric input is finite (not NaN or infinite).
pub fn validate_finite(value: f64, name: &str) -> Result<(), CoreError> {
    if !value.is_finite() {
        return Err(CoreError::Validation(format!(
            "{name} must be a finite number, got {value}"
        )));
    }
    Ok(())
}

/// Validate a sensor identifier: non-blank and at most [`MAX_SENSOR_ID_LEN`] chars.
pub fn validate_sensor_id(sensor_id: &str) -> Result<(), CoreError> {
    if sensor_id.trim().is_empty() {
        return Err(CoreError::Validation(
            "sensor_id must not be empty".to_string(),
        ));
    }
    if sensor_id.chars().count() > MAX_SENSOR_ID_LEN {
        return Err(CoreError::Validation(format!(
            "sensor_id must be at most {MAX_SENSOR_ID_LEN} characters"
        )));
    }
    Ok(())
}
