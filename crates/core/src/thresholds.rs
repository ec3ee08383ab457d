//! Threshold evaluation for temperature / pressure measurements.
//!
//! Pure logic. The caller resolves the sensor's thresholds (substituting
//! defaults where none are configured) and passes them in.

use serde::Serialize;

use crate::sensor::Thresholds;

/// Separator placed between per-channel messages when both channels warn.
pub const WARNING_DELIMITER: &str = " | ";

/// Result of evaluating one measurement against a sensor's thresholds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Verdict {
    pub temp_warning: bool,
    pub pressure_warning: bool,
    /// Human-readable description of every breached channel, or `None`.
    pub message: Option<String>,
}

impl Verdict {
    /// Whether either channel breached its threshold.
    pub fn is_warning(&self) -> bool {
        self.temp_warning || self.pressure_warning
    }
}

/// Evaluate a temperature / pressure pair against `thresholds`.
///
/// Boundaries are inclusive: a value exactly at its threshold warns.
pub fn evaluate(temperature: f64, pressure: f64, thresholds: &Thresholds) -> Verdict {
    let temp_warning = temperature >= thresholds.temperature;
    let pressure_warning = pressure >= thresholds.pressure;

    let mut messages = Vec::with_capacity(2);
    if temp_warning {
        messages.push(format!(
            "HIGH TEMPERATURE WARNING: {temperature:?}°C >= {:?}°C",
            thresholds.temperature
        ));
    }
    if pressure_warning {
        messages.push(format!(
            "HIGH PRESSURE WARNING: {pressure:?} PSI >= {:?} PSI",
            thresholds.pressure
        ));
    }

    let message = if messages.is_empty() {
        None
    } else {
        Some(messages.join(WARNING_DELIMITER))
    };

    Verdict {
        temp_warning,
        pressure_warning,
        message,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn thresholds() -> Thresholds {
        Thresholds {
            temperature: 25.0,
            pressure: 25.0,
        }
    }

    #[test]
    fn no_warning_below_thresholds() {
        let v = evaluate(20.0, 10.0, &thresholds());
        assert!(!v.temp_warning);
        assert!(!v.pressure_warning);
        assert!(v.message.is_none());
        assert!(!v.is_warning());
    }

    #[test]
    fn boundary_is_inclusive() {
        let at = evaluate(25.0, 25.0, &thresholds());
        assert!(at.temp_warning);
        assert!(at.pressure_warning);

        let below = evaluate(24.0, 24.0, &thresholds());
        assert!(!below.temp_warning);
        assert!(!below.pressure_warning);
    }

    #[test]
    fn temperature_only_message() {
        let v = evaluate(26.0, 10.0, &thresholds());
        assert!(v.temp_warning);
        assert!(!v.pressure_warning);
        assert_eq!(
            v.message.as_deref(),
            Some("HIGH TEMPERATURE WARNING: 26.0°C >= 25.0°C")
        );
    }

    #[test]
    fn message_keeps_full_precision() {
        let v = evaluate(25.04, 10.0, &thresholds());
        assert_eq!(
            v.message.as_deref(),
            Some("HIGH TEMPERATURE WARNING: 25.04°C >= 25.0°C")
        );

        let p = evaluate(0.0, 31.125, &thresholds());
        assert_eq!(
            p.message.as_deref(),
            Some("HIGH PRESSURE WARNING: 31.125 PSI >= 25.0 PSI")
        );
    }

    #[test]
    fn both_channels_are_joined_with_delimiter() {
        let v = evaluate(30.0, 26.0, &thresholds());
        let message = v.message.expect("both channels warn");
        let parts: Vec<&str> = message.split(WARNING_DELIMITER).collect();
        assert_eq!(parts.len(), 2);
        assert!(parts[0].starts_with("HIGH TEMPERATURE WARNING"));
        assert!(parts[1].starts_with("HIGH PRESSURE WARNING"));
    }

    #[test]
    fn flags_match_comparison_over_a_grid() {
        let t = thresholds();
        for temp in [-10.0, 0.0, 24.9, 25.0, 25.1, 100.0] {
            for pressure in [0.0, 24.99, 25.0, 50.0] {
                let v = evaluate(temp, pressure, &t);
                assert_eq!(v.temp_warning, temp >= t.temperature);
                assert_eq!(v.pressure_warning, pressure >= t.pressure);
            }
        }
    }
}
