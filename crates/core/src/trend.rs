//! Trend aggregation over a window of readings.
//!
//! Pure logic. The caller fetches the window (most recent N readings for a
//! sensor) and passes it in; nothing here assumes the window is sorted.

use serde::Serialize;

use crate::error::CoreError;
use crate::reading::Reading;
use crate::types::Timestamp;

/// Window size used by `trend` when the caller gives no usable limit.
pub const DEFAULT_TREND_LIMIT: usize = 100;

/// Summary statistics over a window of readings. Never cached.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendSummary {
    pub sensor_id: String,
    /// Number of readings examined.
    pub total_readings: usize,
    pub avg_temperature: f64,
    pub min_temperature: f64,
    pub max_temperature: f64,
    pub avg_pressure: f64,
    pub min_pressure: f64,
    pub max_pressure: f64,
    /// Readings with either warning flag set.
    pub warning_count: usize,
    /// Earliest timestamp in the window.
    pub start_time: Timestamp,
    /// Latest timestamp in the window.
    pub end_time: Timestamp,
}

/// Running accumulator for a single pass over the window.
struct Accumulator {
    count: usize,
    sum_temp: f64,
    min_temp: f64,
    max_temp: f64,
    sum_pressure: f64,
    min_pressure: f64,
    max_pressure: f64,
    warnings: usize,
    earliest: Timestamp,
    latest: Timestamp,
}

impl Accumulator {
    fn seed(first: &Reading) -> Self {
        Self {
            count: 0,
            sum_temp: 0.0,
            min_temp: first.temperature,
            max_temp: first.temperature,
            sum_pressure: 0.0,
            min_pressure: first.pressure,
            max_pressure: first.pressure,
            warnings: 0,
            earliest: first.timestamp,
            latest: first.timestamp,
        }
    }

    fn push(&mut self, r: &Reading) {
        self.count += 1;
        self.sum_temp += r.temperature;
        self.min_temp = self.min_temp.min(r.temperature);
        self.max_temp = self.max_temp.max(r.temperature);
        self.sum_pressure += r.pressure;
        self.min_pressure = self.min_pressure.min(r.pressure);
        self.max_pressure = self.max_pressure.max(r.pressure);
        if r.is_warning() {
            self.warnings += 1;
        }
        self.earliest = self.earliest.min(r.timestamp);
        self.latest = self.latest.max(r.timestamp);
    }
}

/// Summarize `window` for `sensor_id`.
///
/// Averages are plain `sum / count` with no rounding. Earliest / latest are
/// the min / max timestamps within the window, independent of its order.
///
/// Returns [`CoreError::NoDataAvailable`] for an empty window.
pub fn summarize(sensor_id: &str, window: &[Reading]) -> Result<TrendSummary, CoreError> {
    let Some(first) = window.first() else {
        return Err(CoreError::NoDataAvailable(sensor_id.to_string()));
    };

    let mut acc = Accumulator::seed(first);
    for reading in window {
        acc.push(reading);
    }

    let n = acc.count as f64;
    Ok(TrendSummary {
        sensor_id: sensor_id.to_string(),
        total_readings: acc.count,
        avg_temperature: acc.sum_temp / n,
        min_temperature: acc.min_temp,
        max_temperature: acc.max_temp,
        avg_pressure: acc.sum_pressure / n,
        min_pressure: acc.min_pressure,
        max_pressure: acc.max_pressure,
        warning_count: acc.warnings,
        start_time: acc.earliest,
        end_time: acc.latest,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::*;

    fn reading(id: i64, temp: f64, pressure: f64, secs: i64, warn: bool) -> Reading {
        Reading {
            id,
            sensor_id: "S1".to_string(),
            temperature: temp,
            pressure,
            motor_on: false,
            timestamp: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
                + Duration::seconds(secs),
            temp_warning: warn,
            pressure_warning: false,
            warning_message: None,
        }
    }

    #[test]
    fn empty_window_is_no_data() {
        let err = summarize("S1", &[]).unwrap_err();
        assert!(matches!(err, CoreError::NoDataAvailable(id) if id == "S1"));
    }

    #[test]
    fn statistics_over_known_window() {
        let window = vec![
            reading(3, 20.0, 26.0, 2, true),
            reading(2, 26.0, 10.0, 1, true),
            reading(1, 20.0, 10.0, 0, false),
        ];
        let s = summarize("S1", &window).unwrap();

        assert_eq!(s.total_readings, 3);
        assert!((s.avg_temperature - 22.0).abs() < 1e-9);
        assert_eq!(s.min_temperature, 20.0);
        assert_eq!(s.max_temperature, 26.0);
        assert!((s.avg_pressure - 46.0 / 3.0).abs() < 1e-9);
        assert_eq!(s.min_pressure, 10.0);
        assert_eq!(s.max_pressure, 26.0);
        assert_eq!(s.warning_count, 2);
    }

    #[test]
    fn time_span_ignores_window_order() {
        // Deliberately unsorted: the earliest reading sits in the middle.
        let window = vec![
            reading(1, 1.0, 1.0, 5, false),
            reading(2, 1.0, 1.0, -10, false),
            reading(3, 1.0, 1.0, 30, false),
        ];
        let s = summarize("S1", &window).unwrap();
        assert_eq!(s.start_time, window[1].timestamp);
        assert_eq!(s.end_time, window[2].timestamp);
    }

    #[test]
    fn negative_values_produce_correct_extremes() {
        let window = vec![
            reading(1, -5.0, -1.0, 0, false),
            reading(2, -15.0, -3.0, 1, false),
        ];
        let s = summarize("S1", &window).unwrap();
        assert_eq!(s.max_temperature, -5.0);
        assert_eq!(s.min_temperature, -15.0);
        assert_eq!(s.max_pressure, -1.0);
    }

    #[test]
    fn single_reading_window() {
        let s = summarize("S1", &[reading(1, 21.5, 12.0, 0, false)]).unwrap();
        assert_eq!(s.total_readings, 1);
        assert_eq!(s.avg_temperature, 21.5);
        assert_eq!(s.start_time, s.end_time);
        assert_eq!(s.warning_count, 0);
    }
}
