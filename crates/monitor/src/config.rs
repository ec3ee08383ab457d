use std::str::FromStr;
use std::time::Duration;

use scada_core::reading::{Measurement, DEFAULT_RECENT_LIMIT, DEFAULT_WARNINGS_LIMIT};
use scada_core::sensor::{Thresholds, DEFAULT_PRESSURE_THRESHOLD, DEFAULT_TEMP_THRESHOLD};
use scada_core::trend::DEFAULT_TREND_LIMIT;

/// Default sampler tick: one reading per second.
const DEFAULT_TICK_MS: u64 = 1000;

/// Monitor configuration loaded from environment variables.
///
/// All fields have defaults matching the single-sensor prototype, so an
/// empty environment yields a working monitor.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Sampler tick interval.
    pub tick: Duration,
    /// Window for `trend` when no limit is given.
    pub trend_default_limit: usize,
    /// Window for `recent` when no limit is given.
    pub recent_default_limit: usize,
    /// Window for `warnings` when no limit is given.
    pub warnings_default_limit: usize,
    /// Thresholds substituted when a registration omits them.
    pub default_thresholds: Thresholds,
    /// Starting point of every new sampler session.
    pub initial: Measurement,
    /// Sensor registered by the operator CLI.
    pub sensor_id: String,
    pub sensor_name: String,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(DEFAULT_TICK_MS),
            trend_default_limit: DEFAULT_TREND_LIMIT,
            recent_default_limit: DEFAULT_RECENT_LIMIT,
            warnings_default_limit: DEFAULT_WARNINGS_LIMIT,
            default_thresholds: Thresholds {
                temperature: DEFAULT_TEMP_THRESHOLD,
                pressure: DEFAULT_PRESSURE_THRESHOLD,
            },
            initial: Measurement::new(17.0, 12.0),
            sensor_id: "S1".to_string(),
            sensor_name: "Main Motor".to_string(),
        }
    }
}

impl MonitorConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                      | Default      |
    /// |------------------------------|--------------|
    /// | `SAMPLER_TICK_MS`            | `1000`       |
    /// | `TREND_DEFAULT_LIMIT`        | `100`        |
    /// | `RECENT_DEFAULT_LIMIT`       | `10`         |
    /// | `WARNINGS_DEFAULT_LIMIT`     | `50`         |
    /// | `DEFAULT_TEMP_THRESHOLD`     | `25.0`       |
    /// | `DEFAULT_PRESSURE_THRESHOLD` | `25.0`       |
    /// | `INITIAL_TEMPERATURE`        | `17.0`       |
    /// | `INITIAL_PRESSURE`           | `12.0`       |
    /// | `SENSOR_ID`                  | `S1`         |
    /// | `SENSOR_NAME`                | `Main Motor` |
    ///
    /// Unparseable values are logged and replaced by the default.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let tick_ms: u64 = env_or("SAMPLER_TICK_MS", DEFAULT_TICK_MS).max(1);

        Self {
            tick: Duration::from_millis(tick_ms),
            trend_default_limit: positive_or("TREND_DEFAULT_LIMIT", defaults.trend_default_limit),
            recent_default_limit: positive_or(
                "RECENT_DEFAULT_LIMIT",
                defaults.recent_default_limit,
            ),
            warnings_default_limit: positive_or(
                "WARNINGS_DEFAULT_LIMIT",
                defaults.warnings_default_limit,
            ),
            default_thresholds: Thresholds {
                temperature: finite_or(
                    "DEFAULT_TEMP_THRESHOLD",
                    defaults.default_thresholds.temperature,
                ),
                pressure: finite_or(
                    "DEFAULT_PRESSURE_THRESHOLD",
                    defaults.default_thresholds.pressure,
                ),
            },
            initial: Measurement::new(
                finite_or("INITIAL_TEMPERATURE", defaults.initial.temperature),
                finite_or("INITIAL_PRESSURE", defaults.initial.pressure),
            ),
            sensor_id: std::env::var("SENSOR_ID").unwrap_or(defaults.sensor_id),
            sensor_name: std::env::var("SENSOR_NAME").unwrap_or(defaults.sensor_name),
        }
    }
}

/// Read and parse `key`, falling back to `default` when unset or invalid.
fn env_or<T: FromStr + Copy>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "Invalid configuration value, using default");
            default
        }),
        Err(_) => default,
    }
}

fn positive_or(key: &str, default: usize) -> usize {
    match env_or(key, default) {
        0 => default,
        n => n,
    }
}

fn finite_or(key: &str, default: f64) -> f64 {
    let value = env_or(key, default);
    if value.is_finite() {
        value
    } else {
        tracing::warn!(key, "Non-finite configuration value, using default");
        default
    }
}
