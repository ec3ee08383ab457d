use crate::lifecycle::{LifecycleAction, SamplerStatus};

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Sensor not found: {0}")]
    SensorNotFound(String),

    #[error("Cannot {action} sampler for sensor {sensor_id}: sampler is {status}")]
    InvalidLifecycleTransition {
        sensor_id: String,
        action: LifecycleAction,
        status: SamplerStatus,
    },

    #[error("No readings available for sensor: {0}")]
    NoDataAvailable(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Reading store error: {0}")]
    Store(String),
}
