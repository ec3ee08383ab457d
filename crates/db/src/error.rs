use scada_core::error::CoreError;

/// Failure reported by a [`ReadingStore`](crate::ReadingStore) or
/// [`SensorRegistry`](crate::SensorRegistry) adapter.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    /// The referenced sensor does not exist.
    #[error("Sensor not found: {0}")]
    NotFound(String),

    /// A sensor with the same identifier already exists.
    #[error("Sensor already exists: {0}")]
    Conflict(String),

    /// The adapter refused the change (e.g. a non-finite threshold).
    #[error("Rejected: {0}")]
    Rejected(String),

    /// Transient failure reaching the backing storage.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => CoreError::SensorNotFound(id),
            StoreError::Conflict(id) => {
                CoreError::Conflict(format!("Sensor with ID {id} already exists"))
            }
            StoreError::Rejected(msg) => CoreError::Validation(msg),
            StoreError::Unavailable(msg) => CoreError::Store(msg),
        }
    }
}
