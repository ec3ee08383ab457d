//! In-memory repository adapters.
//!
//! Each adapter owns its data behind a `tokio::sync::RwLock` and is meant to
//! be shared as `Arc<dyn ReadingStore>` / `Arc<dyn SensorRegistry>`.

pub mod reading_repo;
pub mod sensor_repo;

pub use reading_repo::MemoryReadingStore;
pub use sensor_repo::MemorySensorRegistry;
