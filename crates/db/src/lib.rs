//! Reading store and sensor registry abstractions.
//!
//! The monitor core only talks to the [`ReadingStore`] and
//! [`SensorRegistry`] traits. The in-memory adapters in [`repositories`]
//! back the CLI and the test suites; a durable adapter implements the same
//! traits.

pub mod error;
pub mod repositories;
pub mod store;

pub use error::StoreError;
pub use repositories::{MemoryReadingStore, MemorySensorRegistry};
pub use store::{ReadingStore, SensorRegistry};
