//! Monitor event bus.
//!
//! The sampler and the lifecycle controller publish [`MonitorEvent`]s here;
//! any presentation layer (CLI, API, alerting) subscribes independently.

pub mod bus;

pub use bus::{EventBus, MonitorEvent, MonitorEventKind};
