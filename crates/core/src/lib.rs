//! Pure domain logic for the process monitor.
//!
//! Nothing in this crate performs I/O or owns a runtime. The sampler,
//! stores, and event bus live in sibling crates and call into these
//! modules for threshold evaluation, trend aggregation, and validation.

pub mod error;
pub mod lifecycle;
pub mod reading;
pub mod sensor;
pub mod thresholds;
pub mod trend;
pub mod types;
pub mod validation;
