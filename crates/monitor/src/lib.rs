//! `scada-monitor` library crate.
//!
//! The sampling / alerting engine: a per-sensor background [`Sampler`],
//! pluggable measurement sources, and the [`MonitorService`] façade that
//! exposes lifecycle control, direct ingestion, and trend queries. The
//! interactive operator binary lives in `main.rs`.

pub mod cli;
pub mod config;
pub mod sampler;
pub mod service;
pub mod source;

pub use config::MonitorConfig;
pub use sampler::{Sampler, SamplerContext, SamplerSnapshot};
pub use service::MonitorService;
pub use source::{MeasurementSource, RandomWalk};
