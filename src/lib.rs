//! Control Metrics - instrumentation for a query-processing controller
//!
//! Records, for every query handled by the controller, how long each
//! lifecycle phase takes and how many queries occupy it right now, and
//! tallies terminal outcomes and per-function usage. Values are exported
//! through the `prometheus` crate for a scraping backend.
//!
//! # Architecture
//! - `labels`: base label schema shared by every family
//! - `metrics`: counter, gauge and histogram families, the
//!   `ControllerMetrics` registry, phase guards and query lifecycles
//! - `metrics_core`: `MetricsRecorder` trait for dependency injection
//! - `config`: static configuration (TOML + environment)
//! - `system`: logging initialization and startup wiring
//! - `errors`: error type shared by the crate

pub mod config;
pub mod errors;
pub mod labels;
pub mod metrics;
pub mod metrics_core;
pub mod system;
