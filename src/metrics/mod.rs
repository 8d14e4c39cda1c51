//! Query controller metrics
//!
//! Counters, occupancy gauges and duration histograms recorded as queries
//! move through the controller, exported through Prometheus.
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use control_metrics::metrics::{ControllerMetrics, QueryLifecycle, RequestResult};
//!
//! let metrics = Arc::new(ControllerMetrics::from_names(&["org"])?);
//!
//! let mut query = QueryLifecycle::start(Arc::clone(&metrics), vec!["acme".into()])?;
//! query.compile("go")?;
//! query.plan()?;
//! query.execute()?;
//! query.record_functions(["from", "range", "filter"])?;
//! query.finish(RequestResult::Success)?;
//!
//! let text = metrics.export()?;
//! # Ok::<(), control_metrics::errors::MetricsError>(())
//! ```
//!
//! # Occupancy pairing
//!
//! Every increment of a `*_active` gauge must be matched by exactly one
//! decrement, whether the phase succeeds, fails or is cancelled. Code that
//! drives [`ControllerMetrics::enter_phase`] and
//! [`ControllerMetrics::exit_phase`] by hand owns that obligation; code that
//! uses [`PhaseGuard`] or [`QueryLifecycle`] gets it from `Drop`.

mod family;
mod guard;
mod lifecycle;
mod phase;
mod registry;

pub use family::{CounterFamily, FamilyDesc, GaugeFamily, HistogramFamily, MetricFamily, MetricKind};
pub use guard::PhaseGuard;
pub use lifecycle::QueryLifecycle;
pub use phase::{
    BUCKET_COUNT, BUCKET_FACTOR, COMPILER_TYPE_LABEL, FUNCTION_LABEL, NAMESPACE, Phase,
    RESULT_LABEL, RequestResult, SUBSYSTEM,
};
pub use registry::ControllerMetrics;
