//! Core metrics traits.
//!
//! Provides `MetricsRecorder` and `NoopMetrics` so that the query engine
//! can accept `Arc<dyn MetricsRecorder>` and tests can run without a
//! Prometheus registry behind it.

use std::sync::Arc;

use crate::metrics::Phase;

/// Trait for recording controller metrics.
///
/// All methods are no-op by default, allowing partial implementation.
/// Implementations must be thread-safe (Send + Sync) and must never fail
/// the caller: contract violations are logged, not returned.
///
/// `values` is the full label tuple of the phase family: base values
/// followed by the phase's extra value, if it has one. `base` is the base
/// values alone.
#[allow(unused_variables)]
pub trait MetricsRecorder: Send + Sync {
    // ===== Occupancy =====

    /// Query entered `phase`. Must be paired with exactly one `dec_active`.
    fn inc_active(&self, phase: Phase, values: &[&str]) {}

    /// Query left `phase`, however it ended.
    fn dec_active(&self, phase: Phase, values: &[&str]) {}

    // ===== Durations =====

    /// Observe time spent in one occurrence of `phase`
    fn observe_phase(&self, phase: Phase, values: &[&str], duration_secs: f64) {}

    // ===== Outcomes =====

    /// Record terminal request outcome
    fn inc_request(&self, base: &[&str], result: &str) {}

    /// Record use of a function by a query
    fn inc_function(&self, base: &[&str], function: &str) {}
}

/// Noop metrics implementation for testing.
///
/// All methods do nothing.
pub struct NoopMetrics;

impl MetricsRecorder for NoopMetrics {}

impl NoopMetrics {
    pub fn new() -> Self {
        Self
    }

    pub fn arc() -> Arc<dyn MetricsRecorder> {
        Arc::new(Self::new())
    }
}

impl Default for NoopMetrics {
    fn default() -> Self {
        Self::new()
    }
}
