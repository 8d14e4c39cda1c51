//! Per-query phase bookkeeping
//!
//! `QueryLifecycle` holds the `All` guard for the whole query plus a guard
//! for whichever phase the query is in right now. Moving to a new phase
//! closes the previous one first, and dropping the lifecycle closes
//! everything, so a query never leaves occupancy behind.

use std::sync::Arc;
use std::time::Duration;

use super::guard::PhaseGuard;
use super::phase::Phase;
use super::registry::ControllerMetrics;
use crate::errors::{MetricsError, Result};

pub struct QueryLifecycle {
    metrics: Arc<ControllerMetrics>,
    base: Vec<String>,
    all: Option<PhaseGuard>,
    current: Option<PhaseGuard>,
}

impl QueryLifecycle {
    /// Admit a query: enters `All` and `Queueing`.
    pub fn start(metrics: Arc<ControllerMetrics>, base: Vec<String>) -> Result<Self> {
        let refs: Vec<&str> = base.iter().map(String::as_str).collect();
        let all = metrics.track(Phase::All, &refs)?;
        let queueing = metrics.track(Phase::Queueing, &refs)?;

        Ok(Self {
            metrics,
            base,
            all: Some(all),
            current: Some(queueing),
        })
    }

    pub fn current_phase(&self) -> Option<Phase> {
        self.current.as_ref().map(PhaseGuard::phase)
    }

    /// Base label values of this query.
    pub fn base(&self) -> Vec<&str> {
        self.base.iter().map(String::as_str).collect()
    }

    pub fn requeue(&mut self) -> Result<Duration> {
        self.transition(Phase::Requeueing, None)
    }

    pub fn compile(&mut self, compiler_type: &str) -> Result<Duration> {
        self.transition(Phase::Compiling, Some(compiler_type))
    }

    pub fn plan(&mut self) -> Result<Duration> {
        self.transition(Phase::Planning, None)
    }

    pub fn execute(&mut self) -> Result<Duration> {
        self.transition(Phase::Executing, None)
    }

    /// Close the current phase and open `phase`, with `extra` as the phase's
    /// own label value (the compiler type for `Compiling`). Returns the time
    /// spent in the phase that was closed.
    ///
    /// `All` spans the whole query and cannot be entered here. On error the
    /// query stays in its current phase.
    pub fn transition(&mut self, phase: Phase, extra: Option<&str>) -> Result<Duration> {
        if phase == Phase::All {
            return Err(MetricsError::invalid_transition(
                "the all phase is entered by start() and closed by finish()",
            ));
        }

        let mut values: Vec<&str> = self.base.iter().map(String::as_str).collect();
        values.extend(extra);
        let next = self.metrics.track(phase, &values)?;

        let previous = self.close_current();
        self.current = Some(next);
        Ok(previous)
    }

    fn close_current(&mut self) -> Duration {
        self.current
            .take()
            .map(PhaseGuard::finish)
            .unwrap_or_default()
    }

    /// Count one use of each named function for this query.
    pub fn record_functions<'a, I>(&self, names: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a str>,
    {
        self.metrics.record_functions(&self.base(), names)
    }

    /// Complete the query with a terminal outcome. Returns the end-to-end
    /// duration.
    pub fn finish(mut self, result: impl AsRef<str>) -> Result<Duration> {
        self.close_current();
        let total = self
            .all
            .take()
            .map(PhaseGuard::finish)
            .unwrap_or_default();

        self.metrics.record_request(&self.base(), result.as_ref())?;
        Ok(total)
    }
}

impl Drop for QueryLifecycle {
    fn drop(&mut self) {
        self.current.take();
        self.all.take();
    }
}

impl std::fmt::Debug for QueryLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryLifecycle")
            .field("base", &self.base)
            .field("current", &self.current_phase())
            .finish()
    }
}
