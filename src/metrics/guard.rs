//! Drop guard pairing a phase entry with exactly one exit.

use std::time::{Duration, Instant};

use prometheus::{Histogram, IntGauge};
use tracing::error;

use super::family::release;
use super::phase::Phase;

/// Occupancy held by one query in one phase.
///
/// Created by [`super::ControllerMetrics::track`], which increments the
/// phase gauge. The gauge is decremented and the elapsed time observed
/// exactly once, on [`PhaseGuard::finish`] or on drop, so failure and
/// cancellation paths release occupancy the same way success does.
#[must_use = "dropping the guard immediately ends the phase"]
pub struct PhaseGuard {
    phase: Phase,
    gauge: IntGauge,
    histogram: Histogram,
    started: Instant,
    released: bool,
}

impl PhaseGuard {
    /// Series are resolved by the caller so the exit path cannot fail on
    /// label arity.
    pub(crate) fn enter(phase: Phase, gauge: IntGauge, histogram: Histogram) -> Self {
        gauge.inc();
        Self {
            phase,
            gauge,
            histogram,
            started: Instant::now(),
            released: false,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// End the phase now and return the recorded duration.
    pub fn finish(mut self) -> Duration {
        self.release()
    }

    fn release(&mut self) -> Duration {
        let elapsed = self.started.elapsed();
        if self.released {
            return elapsed;
        }
        self.released = true;

        if !release(&self.gauge) {
            error!(phase = self.phase.as_ref(), "occupancy decremented below zero");
        }
        self.histogram.observe(elapsed.as_secs_f64());
        elapsed
    }
}

impl Drop for PhaseGuard {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for PhaseGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhaseGuard")
            .field("phase", &self.phase)
            .field("elapsed", &self.started.elapsed())
            .field("released", &self.released)
            .finish()
    }
}
