//! Labelled metric families
//!
//! Thin wrappers over the Prometheus vector types that carry their own
//! descriptor and enforce the label arity contract before any series is
//! touched. Series are created lazily by the underlying vector, which
//! guarantees a single series per label tuple under concurrent first use.

use std::time::Duration;

use prometheus::core::Collector;
use prometheus::{
    Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, IntGaugeVec,
    Opts,
};
use tracing::error;

use super::phase::{NAMESPACE, SUBSYSTEM};
use crate::errors::{MetricsError, Result};

/// Kind of a metric family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Counter,
    Gauge,
    Histogram,
}

/// Static description of a family: naming, help text and label names.
#[derive(Debug, Clone, PartialEq)]
pub struct FamilyDesc {
    pub namespace: &'static str,
    pub subsystem: &'static str,
    pub name: &'static str,
    pub help: &'static str,
    pub label_names: Vec<String>,
    pub kind: MetricKind,
}

impl FamilyDesc {
    pub fn new(
        name: &'static str,
        help: &'static str,
        label_names: Vec<String>,
        kind: MetricKind,
    ) -> Self {
        Self {
            namespace: NAMESPACE,
            subsystem: SUBSYSTEM,
            name,
            help,
            label_names,
            kind,
        }
    }

    /// `<namespace>_<subsystem>_<name>`
    pub fn fq_name(&self) -> String {
        format!("{}_{}_{}", self.namespace, self.subsystem, self.name)
    }

    fn opts(&self) -> Opts {
        Opts::new(self.name, self.help)
            .namespace(self.namespace)
            .subsystem(self.subsystem)
    }

    fn label_refs(&self) -> Vec<&str> {
        self.label_names.iter().map(String::as_str).collect()
    }

    /// Label values must match the declared names one-to-one.
    fn check_arity(&self, values: &[&str]) -> Result<()> {
        if values.len() == self.label_names.len() {
            return Ok(());
        }
        error!(
            family = %self.fq_name(),
            expected = self.label_names.len(),
            got = values.len(),
            labels = ?values,
            "label arity mismatch"
        );
        Err(MetricsError::label_arity(format!(
            "{}: expected {} label values {:?}, got {}",
            self.fq_name(),
            self.label_names.len(),
            self.label_names,
            values.len()
        )))
    }
}

/// Shared shape of the three family kinds.
pub trait MetricFamily: Send + Sync {
    fn desc(&self) -> &FamilyDesc;

    /// A handle on the underlying vector for registration with an exporter.
    fn collector(&self) -> Box<dyn Collector>;
}

/// Monotonic totals per label tuple.
#[derive(Clone)]
pub struct CounterFamily {
    desc: FamilyDesc,
    vec: IntCounterVec,
}

impl CounterFamily {
    pub fn new(name: &'static str, help: &'static str, label_names: Vec<String>) -> Result<Self> {
        let desc = FamilyDesc::new(name, help, label_names, MetricKind::Counter);
        let vec = IntCounterVec::new(desc.opts(), &desc.label_refs())?;
        Ok(Self { desc, vec })
    }

    pub fn with_values(&self, values: &[&str]) -> Result<IntCounter> {
        self.desc.check_arity(values)?;
        Ok(self.vec.get_metric_with_label_values(values)?)
    }

    pub fn increment(&self, values: &[&str]) -> Result<()> {
        self.increment_by(values, 1)
    }

    pub fn increment_by(&self, values: &[&str], by: u64) -> Result<()> {
        self.with_values(values)?.inc_by(by);
        Ok(())
    }

    pub fn get(&self, values: &[&str]) -> Result<u64> {
        Ok(self.with_values(values)?.get())
    }
}

impl MetricFamily for CounterFamily {
    fn desc(&self) -> &FamilyDesc {
        &self.desc
    }

    fn collector(&self) -> Box<dyn Collector> {
        Box::new(self.vec.clone())
    }
}

/// Current occupancy per label tuple.
///
/// Callers must pair every `increment` with exactly one `decrement`,
/// whichever way the phase ends. [`super::PhaseGuard`] does this for you.
#[derive(Clone)]
pub struct GaugeFamily {
    desc: FamilyDesc,
    vec: IntGaugeVec,
}

impl GaugeFamily {
    pub fn new(name: &'static str, help: &'static str, label_names: Vec<String>) -> Result<Self> {
        let desc = FamilyDesc::new(name, help, label_names, MetricKind::Gauge);
        let vec = IntGaugeVec::new(desc.opts(), &desc.label_refs())?;
        Ok(Self { desc, vec })
    }

    pub fn with_values(&self, values: &[&str]) -> Result<IntGauge> {
        self.desc.check_arity(values)?;
        Ok(self.vec.get_metric_with_label_values(values)?)
    }

    pub fn increment(&self, values: &[&str]) -> Result<()> {
        self.with_values(values)?.inc();
        Ok(())
    }

    /// Decrement occupancy. A decrement without a matching increment is
    /// undone and reported instead of leaving the series negative.
    pub fn decrement(&self, values: &[&str]) -> Result<()> {
        if release(&self.with_values(values)?) {
            return Ok(());
        }
        error!(
            family = %self.desc.fq_name(),
            labels = ?values,
            "occupancy decremented below zero"
        );
        Err(MetricsError::negative_occupancy(format!(
            "{}{:?}: decrement without matching increment",
            self.desc.fq_name(),
            values
        )))
    }

    pub fn get(&self, values: &[&str]) -> Result<i64> {
        Ok(self.with_values(values)?.get())
    }
}

/// Decrement `gauge`, clamping at zero. Returns false if the decrement had
/// to be undone.
///
/// Best effort: the decrement, the read and the undo are separate atomic
/// operations, so a scrape can see a transient negative value, and when an
/// unmatched decrement races paired traffic on the same series the undo may
/// land on the paired caller instead.
pub(crate) fn release(gauge: &IntGauge) -> bool {
    gauge.dec();
    if gauge.get() >= 0 {
        return true;
    }
    gauge.inc();
    false
}

impl MetricFamily for GaugeFamily {
    fn desc(&self) -> &FamilyDesc {
        &self.desc
    }

    fn collector(&self) -> Box<dyn Collector> {
        Box::new(self.vec.clone())
    }
}

/// Duration distribution per label tuple, on exponential buckets.
#[derive(Clone)]
pub struct HistogramFamily {
    desc: FamilyDesc,
    buckets: Vec<f64>,
    vec: HistogramVec,
}

impl HistogramFamily {
    pub fn new(
        name: &'static str,
        help: &'static str,
        label_names: Vec<String>,
        buckets: Vec<f64>,
    ) -> Result<Self> {
        let desc = FamilyDesc::new(name, help, label_names, MetricKind::Histogram);
        let opts = HistogramOpts::from(desc.opts()).buckets(buckets.clone());
        let vec = HistogramVec::new(opts, &desc.label_refs())?;
        Ok(Self { desc, buckets, vec })
    }

    /// Finite bucket upper bounds, ascending.
    pub fn buckets(&self) -> &[f64] {
        &self.buckets
    }

    pub fn with_values(&self, values: &[&str]) -> Result<Histogram> {
        self.desc.check_arity(values)?;
        Ok(self.vec.get_metric_with_label_values(values)?)
    }

    /// Record one sample in seconds. Negative and non-finite samples are
    /// rejected without touching the series.
    pub fn observe(&self, values: &[&str], seconds: f64) -> Result<()> {
        let histogram = self.with_values(values)?;
        if !seconds.is_finite() || seconds < 0.0 {
            error!(
                family = %self.desc.fq_name(),
                labels = ?values,
                seconds,
                "rejected invalid duration sample"
            );
            return Err(MetricsError::invalid_observation(format!(
                "{}: duration must be a finite non-negative number, got {}",
                self.desc.fq_name(),
                seconds
            )));
        }
        histogram.observe(seconds);
        Ok(())
    }

    pub fn observe_duration(&self, values: &[&str], elapsed: Duration) -> Result<()> {
        self.observe(values, elapsed.as_secs_f64())
    }

    pub fn sample_count(&self, values: &[&str]) -> Result<u64> {
        Ok(self.with_values(values)?.get_sample_count())
    }

    pub fn sample_sum(&self, values: &[&str]) -> Result<f64> {
        Ok(self.with_values(values)?.get_sample_sum())
    }
}

impl MetricFamily for HistogramFamily {
    fn desc(&self) -> &FamilyDesc {
        &self.desc
    }

    fn collector(&self) -> Box<dyn Collector> {
        Box::new(self.vec.clone())
    }
}
