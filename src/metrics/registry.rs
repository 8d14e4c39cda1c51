//! Controller metrics registry
//!
//! Owns every metric family recorded by the query controller. Built once at
//! startup and handed to the engine as an `Arc`; tests build their own.

use std::time::Duration;

use prometheus::core::Collector;
use prometheus::{Encoder, Registry, TextEncoder, exponential_buckets};
use strum::{EnumCount, IntoEnumIterator};
use tracing::debug;

use super::family::{CounterFamily, FamilyDesc, GaugeFamily, HistogramFamily, MetricFamily};
use super::guard::PhaseGuard;
use super::phase::{BUCKET_COUNT, BUCKET_FACTOR, FUNCTION_LABEL, Phase, RESULT_LABEL};
use crate::config::MetricsConfig;
use crate::errors::{MetricsError, Result};
use crate::labels::LabelSchema;
use crate::metrics_core::MetricsRecorder;

/// Registry facade for the query controller.
///
/// Families:
/// - `query_control_requests_total` (base + `result`)
/// - `query_control_functions_total` (base + `function`)
/// - `query_control_<phase>_active` per phase
/// - `query_control_<phase>_duration_seconds` per phase
///
/// Every increment of a `*_active` gauge must be paired with exactly one
/// decrement, however the phase ends. Prefer [`ControllerMetrics::track`],
/// which enforces this with a drop guard.
pub struct ControllerMetrics {
    schema: LabelSchema,
    /// Internal Prometheus registry used by `export`
    registry: Registry,

    requests: CounterFamily,
    functions: CounterFamily,

    /// Indexed by `Phase as usize`
    active: [GaugeFamily; Phase::COUNT],
    /// Indexed by `Phase as usize`
    durations: [HistogramFamily; Phase::COUNT],
}

impl ControllerMetrics {
    pub fn new(schema: &LabelSchema) -> Result<Self> {
        let requests = CounterFamily::new(
            "requests_total",
            "Count of the query requests",
            schema.derive(Some(RESULT_LABEL))?,
        )?;
        let functions = CounterFamily::new(
            "functions_total",
            "Count of functions in queries",
            schema.derive(Some(FUNCTION_LABEL))?,
        )?;

        let active = per_phase(|phase| {
            GaugeFamily::new(
                phase.active_name(),
                phase.active_help(),
                schema.derive(phase.extra_label())?,
            )
        })?;

        let durations = per_phase(|phase| {
            HistogramFamily::new(
                phase.duration_name(),
                phase.duration_help(),
                schema.derive(phase.extra_label())?,
                exponential_buckets(phase.bucket_start(), BUCKET_FACTOR, BUCKET_COUNT)?,
            )
        })?;

        let metrics = Self {
            schema: schema.clone(),
            registry: Registry::new(),
            requests,
            functions,
            active,
            durations,
        };
        metrics.register(&metrics.registry)?;

        debug!(
            base_labels = ?metrics.schema.base(),
            families = metrics.families().len(),
            "Controller metrics initialized"
        );
        Ok(metrics)
    }

    pub fn from_names(base_labels: &[&str]) -> Result<Self> {
        Self::new(&LabelSchema::new(base_labels.iter().copied())?)
    }

    pub fn from_config(config: &MetricsConfig) -> Result<Self> {
        Self::new(&config.schema()?)
    }

    pub fn schema(&self) -> &LabelSchema {
        &self.schema
    }

    pub fn requests(&self) -> &CounterFamily {
        &self.requests
    }

    pub fn functions(&self) -> &CounterFamily {
        &self.functions
    }

    pub fn active(&self, phase: Phase) -> &GaugeFamily {
        &self.active[phase as usize]
    }

    pub fn duration(&self, phase: Phase) -> &HistogramFamily {
        &self.durations[phase as usize]
    }

    // ===== Phase transitions =====

    /// Mark one query as entering `phase`. `values` is the full label
    /// tuple: base values, then the phase's extra value if it has one.
    pub fn enter_phase(&self, phase: Phase, values: &[&str]) -> Result<()> {
        self.active(phase).increment(values)
    }

    /// Mark one query as leaving `phase` after `elapsed`.
    ///
    /// The duration is recorded even when the decrement had to be clamped.
    pub fn exit_phase(&self, phase: Phase, values: &[&str], elapsed: Duration) -> Result<()> {
        let released = self.active(phase).decrement(values);
        self.duration(phase).observe_duration(values, elapsed)?;
        released
    }

    /// Enter `phase` and return a guard that exits it exactly once.
    pub fn track(&self, phase: Phase, values: &[&str]) -> Result<PhaseGuard> {
        let gauge = self.active(phase).with_values(values)?;
        let histogram = self.duration(phase).with_values(values)?;
        Ok(PhaseGuard::enter(phase, gauge, histogram))
    }

    // ===== Outcomes =====

    /// Count one terminal outcome, e.g. [`super::RequestResult::Success`].
    pub fn record_request(&self, base: &[&str], result: &str) -> Result<()> {
        self.requests.increment(&with_extra(base, result))
    }

    /// Count one use of each named function.
    pub fn record_functions<'a, I>(&self, base: &[&str], names: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a str>,
    {
        for name in names {
            self.functions.increment(&with_extra(base, name))?;
        }
        Ok(())
    }

    // ===== Export =====

    /// Every family, counters first, then gauges and histograms in phase
    /// order.
    pub fn families(&self) -> Vec<&dyn MetricFamily> {
        let mut families: Vec<&dyn MetricFamily> = vec![&self.requests, &self.functions];
        families.extend(self.active.iter().map(|f| f as &dyn MetricFamily));
        families.extend(self.durations.iter().map(|f| f as &dyn MetricFamily));
        families
    }

    pub fn family_descs(&self) -> Vec<&FamilyDesc> {
        self.families().into_iter().map(|f| f.desc()).collect()
    }

    /// Collectors for registration with an external exporter.
    ///
    /// The handles share state with this registry, so values recorded here
    /// are visible through them.
    pub fn collectors(&self) -> Vec<Box<dyn Collector>> {
        self.families().into_iter().map(|f| f.collector()).collect()
    }

    /// Register every family with `registry`.
    pub fn register(&self, registry: &Registry) -> Result<()> {
        for collector in self.collectors() {
            registry.register(collector)?;
        }
        Ok(())
    }

    /// Export metrics in Prometheus text format
    pub fn export(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

/// Build one value per phase, in declaration order.
fn per_phase<T>(build: impl FnMut(Phase) -> Result<T>) -> Result<[T; Phase::COUNT]> {
    let built = Phase::iter().map(build).collect::<Result<Vec<T>>>()?;
    built.try_into().map_err(|built: Vec<T>| {
        MetricsError::registration(format!(
            "expected {} phase families, built {}",
            Phase::COUNT,
            built.len()
        ))
    })
}

fn with_extra<'a>(base: &[&'a str], extra: &'a str) -> Vec<&'a str> {
    let mut values = Vec::with_capacity(base.len() + 1);
    values.extend_from_slice(base);
    values.push(extra);
    values
}

/// Errors are already logged by the families; dropping them here keeps
/// instrumentation failures out of the query path.
impl MetricsRecorder for ControllerMetrics {
    fn inc_active(&self, phase: Phase, values: &[&str]) {
        let _ = self.enter_phase(phase, values);
    }

    fn dec_active(&self, phase: Phase, values: &[&str]) {
        let _ = self.active(phase).decrement(values);
    }

    fn observe_phase(&self, phase: Phase, values: &[&str], duration_secs: f64) {
        let _ = self.duration(phase).observe(values, duration_secs);
    }

    fn inc_request(&self, base: &[&str], result: &str) {
        let _ = self.record_request(base, result);
    }

    fn inc_function(&self, base: &[&str], function: &str) {
        let _ = self.record_functions(base, [function]);
    }
}
