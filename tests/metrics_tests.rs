//! Metrics module tests
//!
//! Tests for family construction, the update protocol, export and the
//! recorder trait implementations.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use control_metrics::errors::MetricsError;
use control_metrics::metrics::{ControllerMetrics, MetricFamily, MetricKind, Phase, RequestResult};
use control_metrics::metrics_core::{MetricsRecorder, NoopMetrics};
use prometheus::{Encoder, Registry, TextEncoder};

fn new_metrics() -> ControllerMetrics {
    ControllerMetrics::from_names(&["org"]).expect("Failed to build metrics")
}

/// Value of the first exported sample line starting with `name` and
/// containing every fragment in `labels`.
fn sample(output: &str, name: &str, labels: &[&str]) -> Option<f64> {
    output
        .lines()
        .filter(|l| !l.starts_with('#'))
        .filter(|l| l.starts_with(name))
        .find(|l| labels.iter().all(|frag| l.contains(frag)))
        .and_then(|l| l.rsplit(' ').next())
        .and_then(|v| v.parse().ok())
}

// =============================================================================
// Construction
// =============================================================================

#[test]
fn test_collectors_enumerate_all_families_in_order() {
    let metrics = new_metrics();

    let names: Vec<String> = metrics
        .collectors()
        .iter()
        .map(|c| c.desc()[0].fq_name.clone())
        .collect();

    assert_eq!(
        names,
        vec![
            "query_control_requests_total",
            "query_control_functions_total",
            "query_control_all_active",
            "query_control_compiling_active",
            "query_control_queueing_active",
            "query_control_requeueing_active",
            "query_control_planning_active",
            "query_control_executing_active",
            "query_control_all_duration_seconds",
            "query_control_compiling_duration_seconds",
            "query_control_queueing_duration_seconds",
            "query_control_requeueing_duration_seconds",
            "query_control_planning_duration_seconds",
            "query_control_executing_duration_seconds",
        ]
    );
}

#[test]
fn test_collectors_callable_repeatedly() {
    let metrics = new_metrics();
    assert_eq!(metrics.collectors().len(), metrics.collectors().len());
}

#[test]
fn test_family_label_names() {
    let metrics = ControllerMetrics::from_names(&["org", "host"]).unwrap();

    for desc in metrics.family_descs() {
        assert_eq!(&desc.label_names[..2], &["org", "host"]);
    }
    assert_eq!(
        metrics.requests().desc().label_names,
        vec!["org", "host", "result"]
    );
    assert_eq!(
        metrics.functions().desc().label_names,
        vec!["org", "host", "function"]
    );
    assert_eq!(
        metrics.active(Phase::Compiling).desc().label_names,
        vec!["org", "host", "compiler_type"]
    );
    assert_eq!(
        metrics.duration(Phase::Compiling).desc().label_names,
        vec!["org", "host", "compiler_type"]
    );
    assert_eq!(metrics.active(Phase::Queueing).desc().label_names, vec!["org", "host"]);
}

#[test]
fn test_family_kinds_and_help() {
    let metrics = new_metrics();
    let descs = metrics.family_descs();

    assert!(descs[..2].iter().all(|d| d.kind == MetricKind::Counter));
    assert!(descs[2..8].iter().all(|d| d.kind == MetricKind::Gauge));
    assert!(descs[8..].iter().all(|d| d.kind == MetricKind::Histogram));

    assert_eq!(descs[0].help, "Count of the query requests");
    assert_eq!(descs[6].help, "Number of queries actively planning");
    assert_eq!(descs[12].help, "Histogram of times spent planning queries");
}

#[test]
fn test_duplicate_base_labels_fail_before_any_update() {
    let result = ControllerMetrics::from_names(&["org", "org"]);
    assert!(matches!(result, Err(MetricsError::LabelSchema(_))));
}

#[test]
fn test_malformed_base_labels_fail() {
    assert!(ControllerMetrics::from_names(&[""]).is_err());
    assert!(ControllerMetrics::from_names(&["org id"]).is_err());
}

#[test]
fn test_bucket_layouts() {
    let metrics = new_metrics();

    for phase in [
        Phase::All,
        Phase::Compiling,
        Phase::Queueing,
        Phase::Requeueing,
        Phase::Executing,
    ] {
        let buckets = metrics.duration(phase).buckets();
        assert_eq!(buckets.len(), 7);
        assert_eq!(buckets[0], 1e-3);
        assert!((buckets[6] - 1e-3 * 5f64.powi(6)).abs() < 1e-9);
    }

    let planning = metrics.duration(Phase::Planning).buckets();
    assert_eq!(planning.len(), 7);
    assert_eq!(planning[0], 1e-5);
    assert!((planning[6] - 1e-5 * 5f64.powi(6)).abs() < 1e-12);
    for pair in planning.windows(2) {
        assert!((pair[1] / pair[0] - 5.0).abs() < 1e-9);
    }
}

// =============================================================================
// Update protocol
// =============================================================================

#[test]
fn test_compiling_gauge_arity() {
    let metrics = new_metrics();

    metrics
        .enter_phase(Phase::Compiling, &["acme", "go"])
        .expect("base + extra should be accepted");
    assert_eq!(
        metrics.active(Phase::Compiling).get(&["acme", "go"]).unwrap(),
        1
    );

    let err = metrics.enter_phase(Phase::Compiling, &["acme"]).unwrap_err();
    assert!(matches!(err, MetricsError::LabelArity(_)));
}

#[test]
fn test_concurrent_counter_increments_are_not_lost() {
    let metrics = Arc::new(new_metrics());

    thread::scope(|s| {
        for t in 0..8 {
            let metrics = Arc::clone(&metrics);
            s.spawn(move || {
                let org = if t % 2 == 0 { "acme" } else { "globex" };
                for _ in 0..1000 {
                    metrics
                        .record_request(&[org], RequestResult::Success.as_ref())
                        .unwrap();
                    metrics.record_functions(&[org], ["from", "range"]).unwrap();
                }
            });
        }
    });

    let requests = metrics.requests();
    assert_eq!(requests.get(&["acme", "success"]).unwrap(), 4000);
    assert_eq!(requests.get(&["globex", "success"]).unwrap(), 4000);
    assert_eq!(metrics.functions().get(&["acme", "range"]).unwrap(), 4000);
    assert_eq!(metrics.functions().get(&["globex", "from"]).unwrap(), 4000);
}

#[test]
fn test_concurrent_phase_guards_return_to_zero() {
    let metrics = Arc::new(new_metrics());

    thread::scope(|s| {
        for _ in 0..8 {
            let metrics = Arc::clone(&metrics);
            s.spawn(move || {
                for _ in 0..200 {
                    let _guard = metrics.track(Phase::Executing, &["acme"]).unwrap();
                }
            });
        }
    });

    assert_eq!(metrics.active(Phase::Executing).get(&["acme"]).unwrap(), 0);
    assert_eq!(
        metrics.duration(Phase::Executing).sample_count(&["acme"]).unwrap(),
        1600
    );
}

#[test]
fn test_one_unmatched_increment_reads_one() {
    let metrics = new_metrics();

    for _ in 0..5 {
        metrics.enter_phase(Phase::Queueing, &["acme"]).unwrap();
    }
    for _ in 0..4 {
        metrics
            .exit_phase(Phase::Queueing, &["acme"], Duration::from_millis(1))
            .unwrap();
    }

    assert_eq!(metrics.active(Phase::Queueing).get(&["acme"]).unwrap(), 1);
}

#[test]
fn test_guard_finish_is_single_release() {
    let metrics = new_metrics();

    let guard = metrics.track(Phase::Requeueing, &["acme"]).unwrap();
    assert_eq!(metrics.active(Phase::Requeueing).get(&["acme"]).unwrap(), 1);

    guard.finish();
    assert_eq!(metrics.active(Phase::Requeueing).get(&["acme"]).unwrap(), 0);
    assert_eq!(
        metrics.duration(Phase::Requeueing).sample_count(&["acme"]).unwrap(),
        1
    );
}

#[test]
fn test_histogram_cumulative_buckets() {
    let metrics = new_metrics();
    let family = metrics.duration(Phase::Queueing);

    // Between the 0.025 and 0.125 boundaries
    let d = 0.1;
    family.observe(&["acme"], d).unwrap();

    let output = metrics.export().unwrap();
    let name = "query_control_queueing_duration_seconds_bucket";
    for bound in family.buckets() {
        let le = format!("le=\"{}\"", bound);
        let count = sample(&output, name, &["org=\"acme\"", le.as_str()]).expect("bucket line");
        let expected = if *bound >= d { 1.0 } else { 0.0 };
        assert_eq!(count, expected, "bucket {}", bound);
    }
    assert_eq!(
        sample(&output, name, &["org=\"acme\"", "le=\"+Inf\""]),
        Some(1.0)
    );
    assert_eq!(
        sample(&output, "query_control_queueing_duration_seconds_count", &["acme"]),
        Some(1.0)
    );
    assert_eq!(
        sample(&output, "query_control_queueing_duration_seconds_sum", &["acme"]),
        Some(d)
    );
}

#[test]
fn test_histogram_zero_duration_lands_in_every_bucket() {
    let metrics = new_metrics();
    let family = metrics.duration(Phase::Planning);
    family.observe(&["acme"], 0.0).unwrap();

    let output = metrics.export().unwrap();
    for bound in family.buckets() {
        let le = format!("le=\"{}\"", bound);
        assert_eq!(
            sample(
                &output,
                "query_control_planning_duration_seconds_bucket",
                &["acme", le.as_str()]
            ),
            Some(1.0)
        );
    }
}

// =============================================================================
// Export
// =============================================================================

#[test]
fn test_export_contains_recorded_series() {
    let metrics = new_metrics();

    metrics.record_request(&["acme"], "compile_error").unwrap();
    metrics.enter_phase(Phase::Compiling, &["acme", "go"]).unwrap();

    let output = metrics.export().expect("Export should succeed");
    assert!(output.contains("# TYPE query_control_requests_total counter"));
    assert!(output.contains("# HELP query_control_requests_total Count of the query requests"));
    assert!(output.contains("# TYPE query_control_compiling_active gauge"));
    assert_eq!(
        sample(
            &output,
            "query_control_requests_total",
            &["org=\"acme\"", "result=\"compile_error\""]
        ),
        Some(1.0)
    );
    assert_eq!(
        sample(
            &output,
            "query_control_compiling_active",
            &["compiler_type=\"go\"", "org=\"acme\""]
        ),
        Some(1.0)
    );
}

#[test]
fn test_register_with_external_registry_shares_values() {
    let metrics = new_metrics();
    let registry = Registry::new();
    metrics.register(&registry).expect("Registration should succeed");

    metrics.record_request(&["acme"], "success").unwrap();

    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(&registry.gather(), &mut buffer)
        .unwrap();
    let output = String::from_utf8(buffer).unwrap();
    assert_eq!(
        sample(
            &output,
            "query_control_requests_total",
            &["org=\"acme\"", "result=\"success\""]
        ),
        Some(1.0)
    );

    // Second registration of the same collectors is rejected
    let err = metrics.register(&registry).unwrap_err();
    assert!(matches!(err, MetricsError::Registration(_)));
}

#[test]
fn test_independent_registries_do_not_share_series() {
    let a = new_metrics();
    let b = new_metrics();

    a.record_request(&["acme"], "success").unwrap();
    assert_eq!(a.requests().get(&["acme", "success"]).unwrap(), 1);
    assert_eq!(b.requests().get(&["acme", "success"]).unwrap(), 0);
}

// =============================================================================
// MetricsRecorder implementations
// =============================================================================

#[test]
fn test_noop_metrics_implements_trait() {
    let noop = NoopMetrics::new();
    noop.inc_active(Phase::Queueing, &["acme"]);
    noop.dec_active(Phase::Queueing, &["acme"]);
    noop.observe_phase(Phase::Queueing, &["acme"], 0.01);
    noop.inc_request(&["acme"], "success");
    noop.inc_function(&["acme"], "range");
}

#[test]
fn test_noop_metrics_arc() {
    let arc = NoopMetrics::arc();
    arc.inc_request(&["acme"], "queue_error");
}

#[test]
fn test_controller_metrics_as_recorder() {
    let metrics = Arc::new(new_metrics());
    let recorder: Arc<dyn MetricsRecorder> = metrics.clone();

    recorder.inc_active(Phase::Compiling, &["acme", "go"]);
    recorder.observe_phase(Phase::Compiling, &["acme", "go"], 0.2);
    recorder.dec_active(Phase::Compiling, &["acme", "go"]);
    recorder.inc_request(&["acme"], "success");
    recorder.inc_function(&["acme"], "filter");

    assert_eq!(
        metrics.active(Phase::Compiling).get(&["acme", "go"]).unwrap(),
        0
    );
    assert_eq!(
        metrics
            .duration(Phase::Compiling)
            .sample_count(&["acme", "go"])
            .unwrap(),
        1
    );
    assert_eq!(metrics.requests().get(&["acme", "success"]).unwrap(), 1);
    assert_eq!(metrics.functions().get(&["acme", "filter"]).unwrap(), 1);
}

#[test]
fn test_recorder_swallows_contract_violations() {
    let metrics = Arc::new(new_metrics());
    let recorder: Arc<dyn MetricsRecorder> = metrics.clone();

    // Wrong arity, unmatched decrement, negative duration: none may panic
    recorder.inc_active(Phase::Compiling, &["acme"]);
    recorder.dec_active(Phase::Executing, &["acme"]);
    recorder.observe_phase(Phase::Executing, &["acme"], -1.0);

    assert_eq!(metrics.active(Phase::Executing).get(&["acme"]).unwrap(), 0);
    assert_eq!(
        metrics.duration(Phase::Executing).sample_count(&["acme"]).unwrap(),
        0
    );
}
