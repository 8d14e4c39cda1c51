//! Process startup wiring
//!
//! Loads the configuration, installs logging and builds the one
//! `ControllerMetrics` the process records into. Components receive the
//! registry from here instead of looking it up globally.

use std::sync::Arc;

use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;

use super::logging::init_logging;
use crate::config::{StaticConfig, init_config};
use crate::errors::Result;
use crate::metrics::ControllerMetrics;
use crate::metrics_core::MetricsRecorder;

pub struct StartupContext {
    pub config: Arc<StaticConfig>,
    pub metrics: Arc<ControllerMetrics>,
    /// Flushes buffered log lines when the context is dropped
    _log_guard: WorkerGuard,
}

impl StartupContext {
    /// The registry as the injection seam handed to the query engine.
    pub fn recorder(&self) -> Arc<dyn MetricsRecorder> {
        self.metrics.clone()
    }
}

/// Prepare the instrumentation layer for a controller process.
///
/// Fails when the log level does not parse, a subscriber is already
/// installed, or the configured base labels cannot form a schema.
pub fn prepare_startup() -> Result<StartupContext> {
    let config = init_config();
    let log_guard = init_logging(&config.logging)?;

    let metrics = Arc::new(ControllerMetrics::from_config(&config.metrics)?);
    info!(
        base_labels = ?metrics.schema().base(),
        families = metrics.families().len(),
        "Controller metrics ready"
    );

    Ok(StartupContext {
        config,
        metrics,
        _log_guard: log_guard,
    })
}
