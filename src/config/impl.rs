use std::path::Path;
use std::sync::{Arc, OnceLock};

use arc_swap::ArcSwap;
use tracing::info;

use super::StaticConfig;
use crate::errors::Result;

static CONFIG: OnceLock<ArcSwap<StaticConfig>> = OnceLock::new();

/// Current process configuration snapshot.
///
/// # Panics
/// If `init_config()` has not been called.
pub fn get_config() -> Arc<StaticConfig> {
    CONFIG
        .get()
        .expect("Config not initialized. Call init_config() first.")
        .load_full()
}

/// Like `get_config`, but returns `None` before initialization.
pub fn try_get_config() -> Option<Arc<StaticConfig>> {
    CONFIG.get().map(|c| c.load_full())
}

/// Load `control-metrics.toml` and `QC__*` overrides once and return the
/// snapshot. Later calls return whatever is current.
pub fn init_config() -> Arc<StaticConfig> {
    CONFIG
        .get_or_init(|| ArcSwap::from_pointee(StaticConfig::load()))
        .load_full()
}

/// Replace the process configuration with the one at `path`.
///
/// The base labels are validated first, so a file that could not build a
/// registry never becomes current. A registry that is already running keeps
/// its schema; the new snapshot applies to the next one built.
pub fn reload_config<P: AsRef<Path>>(path: P) -> Result<Arc<StaticConfig>> {
    let config = StaticConfig::load_from(path.as_ref())?;
    config.metrics.schema()?;

    let config = Arc::new(config);
    CONFIG
        .get_or_init(|| ArcSwap::new(Arc::clone(&config)))
        .store(Arc::clone(&config));

    info!(
        path = %path.as_ref().display(),
        base_labels = ?config.metrics.base_labels,
        "Configuration reloaded"
    );
    Ok(config)
}
