//! Process-level support: logging setup and startup wiring.

pub mod logging;
pub mod startup;

pub use logging::init_logging;
pub use startup::{StartupContext, prepare_startup};
