mod r#impl;
mod structs;

pub use r#impl::{get_config, init_config, reload_config, try_get_config};
pub use structs::*;
