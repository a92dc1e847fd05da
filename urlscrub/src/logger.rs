// urlscrub/src/logger.rs
//! Logger initialisation for the `urlscrub` binary.
//!
//! Logs always go to stderr so stdout stays reserved for replies and JSON
//! actions. `RUST_LOG` is honoured unless a level override is given.

use env_logger::{Builder, Env, Target};
use log::LevelFilter;

/// Initialises `env_logger`. Safe to call more than once; later calls are no-ops.
pub fn init_logger(level_override: Option<LevelFilter>) {
    let mut builder = Builder::from_env(Env::default().default_filter_or("warn"));
    if let Some(level) = level_override {
        builder.filter_level(level);
    }
    builder.target(Target::Stderr).format_timestamp(None);
    let _ = builder.try_init();
}
