//! # Logging
//!
//! The menu owns the terminal while it runs, so diagnostics never go to the
//! screen. They are appended to `lambdactl.log` in the platform data
//! directory (`~/.local/share/lambdactl/` on Linux).
//!
//! The filter comes from `LAMBDACTL_LOG`, then `log_level` in the config file,
//! then `info`. Initialization failures are ignored; logging is optional.

use crate::config::Config;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable overriding the log filter.
pub const LOG_ENV: &str = "LAMBDACTL_LOG";

const LOG_FILE: &str = "lambdactl.log";

/// Directory holding the log file.
pub fn data_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "lambdactl").map(|dirs| dirs.data_dir().to_path_buf())
}

fn filter_directive(config: &Config) -> String {
    std::env::var(LOG_ENV)
        .ok()
        .filter(|level| !level.is_empty())
        .or_else(|| config.log_level.clone())
        .unwrap_or_else(|| "info".to_string())
}

/// Install the global file subscriber. Safe to call more than once; only the
/// first call takes effect.
pub fn init_logging(config: &Config) {
    let Some(dir) = data_dir() else {
        return;
    };
    init_logging_in(&dir, &filter_directive(config));
}

fn init_logging_in(dir: &Path, directive: &str) {
    if fs::create_dir_all(dir).is_err() {
        return;
    }
    let Ok(file) = OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join(LOG_FILE))
    else {
        return;
    };
    let filter = EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_target(true),
        )
        .try_init();
}
