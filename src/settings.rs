// src/settings.rs

//! Process-level defaults.

use std::env;
use std::path::PathBuf;

/// Default directory for per-step log files.
///
/// Priority:
/// 1. `DAGRUN_LOGS_DIR` environment variable
/// 2. `~/.dagrun/logs`
/// 3. the system temp directory (last resort, e.g. no home in containers)
pub fn default_log_dir() -> PathBuf {
    if let Some(dir) = env::var_os("DAGRUN_LOGS_DIR") {
        return PathBuf::from(dir);
    }

    dirs::home_dir()
        .map(|home| home.join(".dagrun").join("logs"))
        .unwrap_or_else(|| env::temp_dir().join("dagrun").join("logs"))
}
