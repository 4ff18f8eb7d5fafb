use camino::Utf8PathBuf;
use std::env;

#[cfg(unix)]
use dirs::{config_dir, data_dir};

/// Directory in which the sandbox launcher publishes one entry per sandboxed pid.
pub const DEFAULT_RUNTIME_DIR: &str = "/run/firejail/sandbox";

/// Name of the environment snapshot written inside each runtime entry.
pub const DEFAULT_ENVIRONMENT_FILE: &str = "environ";

/// Enforcement tool invoked to shape sandbox bandwidth.
pub const DEFAULT_ENFORCEMENT_PROGRAM: &str = "firejail";

/// `PATH` handed to the enforcement tool.
pub const DEFAULT_SAFE_PATH: &str = "/usr/local/sbin:/usr/local/bin:/usr/bin:/usr/sbin:/sbin";

/// Delay between deferred addition attempts, in milliseconds.
pub const DEFAULT_RETRY_INTERVAL_MS: u64 = 1000;

/// Number of deferred addition attempts made before an entry is abandoned.
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 10;

/// Default log filter expression used by the daemon.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// System-wide desktop-entry directory.
pub const SYSTEM_APPLICATIONS_DIR: &str = "/usr/share/applications";

/// Locally installed desktop-entry directory.
pub const LOCAL_APPLICATIONS_DIR: &str = "/usr/local/share/applications";

/// Default log filter expression used by the daemon.
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Default logging format for the daemon.
pub fn default_log_format() -> crate::logging::LogFormat {
    crate::logging::LogFormat::Auto
}

/// Per-user data directory, following `XDG_DATA_HOME` semantics.
pub fn default_data_home() -> Utf8PathBuf {
    user_directory(data_dir_inner(), ".local/share")
}

/// Location of the workspace settings store.
pub fn default_settings_file() -> Utf8PathBuf {
    let mut base = user_directory(config_dir_inner(), ".config");
    base.push("jailpoll");
    base.push("workspaces.json");
    base
}

fn user_directory(resolved: Option<std::path::PathBuf>, home_relative: &str) -> Utf8PathBuf {
    if let Some(path) = resolved.and_then(|path| Utf8PathBuf::from_path_buf(path).ok()) {
        return path;
    }
    match env::var("HOME") {
        Ok(home) => Utf8PathBuf::from(home).join(home_relative),
        Err(_) => fallback_base_directory().join(home_relative),
    }
}

fn fallback_base_directory() -> Utf8PathBuf {
    let candidate = env::temp_dir();
    Utf8PathBuf::from_path_buf(candidate).unwrap_or_else(|_| Utf8PathBuf::from("/tmp"))
}

#[cfg(unix)]
fn data_dir_inner() -> Option<std::path::PathBuf> {
    data_dir()
}

#[cfg(unix)]
fn config_dir_inner() -> Option<std::path::PathBuf> {
    config_dir()
}

#[cfg(not(unix))]
fn data_dir_inner() -> Option<std::path::PathBuf> {
    None
}

#[cfg(not(unix))]
fn config_dir_inner() -> Option<std::path::PathBuf> {
    None
}
