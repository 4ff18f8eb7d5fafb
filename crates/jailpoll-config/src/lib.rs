//! Shared configuration for the sandbox policy poller.
//!
//! Configuration is layered by [`ortho_config`]: built-in defaults, an
//! optional TOML file (`--config-path` or `JAILPOLL_CONFIG_PATH`), `JAILPOLL_*`
//! environment variables and finally command-line flags. Every field is
//! optional so that absent layers fall through to the defaults exposed by the
//! accessor methods.

mod defaults;
mod logging;

use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_ENFORCEMENT_PROGRAM, DEFAULT_ENVIRONMENT_FILE, DEFAULT_LOG_FILTER,
    DEFAULT_RETRY_ATTEMPTS, DEFAULT_RETRY_INTERVAL_MS, DEFAULT_RUNTIME_DIR, DEFAULT_SAFE_PATH,
    LOCAL_APPLICATIONS_DIR, SYSTEM_APPLICATIONS_DIR, default_data_home, default_log_filter,
    default_log_format, default_settings_file,
};
pub use logging::{LogFormat, LogFormatParseError};

/// Resolved daemon configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(prefix = "JAILPOLL")]
pub struct Config {
    /// Directory whose entries are named after sandboxed process ids.
    pub runtime_dir: Option<Utf8PathBuf>,
    /// Name of the environment snapshot inside each runtime entry.
    pub environment_file: Option<String>,
    /// Program invoked to apply bandwidth limits.
    pub enforcement_program: Option<String>,
    /// `PATH` value exported to the enforcement program.
    pub safe_path: Option<String>,
    /// JSON document holding per-workspace network settings.
    pub settings_file: Option<Utf8PathBuf>,
    /// Per-user data directory used to locate user desktop entries.
    pub data_home: Option<Utf8PathBuf>,
    /// Delay between deferred addition attempts, in milliseconds.
    pub retry_interval_ms: Option<u64>,
    /// Number of deferred addition attempts before giving up.
    pub retry_attempts: Option<u32>,
    /// `tracing` filter expression.
    pub log_filter: Option<String>,
    /// Output format for log records.
    pub log_format: Option<LogFormat>,
}

impl Config {
    /// Directory observed for sandbox entries.
    #[must_use]
    pub fn runtime_dir(&self) -> Utf8PathBuf {
        self.runtime_dir
            .clone()
            .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_RUNTIME_DIR))
    }

    /// File name of the per-sandbox environment snapshot.
    #[must_use]
    pub fn environment_file(&self) -> &str {
        self.environment_file
            .as_deref()
            .unwrap_or(DEFAULT_ENVIRONMENT_FILE)
    }

    /// Enforcement program name or path.
    #[must_use]
    pub fn enforcement_program(&self) -> &str {
        self.enforcement_program
            .as_deref()
            .unwrap_or(DEFAULT_ENFORCEMENT_PROGRAM)
    }

    /// `PATH` exported to the enforcement program.
    #[must_use]
    pub fn safe_path(&self) -> &str {
        self.safe_path.as_deref().unwrap_or(DEFAULT_SAFE_PATH)
    }

    /// Location of the workspace settings store.
    #[must_use]
    pub fn settings_file(&self) -> Utf8PathBuf {
        self.settings_file
            .clone()
            .unwrap_or_else(default_settings_file)
    }

    /// Desktop-entry directories ordered from highest to lowest priority.
    #[must_use]
    pub fn application_dirs(&self) -> ApplicationDirectories {
        let data_home = self.data_home.clone().unwrap_or_else(default_data_home);
        ApplicationDirectories::new(data_home.join("applications"))
    }

    /// Delay between deferred addition attempts.
    #[must_use]
    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms.unwrap_or(DEFAULT_RETRY_INTERVAL_MS))
    }

    /// Ceiling on deferred addition attempts.
    #[must_use]
    pub fn retry_attempts(&self) -> u32 {
        self.retry_attempts.unwrap_or(DEFAULT_RETRY_ATTEMPTS)
    }

    /// Log filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_deref().unwrap_or_else(|| default_log_filter())
    }

    /// Log output format.
    #[must_use]
    pub fn log_format(&self) -> LogFormat {
        self.log_format.unwrap_or_else(default_log_format)
    }
}

/// The three desktop-entry locations observed by the daemon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationDirectories {
    user: Utf8PathBuf,
    local: Utf8PathBuf,
    system: Utf8PathBuf,
}

impl ApplicationDirectories {
    /// Builds the set with the given per-user directory and the standard
    /// system locations.
    #[must_use]
    pub fn new(user: impl Into<Utf8PathBuf>) -> Self {
        Self {
            user: user.into(),
            local: Utf8PathBuf::from(LOCAL_APPLICATIONS_DIR),
            system: Utf8PathBuf::from(SYSTEM_APPLICATIONS_DIR),
        }
    }

    /// Builds a set from explicit directories, mainly for tests.
    #[must_use]
    pub fn with_paths(
        user: impl Into<Utf8PathBuf>,
        local: impl Into<Utf8PathBuf>,
        system: impl Into<Utf8PathBuf>,
    ) -> Self {
        Self {
            user: user.into(),
            local: local.into(),
            system: system.into(),
        }
    }

    /// Directories in lookup order: user, local, system.
    #[must_use]
    pub fn in_priority_order(&self) -> [&Utf8Path; 3] {
        [
            self.user.as_path(),
            self.local.as_path(),
            self.system.as_path(),
        ]
    }
}
