//! Structured health reporting for daemon lifecycle events.

use std::path::Path;
use std::sync::Arc;

use crate::bootstrap::BootstrapError;
use crate::process::{WatchError, WatchTarget};

use jailpoll_config::Config;

const HEALTH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::health");

/// Observer trait used to surface lifecycle events to telemetry sinks.
pub trait HealthReporter: Send + Sync {
    /// Invoked before configuration loading begins.
    fn bootstrap_starting(&self);

    /// Invoked after bootstrap completes successfully.
    fn bootstrap_succeeded(&self, config: &Config);

    /// Invoked when bootstrap fails.
    fn bootstrap_failed(&self, error: &BootstrapError);

    /// Invoked after a watcher is installed on `path`.
    fn watch_installed(&self, target: WatchTarget, path: &Path);

    /// Invoked when a watcher cannot be installed.
    fn watch_failed(&self, error: &WatchError);

    /// Invoked after a full reload with the number of tracked sandboxes.
    fn reload_completed(&self, tracked: usize);
}

impl<T> HealthReporter for Arc<T>
where
    T: HealthReporter + ?Sized,
{
    fn bootstrap_starting(&self) {
        (**self).bootstrap_starting();
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        (**self).bootstrap_succeeded(config);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        (**self).bootstrap_failed(error);
    }

    fn watch_installed(&self, target: WatchTarget, path: &Path) {
        (**self).watch_installed(target, path);
    }

    fn watch_failed(&self, error: &WatchError) {
        (**self).watch_failed(error);
    }

    fn reload_completed(&self, tracked: usize) {
        (**self).reload_completed(tracked);
    }
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredHealthReporter;

impl StructuredHealthReporter {
    /// Builds a new reporter.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl HealthReporter for StructuredHealthReporter {
    fn bootstrap_starting(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_starting",
            "starting daemon bootstrap"
        );
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_succeeded",
            runtime_dir = %config.runtime_dir(),
            settings_file = %config.settings_file(),
            log_filter = %config.log_filter(),
            log_format = ?config.log_format(),
            "daemon bootstrap completed"
        );
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "bootstrap_failed",
            error = %error,
            "daemon bootstrap failed"
        );
    }

    fn watch_installed(&self, target: WatchTarget, path: &Path) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "watch_installed",
            watcher = %target,
            path = %path.display(),
            "watcher installed"
        );
    }

    fn watch_failed(&self, error: &WatchError) {
        tracing::warn!(
            target: HEALTH_TARGET,
            event = "watch_failed",
            watcher = %error.target,
            path = %error.path.display(),
            error = %error.source,
            "watcher unavailable until the next reload"
        );
    }

    fn reload_completed(&self, tracked: usize) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "reload_completed",
            tracked,
            "sandbox registry rebuilt"
        );
    }
}
