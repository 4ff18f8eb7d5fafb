//! Test double for [`HealthReporter`] that records structured events for assertions.

use std::path::Path;
use std::sync::Mutex;

use crate::bootstrap::BootstrapError;
use crate::health::HealthReporter;
use crate::process::{WatchError, WatchTarget};

use jailpoll_config::Config;

/// Structured health events tracked during scenarios.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HealthEvent {
    /// Bootstrap started.
    BootstrapStarting,
    /// Bootstrap completed successfully.
    BootstrapSucceeded,
    /// Bootstrap failed with an error description.
    BootstrapFailed(String),
    /// A watcher was installed.
    WatchInstalled(WatchTarget),
    /// A watcher could not be installed.
    WatchFailed(WatchTarget),
    /// A reload finished tracking this many sandboxes.
    ReloadCompleted(usize),
}

/// Records health events for assertions.
#[derive(Debug, Default)]
pub struct RecordingHealthReporter {
    events: Mutex<Vec<HealthEvent>>,
}

impl RecordingHealthReporter {
    /// Captures a copy of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<HealthEvent> {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .clone()
    }

    pub fn record(&self, event: HealthEvent) {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .push(event);
    }
}

impl HealthReporter for RecordingHealthReporter {
    fn bootstrap_starting(&self) {
        self.record(HealthEvent::BootstrapStarting);
    }

    fn bootstrap_succeeded(&self, _config: &Config) {
        self.record(HealthEvent::BootstrapSucceeded);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        self.record(HealthEvent::BootstrapFailed(error.to_string()));
    }

    fn watch_installed(&self, target: WatchTarget, _path: &Path) {
        self.record(HealthEvent::WatchInstalled(target));
    }

    fn watch_failed(&self, error: &WatchError) {
        self.record(HealthEvent::WatchFailed(error.target));
    }

    fn reload_completed(&self, tracked: usize) {
        self.record(HealthEvent::ReloadCompleted(tracked));
    }
}
