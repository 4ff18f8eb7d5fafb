//! Filesystem watchers feeding the event loop.
//!
//! Each watcher's callback runs on the `notify` backend thread and only
//! translates notifications into [`PollerEvent`]s; all state changes happen on
//! the loop thread.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;

use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use thiserror::Error;
use tracing::{debug, warn};

use crate::desktop::DesktopEntryEvent;
use crate::discovery::DiscoveryEvent;
use crate::health::HealthReporter;

use super::PROCESS_TARGET;
use super::runtime::PollerEvent;

/// What a watcher observes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatchTarget {
    /// The sandbox runtime directory.
    RuntimeDirectory,
    /// A desktop-entry directory.
    Applications,
    /// The directory holding the workspace settings file.
    Settings,
}

impl fmt::Display for WatchTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::RuntimeDirectory => "runtime directory",
            Self::Applications => "applications directory",
            Self::Settings => "settings directory",
        };
        f.write_str(label)
    }
}

/// A watcher could not be installed.
#[derive(Debug, Error)]
#[error("cannot watch {target} '{path}': {source}")]
pub struct WatchError {
    /// Kind of watcher.
    pub target: WatchTarget,
    /// Path that could not be watched.
    pub path: PathBuf,
    /// Backend failure.
    #[source]
    pub source: notify::Error,
}

/// Paths to watch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchPlan {
    /// Sandbox runtime directory.
    pub runtime_dir: PathBuf,
    /// Desktop-entry directories, highest priority first.
    pub application_dirs: Vec<PathBuf>,
    /// Workspace settings file; its parent directory is watched.
    pub settings_file: PathBuf,
}

/// Owns every installed watcher. Dropping it stops all notifications.
#[derive(Default)]
pub struct WatchSet {
    runtime: Option<RecommendedWatcher>,
    applications: Vec<RecommendedWatcher>,
    settings: Option<RecommendedWatcher>,
}

impl fmt::Debug for WatchSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchSet")
            .field("runtime", &self.runtime.is_some())
            .field("applications", &self.applications.len())
            .field("settings", &self.settings.is_some())
            .finish()
    }
}

impl WatchSet {
    /// Installs every watcher in `plan`. Failures are reported and leave the
    /// corresponding slot empty until the next reload.
    pub fn install(
        plan: &WatchPlan,
        events: &Sender<PollerEvent>,
        reporter: &dyn HealthReporter,
    ) -> Self {
        let mut set = Self::default();

        let sender = events.clone();
        set.runtime = install_one(WatchTarget::RuntimeDirectory, &plan.runtime_dir, reporter, move |event| {
            for change in DiscoveryEvent::from_notify(&event) {
                deliver(&sender, PollerEvent::Discovery(change));
            }
        });

        for dir in &plan.application_dirs {
            let sender = events.clone();
            let watcher = install_one(WatchTarget::Applications, dir, reporter, move |event| {
                for change in DesktopEntryEvent::from_notify(&event) {
                    deliver(&sender, PollerEvent::DesktopEntry(change));
                }
            });
            set.applications.extend(watcher);
        }

        if let Some(dir) = plan.settings_file.parent() {
            let sender = events.clone();
            let file = plan.settings_file.clone();
            set.settings = install_one(WatchTarget::Settings, dir, reporter, move |event| {
                if is_settings_change(&event, &file) {
                    deliver(&sender, PollerEvent::SettingsChanged);
                }
            });
        }

        set
    }

    /// Number of live watchers.
    #[must_use]
    pub fn active(&self) -> usize {
        usize::from(self.runtime.is_some())
            + self.applications.len()
            + usize::from(self.settings.is_some())
    }
}

fn install_one(
    target: WatchTarget,
    path: &Path,
    reporter: &dyn HealthReporter,
    forward: impl Fn(notify::Event) + Send + 'static,
) -> Option<RecommendedWatcher> {
    let handler = move |result: Result<notify::Event, notify::Error>| match result {
        Ok(event) => forward(event),
        Err(error) => warn!(
            target: PROCESS_TARGET,
            watcher = %target,
            %error,
            "watcher reported an error"
        ),
    };
    let installed = RecommendedWatcher::new(handler, notify::Config::default()).and_then(
        |mut watcher| {
            watcher.watch(path, RecursiveMode::NonRecursive)?;
            Ok(watcher)
        },
    );
    match installed {
        Ok(watcher) => {
            debug!(target: PROCESS_TARGET, watcher = %target, path = %path.display(), "watching");
            reporter.watch_installed(target, path);
            Some(watcher)
        }
        Err(source) => {
            reporter.watch_failed(&WatchError {
                target,
                path: path.to_path_buf(),
                source,
            });
            None
        }
    }
}

/// Hands `event` to the loop. The receiver only goes away during teardown,
/// after which late notifications are dropped.
fn deliver(sender: &Sender<PollerEvent>, event: PollerEvent) -> bool {
    match sender.send(event) {
        Ok(()) => true,
        Err(error) => {
            debug!(target: PROCESS_TARGET, event = ?error.0, "event loop gone, dropping notification");
            false
        }
    }
}

fn is_settings_change(event: &notify::Event, file: &Path) -> bool {
    let relevant_kind = matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    );
    relevant_kind && event.paths.iter().any(|path| path.file_name() == file.file_name())
}
