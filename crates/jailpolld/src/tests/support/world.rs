//! Poller world: a temporary runtime directory and application directories
//! wired to a real [`SandboxPoller`] with recording collaborators.

use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use camino::Utf8PathBuf;
use tempfile::TempDir;

use jailpoll_config::ApplicationDirectories;

use crate::desktop::{DesktopChange, DesktopEntryEvent, XdgCatalogue};
use crate::discovery::DiscoveryEvent;
use crate::policy::{BandwidthLimits, PolicyApplier};
use crate::poller::{PollerDeps, SandboxPoller};

use super::doubles::{FakeProbe, FakeSettings, RecordingEnforcer};

/// Deferred-addition interval used by the world's poller.
pub const RETRY_INTERVAL: Duration = Duration::from_secs(1);

const RETRY_ATTEMPTS: u32 = 10;
const ENVIRONMENT_FILE: &str = "environ";
const TIERS: [&str; 3] = ["user", "local", "system"];

/// Scenario world shared across steps and unit tests.
pub struct PollerWorld {
    root: TempDir,
    pub settings: Arc<FakeSettings>,
    pub probe: Arc<FakeProbe>,
    pub enforcer: Arc<RecordingEnforcer>,
    pub poller: SandboxPoller,
    now: Instant,
}

impl PollerWorld {
    /// Builds a world with empty directories and no workspaces.
    #[must_use]
    pub fn new() -> Self {
        let root = TempDir::new().expect("failed to create temporary directory");
        fs::create_dir(root.path().join("runtime")).expect("create runtime directory");
        for tier in TIERS {
            fs::create_dir_all(root.path().join("apps").join(tier))
                .expect("create applications directory");
        }
        let utf8 = |tier: &str| {
            Utf8PathBuf::from_path_buf(root.path().join("apps").join(tier))
                .expect("temporary path was not valid UTF-8")
        };
        let directories =
            ApplicationDirectories::with_paths(utf8(TIERS[0]), utf8(TIERS[1]), utf8(TIERS[2]));

        let settings = Arc::new(FakeSettings::default());
        let probe = Arc::new(FakeProbe::default());
        let enforcer = Arc::new(RecordingEnforcer::default());
        let poller = SandboxPoller::new(PollerDeps {
            runtime_dir: root.path().join("runtime"),
            environment_file: String::from(ENVIRONMENT_FILE),
            probe: probe.clone(),
            catalogue: Arc::new(XdgCatalogue::new(directories)),
            applier: PolicyApplier::new(settings.clone(), enforcer.clone()),
            retry_interval: RETRY_INTERVAL,
            retry_attempts: RETRY_ATTEMPTS,
        });

        Self {
            root,
            settings,
            probe,
            enforcer,
            poller,
            now: Instant::now(),
        }
    }

    /// Runtime directory watched by the poller.
    #[must_use]
    pub fn runtime_dir(&self) -> PathBuf {
        self.root.path().join("runtime")
    }

    /// Applications directory for `tier` (`user`, `local` or `system`).
    #[must_use]
    pub fn app_dir(&self, tier: &str) -> PathBuf {
        self.root.path().join("apps").join(tier)
    }

    /// Creates a runtime-directory entry without an environment snapshot.
    pub fn create_entry(&self, entry: &str) {
        fs::create_dir_all(self.runtime_dir().join(entry)).expect("create sandbox entry");
    }

    /// Writes the environment snapshot for `entry`, creating the entry.
    pub fn write_environment(&self, entry: &str, environment: &str) {
        self.create_entry(entry);
        fs::write(
            self.runtime_dir().join(entry).join(ENVIRONMENT_FILE),
            environment,
        )
        .expect("write environment snapshot");
    }

    /// Removes a runtime-directory entry.
    pub fn remove_entry(&self, entry: &str) {
        fs::remove_dir_all(self.runtime_dir().join(entry)).expect("remove sandbox entry");
    }

    /// Installs a desktop entry named `name` into `tier`.
    pub fn install_app(&self, tier: &str, file: &str, name: &str, extra: &str) -> PathBuf {
        let path = self.app_dir(tier).join(file);
        fs::write(
            &path,
            format!("[Desktop Entry]\nType=Application\nName={name}\nExec={file}\n{extra}"),
        )
        .expect("write desktop entry");
        path
    }

    /// Deletes a desktop entry.
    pub fn uninstall_app(&self, path: &Path) {
        fs::remove_file(path).expect("remove desktop entry");
    }

    /// Current simulated time.
    #[must_use]
    pub fn now(&self) -> Instant {
        self.now
    }

    /// Runs a full reload.
    pub fn reload(&mut self) -> usize {
        self.poller.reload_all(self.now)
    }

    /// Delivers a runtime-directory creation notification.
    pub fn notice_created(&mut self, entry: &str) {
        self.poller
            .on_discovery_event(DiscoveryEvent::Created(entry.to_owned()), self.now);
    }

    /// Delivers a runtime-directory deletion notification.
    pub fn notice_deleted(&mut self, entry: &str) {
        self.poller
            .on_discovery_event(DiscoveryEvent::Deleted(entry.to_owned()), self.now);
    }

    /// Delivers a desktop-entry notification.
    pub fn notice_desktop_change(&mut self, change: DesktopChange, path: &Path) {
        self.poller
            .on_desktop_entry_event(&DesktopEntryEvent::new(change, path));
    }

    /// Delivers a settings property change.
    pub fn notice_property(&mut self, path: &str) {
        self.poller.on_property_changed(path);
    }

    /// Moves the clock forward and fires due retries.
    pub fn advance(&mut self, by: Duration) {
        self.now += by;
        self.poller.fire_due_retries(self.now);
    }

    /// Moves the clock forward by `intervals` retry intervals, one at a time.
    pub fn tick(&mut self, intervals: u32) {
        for _ in 0..intervals {
            self.advance(RETRY_INTERVAL);
        }
    }

    /// Enforcement requests made so far.
    #[must_use]
    pub fn enforcement_calls(&self) -> Vec<(String, BandwidthLimits)> {
        self.enforcer.calls()
    }

    /// Whether `pid` is tracked.
    #[must_use]
    pub fn is_tracked(&self, pid: u32) -> bool {
        self.poller.registry().contains(pid)
    }
}

impl Default for PollerWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture used by behavioural scenarios.
#[must_use]
pub fn world() -> RefCell<PollerWorld> {
    RefCell::new(PollerWorld::new())
}
