//! The sandbox poller: keeps the registry of live sandboxes in step with the
//! runtime directory, desktop entries and workspace settings.
//!
//! All methods take `&mut self` and run to completion; the event loop feeds
//! them one notification at a time, so the registry needs no locking.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::desktop::{ApplicationCatalogue, DESKTOP_TARGET, DesktopChange, DesktopEntry, DesktopEntryEvent};
use crate::discovery::{
    DISCOVERY_TARGET, DiscoveryEvent, PendingAddition, RetryQueue, parse_pid, scan_runtime_dir,
};
use crate::policy::{POLICY_TARGET, PolicyApplier, PolicyError, PolicyOutcome};
use crate::sandbox::{
    ProcessProbe, SandboxKind, SandboxProcess, SandboxRegistry, read_environment,
};
use crate::settings::{
    BANDWIDTH_UPLOAD_PROPERTY, PropertyPath, SETTINGS_TARGET, workspace_property,
};

/// Result of trying to track a runtime-directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// The sandbox is now tracked.
    Tracked,
    /// Nothing to do: not a pid, already tracked, or the process is gone.
    Ignored,
    /// The environment snapshot is missing or not yet classifiable.
    NotReady,
    /// Classified, but policy could not be established, so it stays untracked.
    Untracked,
}

impl AddOutcome {
    /// Whether a later attempt may succeed.
    #[must_use]
    pub fn is_retryable(self) -> bool {
        self == Self::NotReady
    }
}

/// Collaborators and settings the poller is built from.
pub struct PollerDeps {
    /// Directory holding one entry per running sandbox.
    pub runtime_dir: PathBuf,
    /// File name of the environment snapshot inside each entry.
    pub environment_file: String,
    /// Liveness probe.
    pub probe: Arc<dyn ProcessProbe>,
    /// Installed applications, for resolving desktop sandboxes.
    pub catalogue: Arc<dyn ApplicationCatalogue>,
    /// Policy computation and enforcement.
    pub applier: PolicyApplier,
    /// Delay between deferred addition attempts.
    pub retry_interval: Duration,
    /// Maximum number of deferred addition attempts.
    pub retry_attempts: u32,
}

/// Owns the sandbox registry and reacts to every notification source.
pub struct SandboxPoller {
    runtime_dir: PathBuf,
    environment_file: String,
    probe: Arc<dyn ProcessProbe>,
    catalogue: Arc<dyn ApplicationCatalogue>,
    applier: PolicyApplier,
    registry: SandboxRegistry,
    retries: RetryQueue,
}

impl SandboxPoller {
    /// Builds an idle poller; call [`SandboxPoller::reload_all`] to populate it.
    #[must_use]
    pub fn new(deps: PollerDeps) -> Self {
        Self {
            runtime_dir: deps.runtime_dir,
            environment_file: deps.environment_file,
            probe: deps.probe,
            catalogue: deps.catalogue,
            applier: deps.applier,
            registry: SandboxRegistry::new(),
            retries: RetryQueue::new(deps.retry_interval, deps.retry_attempts),
        }
    }

    /// Tracked sandboxes.
    #[must_use]
    pub fn registry(&self) -> &SandboxRegistry {
        &self.registry
    }

    /// Number of entries waiting for a deferred addition attempt.
    #[must_use]
    pub fn pending_additions(&self) -> usize {
        self.retries.len()
    }

    /// Earliest time a deferred addition is due.
    #[must_use]
    pub fn next_retry_deadline(&self) -> Option<Instant> {
        self.retries.next_deadline()
    }

    /// Forgets every sandbox and rebuilds the registry from the runtime
    /// directory. Returns the number of tracked sandboxes afterwards.
    pub fn reload_all(&mut self, now: Instant) -> usize {
        self.registry.clear();
        self.retries.clear();
        match scan_runtime_dir(&self.runtime_dir) {
            Ok(entries) => {
                for entry in entries {
                    self.attempt(PendingAddition::new(entry), now);
                }
            }
            Err(error) => warn!(
                target: DISCOVERY_TARGET,
                runtime_dir = %self.runtime_dir.display(),
                %error,
                "cannot scan sandbox runtime directory"
            ),
        }
        self.registry.len()
    }

    /// Reacts to a runtime-directory change.
    pub fn on_discovery_event(&mut self, event: DiscoveryEvent, now: Instant) {
        match event {
            DiscoveryEvent::Created(entry) => {
                debug!(target: DISCOVERY_TARGET, %entry, "sandbox entry created");
                if !self.retries.schedule(PendingAddition::new(entry.as_str()), now) {
                    debug!(target: DISCOVERY_TARGET, %entry, "addition already pending");
                }
            }
            DiscoveryEvent::Deleted(entry) => {
                debug!(target: DISCOVERY_TARGET, %entry, "sandbox entry deleted");
                self.remove_entry(&entry);
            }
            DiscoveryEvent::Other { entry, kind } => {
                debug!(target: DISCOVERY_TARGET, %entry, %kind, "ignoring runtime directory event");
            }
        }
    }

    /// Runs every deferred addition due at `now`.
    pub fn fire_due_retries(&mut self, now: Instant) {
        for pending in self.retries.take_due(now) {
            self.attempt(pending, now);
        }
    }

    fn attempt(&mut self, mut pending: PendingAddition, now: Instant) {
        pending.record_attempt();
        let outcome = self.add_entry(pending.entry());
        if !outcome.is_retryable() {
            return;
        }
        let entry = pending.entry().to_owned();
        let attempts = pending.attempts();
        if self.retries.schedule(pending, now) {
            debug!(target: DISCOVERY_TARGET, %entry, attempts, "sandbox not ready, will retry");
        } else {
            info!(
                target: DISCOVERY_TARGET,
                %entry,
                attempts,
                "sandbox never became ready, giving up"
            );
        }
    }

    /// Tracks the runtime-directory entry `entry`.
    pub fn add_entry(&mut self, entry: &str) -> AddOutcome {
        match parse_pid(entry) {
            Some(pid) => self.add_from_pid(pid),
            None => AddOutcome::Ignored,
        }
    }

    /// Classifies `pid`, establishes its policy and tracks it.
    pub fn add_from_pid(&mut self, pid: u32) -> AddOutcome {
        if self.registry.contains(pid) {
            return AddOutcome::Ignored;
        }
        if !self.probe.is_alive(pid) {
            debug!(target: DISCOVERY_TARGET, pid, "sandbox process already gone");
            return AddOutcome::Ignored;
        }

        let snapshot_path = self
            .runtime_dir
            .join(pid.to_string())
            .join(&self.environment_file);
        let snapshot = match read_environment(&snapshot_path) {
            Ok(snapshot) => snapshot,
            Err(error) => {
                debug!(target: DISCOVERY_TARGET, pid, %error, "environment not available yet");
                return AddOutcome::NotReady;
            }
        };

        let sandbox = match snapshot.kind {
            SandboxKind::Unclassified => {
                debug!(target: DISCOVERY_TARGET, pid, "environment does not classify the sandbox yet");
                return AddOutcome::NotReady;
            }
            SandboxKind::Workspace => {
                let Some(ordinal) = self.applier.settings().ordinal_for_name(&snapshot.name)
                else {
                    warn!(
                        target: DISCOVERY_TARGET,
                        pid,
                        name = %snapshot.name,
                        "no workspace matches the sandbox name"
                    );
                    return AddOutcome::Untracked;
                };
                SandboxProcess::workspace(pid, snapshot.name, ordinal)
            }
            SandboxKind::DesktopApp => SandboxProcess::desktop_app(pid, snapshot.name),
        };

        let sandbox = match self.start_watching(sandbox) {
            Ok(sandbox) => sandbox,
            Err(error) => {
                warn!(target: DISCOVERY_TARGET, pid, %error, "sandbox left unmanaged");
                return AddOutcome::Untracked;
            }
        };
        info!(
            target: DISCOVERY_TARGET,
            pid,
            name = sandbox.name(),
            kind = %sandbox.kind(),
            "tracking sandbox"
        );
        match self.registry.insert(sandbox) {
            Ok(()) => AddOutcome::Tracked,
            Err(_) => AddOutcome::Ignored,
        }
    }

    /// Applies initial policy. A workspace sandbox is kept when the launch
    /// fails; a desktop sandbox is only kept once its limits were launched.
    fn start_watching(&self, mut sandbox: SandboxProcess) -> Result<SandboxProcess, PolicyError> {
        let result = match (sandbox.kind(), sandbox.workspace_ordinal()) {
            (SandboxKind::Workspace, Some(ordinal)) => {
                let property = workspace_property(ordinal, BANDWIDTH_UPLOAD_PROPERTY);
                self.applier.apply_workspace_property(&sandbox, &property)
            }
            (SandboxKind::DesktopApp, _) => {
                let path = self.catalogue.find_by_name(sandbox.name()).ok_or_else(|| {
                    PolicyError::MissingDesktopEntry {
                        pid: sandbox.pid(),
                        name: sandbox.name().to_owned(),
                    }
                })?;
                sandbox.set_desktop_entry_path(path);
                self.applier.apply_desktop_entry(&sandbox)
            }
            _ => {
                return Err(PolicyError::NotAWorkspace {
                    pid: sandbox.pid(),
                    name: sandbox.name().to_owned(),
                });
            }
        };
        match result {
            Ok(outcome) => {
                log_outcome(&sandbox, outcome);
                Ok(sandbox)
            }
            Err(PolicyError::Enforcement(error)) if sandbox.kind() == SandboxKind::Workspace => {
                warn!(target: POLICY_TARGET, pid = sandbox.pid(), %error, "policy not enforced");
                Ok(sandbox)
            }
            Err(error) => Err(error),
        }
    }

    /// Stops tracking the sandbox behind `entry`.
    pub fn remove_entry(&mut self, entry: &str) -> bool {
        parse_pid(entry).is_some_and(|pid| self.remove_from_pid(pid))
    }

    /// Stops tracking `pid`; `false` when it was not tracked.
    pub fn remove_from_pid(&mut self, pid: u32) -> bool {
        match self.registry.remove(pid) {
            Some(sandbox) => {
                info!(
                    target: DISCOVERY_TARGET,
                    pid,
                    name = sandbox.name(),
                    "stopped tracking sandbox"
                );
                true
            }
            None => false,
        }
    }

    /// Reacts to a change in one of the desktop-entry directories.
    pub fn on_desktop_entry_event(&mut self, event: &DesktopEntryEvent) {
        let matched = match event.change {
            DesktopChange::Deleted => self
                .registry
                .find_by_desktop_entry(&event.path)
                .map(SandboxProcess::pid),
            DesktopChange::Created | DesktopChange::Changed => {
                let entry = match DesktopEntry::load(&event.path) {
                    Ok(entry) => entry,
                    Err(error) => {
                        debug!(target: DESKTOP_TARGET, %error, "ignoring desktop entry change");
                        return;
                    }
                };
                self.registry
                    .find_desktop_app(entry.name())
                    .map(SandboxProcess::pid)
            }
        };
        let Some(pid) = matched else {
            return;
        };

        match event.change {
            DesktopChange::Changed => {
                let Some(sandbox) = self
                    .registry
                    .get(pid)
                    .filter(|sandbox| sandbox.desktop_entry_path() == Some(event.path.as_path()))
                else {
                    return;
                };
                debug!(target: DESKTOP_TARGET, pid, path = %event.path.display(), "desktop entry edited");
                match self.applier.apply_desktop_entry(sandbox) {
                    Ok(outcome) => log_outcome(sandbox, outcome),
                    Err(error) => {
                        warn!(target: POLICY_TARGET, pid, %error, "policy not reapplied");
                    }
                }
            }
            DesktopChange::Created | DesktopChange::Deleted => {
                debug!(
                    target: DESKTOP_TARGET,
                    pid,
                    path = %event.path.display(),
                    change = ?event.change,
                    "desktop entry set changed, resynchronising sandbox"
                );
                self.remove_from_pid(pid);
                let outcome = self.add_from_pid(pid);
                debug!(target: DESKTOP_TARGET, pid, ?outcome, "sandbox resynchronised");
            }
        }
    }

    /// Reacts to a settings property change.
    pub fn on_property_changed(&mut self, path: &str) {
        let property = match PropertyPath::parse(path) {
            Ok(Some(property)) => property,
            Ok(None) => return,
            Err(error) => {
                warn!(target: SETTINGS_TARGET, %error, "dropping property change");
                return;
            }
        };
        let Some(sandbox) = self.registry.find_workspace(property.ordinal()) else {
            debug!(
                target: SETTINGS_TARGET,
                workspace = property.ordinal(),
                "no running sandbox for workspace"
            );
            return;
        };
        match self.applier.apply_workspace_property(sandbox, property.as_str()) {
            Ok(outcome) => log_outcome(sandbox, outcome),
            Err(error) => {
                warn!(target: POLICY_TARGET, pid = sandbox.pid(), %error, "policy not applied");
            }
        }
    }
}

fn log_outcome(sandbox: &SandboxProcess, outcome: PolicyOutcome) {
    debug!(
        target: POLICY_TARGET,
        pid = sandbox.pid(),
        name = sandbox.name(),
        ?outcome,
        "policy applied"
    );
}
