//! The single-threaded event loop driving the poller.

use std::ops::ControlFlow;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::desktop::DesktopEntryEvent;
use crate::discovery::DiscoveryEvent;
use crate::health::HealthReporter;
use crate::poller::SandboxPoller;
use crate::settings::SettingsFile;

use super::PROCESS_TARGET;
use super::watch::{WatchPlan, WatchSet};

/// Everything the event loop reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollerEvent {
    /// The runtime directory changed.
    Discovery(DiscoveryEvent),
    /// A desktop-entry directory changed.
    DesktopEntry(DesktopEntryEvent),
    /// The workspace settings file changed.
    SettingsChanged,
    /// Rebuild watchers and the registry from scratch.
    Reload,
    /// Stop the loop.
    Shutdown,
}

/// Owns the poller, its watchers and the channel they feed.
pub struct Runtime {
    // Declared first so watchers are dropped before the poller.
    watches: WatchSet,
    poller: SandboxPoller,
    settings: SettingsFile,
    plan: WatchPlan,
    reporter: Arc<dyn HealthReporter>,
    sender: Sender<PollerEvent>,
    receiver: Receiver<PollerEvent>,
}

impl Runtime {
    /// Builds a runtime; nothing is watched until the first reload.
    pub fn new(
        poller: SandboxPoller,
        settings: SettingsFile,
        plan: WatchPlan,
        reporter: Arc<dyn HealthReporter>,
    ) -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            watches: WatchSet::default(),
            poller,
            settings,
            plan,
            reporter,
            sender,
            receiver,
        }
    }

    /// Handle for feeding events into the loop.
    #[must_use]
    pub fn sender(&self) -> Sender<PollerEvent> {
        self.sender.clone()
    }

    /// The poller driven by this runtime.
    #[must_use]
    pub fn poller(&self) -> &SandboxPoller {
        &self.poller
    }

    /// Number of live watchers.
    #[must_use]
    pub fn active_watches(&self) -> usize {
        self.watches.active()
    }

    /// Reinstalls every watcher, then rebuilds the registry.
    pub fn reload(&mut self) {
        self.watches = WatchSet::default();
        self.watches = WatchSet::install(&self.plan, &self.sender, self.reporter.as_ref());
        let tracked = self.poller.reload_all(Instant::now());
        self.reporter.reload_completed(tracked);
    }

    /// Processes one event to completion.
    pub fn handle(&mut self, event: PollerEvent) -> ControlFlow<()> {
        let now = Instant::now();
        match event {
            PollerEvent::Discovery(change) => self.poller.on_discovery_event(change, now),
            PollerEvent::DesktopEntry(change) => self.poller.on_desktop_entry_event(&change),
            PollerEvent::SettingsChanged => self.reload_settings(),
            PollerEvent::Reload => {
                info!(target: PROCESS_TARGET, "full reload requested");
                self.reload();
            }
            PollerEvent::Shutdown => return ControlFlow::Break(()),
        }
        self.poller.fire_due_retries(now);
        ControlFlow::Continue(())
    }

    fn reload_settings(&mut self) {
        match self.settings.reload() {
            Ok(changed) => {
                for property in changed {
                    self.poller.on_property_changed(&property);
                }
            }
            Err(error) => warn!(
                target: PROCESS_TARGET,
                %error,
                "keeping previous workspace settings"
            ),
        }
    }

    /// Reloads, then processes events until shutdown.
    pub fn run(mut self) {
        self.reload();
        loop {
            let received = match self.poller.next_retry_deadline() {
                Some(deadline) => {
                    let timeout = deadline.saturating_duration_since(Instant::now());
                    match self.receiver.recv_timeout(timeout) {
                        Ok(event) => Some(event),
                        Err(RecvTimeoutError::Timeout) => None,
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                None => match self.receiver.recv() {
                    Ok(event) => Some(event),
                    Err(_) => break,
                },
            };
            match received {
                Some(event) => {
                    debug!(target: PROCESS_TARGET, ?event, "dispatching event");
                    if self.handle(event).is_break() {
                        break;
                    }
                }
                None => self.poller.fire_due_retries(Instant::now()),
            }
        }
        self.shutdown();
    }

    fn shutdown(self) {
        let Self {
            watches, poller, ..
        } = self;
        drop(watches);
        info!(
            target: PROCESS_TARGET,
            tracked = poller.registry().len(),
            "watchers removed, releasing registry"
        );
        drop(poller);
    }
}
