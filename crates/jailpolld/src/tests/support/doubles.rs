//! Recording and in-memory doubles for the poller's collaborators.

use std::collections::{HashMap, HashSet};
use std::io;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::policy::{BandwidthEnforcer, BandwidthLimits, EnforcementError};
use crate::sandbox::ProcessProbe;
use crate::settings::{WorkspaceNetwork, WorkspaceSettings};

/// Workspace settings held in memory and editable mid-scenario.
#[derive(Debug, Default)]
pub struct FakeSettings {
    ordinals: Mutex<HashMap<String, u32>>,
    networks: Mutex<HashMap<u32, WorkspaceNetwork>>,
}

impl FakeSettings {
    pub fn add_workspace(&self, name: &str, ordinal: u32) {
        self.ordinals
            .lock()
            .expect("settings mutex poisoned")
            .insert(name.to_owned(), ordinal);
    }

    pub fn set_network(&self, ordinal: u32, network: WorkspaceNetwork) {
        self.networks
            .lock()
            .expect("settings mutex poisoned")
            .insert(ordinal, network);
    }
}

impl WorkspaceSettings for FakeSettings {
    fn ordinal_for_name(&self, name: &str) -> Option<u32> {
        self.ordinals
            .lock()
            .expect("settings mutex poisoned")
            .get(name)
            .copied()
    }

    fn network(&self, ordinal: u32) -> WorkspaceNetwork {
        self.networks
            .lock()
            .expect("settings mutex poisoned")
            .get(&ordinal)
            .copied()
            .unwrap_or_default()
    }
}

/// Records every enforcement request; can be told to fail launches.
#[derive(Debug, Default)]
pub struct RecordingEnforcer {
    calls: Mutex<Vec<(String, BandwidthLimits)>>,
    failing: AtomicBool,
}

impl RecordingEnforcer {
    /// Requests seen so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<(String, BandwidthLimits)> {
        self.calls.lock().expect("enforcer mutex poisoned").clone()
    }

    pub fn fail_launches(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }
}

impl BandwidthEnforcer for RecordingEnforcer {
    fn enforce(&self, sandbox: &str, limits: BandwidthLimits) -> Result<(), EnforcementError> {
        self.calls
            .lock()
            .expect("enforcer mutex poisoned")
            .push((sandbox.to_owned(), limits));
        if self.failing.load(Ordering::SeqCst) {
            return Err(EnforcementError {
                program: String::from("firejail"),
                sandbox: sandbox.to_owned(),
                source: io::Error::new(io::ErrorKind::NotFound, "firejail not installed"),
            });
        }
        Ok(())
    }
}

/// Treats every pid as alive unless it was explicitly killed, and counts
/// how often each pid was probed.
#[derive(Debug, Default)]
pub struct FakeProbe {
    dead: Mutex<HashSet<u32>>,
    probes: Mutex<HashMap<u32, usize>>,
}

impl FakeProbe {
    pub fn kill(&self, pid: u32) {
        self.dead.lock().expect("probe mutex poisoned").insert(pid);
    }

    /// Number of liveness checks made for `pid`.
    #[must_use]
    pub fn probes(&self, pid: u32) -> usize {
        self.probes
            .lock()
            .expect("probe mutex poisoned")
            .get(&pid)
            .copied()
            .unwrap_or_default()
    }
}

impl ProcessProbe for FakeProbe {
    fn is_alive(&self, pid: u32) -> bool {
        *self
            .probes
            .lock()
            .expect("probe mutex poisoned")
            .entry(pid)
            .or_default() += 1;
        !self.dead.lock().expect("probe mutex poisoned").contains(&pid)
    }
}
