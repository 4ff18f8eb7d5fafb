//! Computes effective network policy for a sandbox and hands it to the enforcer.
//!
//! Workspace sandboxes take their limits from the workspace settings store;
//! desktop application sandboxes take them from custom keys in their desktop
//! entry. Both paths end in a single [`BandwidthEnforcer::enforce`] call.

mod enforcer;

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::desktop::{
    BANDWIDTH_DOWNLOAD_KEY, BANDWIDTH_UPLOAD_KEY, DesktopEntry, DesktopEntryError,
    ENABLE_NETWORK_KEY,
};
use crate::sandbox::SandboxProcess;
use crate::settings::{
    BANDWIDTH_DOWNLOAD_PROPERTY, BANDWIDTH_UPLOAD_PROPERTY, PROXY_IP_PROPERTY,
    PROXY_PORT_PROPERTY, PropertyPath, PropertyPathError, WorkspaceSettings,
};

pub use enforcer::{
    BandwidthEnforcer, EnforcementError, FirejailEnforcer, bandwidth_arguments,
    sanitised_environment,
};

pub(crate) const POLICY_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::policy");

/// Bound applied when a desktop entry does not name one.
pub const DEFAULT_BANDWIDTH: u32 = 200_000;

/// Download and upload bounds handed to the enforcement tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BandwidthLimits {
    /// Download bound.
    pub download: u32,
    /// Upload bound.
    pub upload: u32,
}

impl BandwidthLimits {
    /// Builds a pair of limits.
    #[must_use]
    pub const fn new(download: u32, upload: u32) -> Self {
        Self { download, upload }
    }
}

impl Default for BandwidthLimits {
    fn default() -> Self {
        Self::new(DEFAULT_BANDWIDTH, DEFAULT_BANDWIDTH)
    }
}

/// What applying policy to a sandbox amounted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyOutcome {
    /// The enforcement tool was launched with these limits.
    Enforced(BandwidthLimits),
    /// Networking or shaping is off, so there is nothing to enforce.
    Skipped,
    /// The property is recognised but not acted upon.
    Unsupported,
    /// The property is not one this daemon manages.
    Unmanaged,
}

/// Failures that leave a sandbox without applied policy.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// The sandbox is not a workspace sandbox.
    #[error("sandbox {pid} ('{name}') is not bound to a workspace")]
    NotAWorkspace {
        /// Sandbox pid.
        pid: u32,
        /// Sandbox name.
        name: String,
    },
    /// The sandbox has no resolved desktop entry.
    #[error("sandbox {pid} ('{name}') has no desktop entry")]
    MissingDesktopEntry {
        /// Sandbox pid.
        pid: u32,
        /// Sandbox name.
        name: String,
    },
    /// The property path is malformed.
    #[error(transparent)]
    Property(#[from] PropertyPathError),
    /// The desktop entry could not be loaded.
    #[error(transparent)]
    DesktopEntry(#[from] DesktopEntryError),
    /// The enforcement tool could not be launched.
    #[error(transparent)]
    Enforcement(#[from] EnforcementError),
}

/// Applies workspace and desktop-entry policy through a [`BandwidthEnforcer`].
#[derive(Clone)]
pub struct PolicyApplier {
    settings: Arc<dyn WorkspaceSettings>,
    enforcer: Arc<dyn BandwidthEnforcer>,
}

impl PolicyApplier {
    /// Builds an applier reading `settings` and launching through `enforcer`.
    pub fn new(settings: Arc<dyn WorkspaceSettings>, enforcer: Arc<dyn BandwidthEnforcer>) -> Self {
        Self { settings, enforcer }
    }

    /// Settings the applier reads from.
    #[must_use]
    pub fn settings(&self) -> &dyn WorkspaceSettings {
        self.settings.as_ref()
    }

    /// Applies the workspace property `path` to `sandbox`.
    ///
    /// Only the trailing key of `path` matters; the workspace is the one the
    /// sandbox is bound to.
    pub fn apply_workspace_property(
        &self,
        sandbox: &SandboxProcess,
        path: &str,
    ) -> Result<PolicyOutcome, PolicyError> {
        let ordinal = sandbox
            .workspace_ordinal()
            .ok_or_else(|| PolicyError::NotAWorkspace {
                pid: sandbox.pid(),
                name: sandbox.name().to_owned(),
            })?;
        let key = match PropertyPath::parse(path)? {
            Some(property) => property.key(),
            None => return Ok(PolicyOutcome::Unmanaged),
        };

        match key {
            BANDWIDTH_DOWNLOAD_PROPERTY | BANDWIDTH_UPLOAD_PROPERTY => {
                let network = self.settings.network(ordinal);
                if !network.fine_tuned || !network.enabled {
                    debug!(
                        target: POLICY_TARGET,
                        pid = sandbox.pid(),
                        workspace = ordinal,
                        enabled = network.enabled,
                        fine_tuned = network.fine_tuned,
                        "bandwidth shaping not active for workspace"
                    );
                    return Ok(PolicyOutcome::Skipped);
                }
                let limits = BandwidthLimits::new(network.download, network.upload);
                self.enforcer.enforce(sandbox.name(), limits)?;
                Ok(PolicyOutcome::Enforced(limits))
            }
            PROXY_IP_PROPERTY | PROXY_PORT_PROPERTY => {
                info!(
                    target: POLICY_TARGET,
                    pid = sandbox.pid(),
                    workspace = ordinal,
                    property = path,
                    "proxy settings are not applied to running sandboxes"
                );
                Ok(PolicyOutcome::Unsupported)
            }
            _ => Ok(PolicyOutcome::Unmanaged),
        }
    }

    /// Applies the limits from `sandbox`'s desktop entry.
    pub fn apply_desktop_entry(
        &self,
        sandbox: &SandboxProcess,
    ) -> Result<PolicyOutcome, PolicyError> {
        let path = sandbox
            .desktop_entry_path()
            .ok_or_else(|| PolicyError::MissingDesktopEntry {
                pid: sandbox.pid(),
                name: sandbox.name().to_owned(),
            })?;
        let entry = DesktopEntry::load(path)?;

        if entry.has_key(ENABLE_NETWORK_KEY) && entry.boolean(ENABLE_NETWORK_KEY) != Some(true) {
            debug!(
                target: POLICY_TARGET,
                pid = sandbox.pid(),
                entry = %path.display(),
                "network disabled by desktop entry"
            );
            return Ok(PolicyOutcome::Skipped);
        }

        let limits = BandwidthLimits::new(
            bandwidth_key(&entry, BANDWIDTH_DOWNLOAD_KEY),
            bandwidth_key(&entry, BANDWIDTH_UPLOAD_KEY),
        );
        self.enforcer.enforce(sandbox.name(), limits)?;
        Ok(PolicyOutcome::Enforced(limits))
    }
}

fn bandwidth_key(entry: &DesktopEntry, key: &str) -> u32 {
    match entry.integer(key) {
        None => DEFAULT_BANDWIDTH,
        Some(Ok(value)) => value,
        Some(Err(error)) => {
            warn!(
                target: POLICY_TARGET,
                entry = %entry.path().display(),
                key,
                %error,
                default = DEFAULT_BANDWIDTH,
                "ignoring malformed bandwidth value"
            );
            DEFAULT_BANDWIDTH
        }
    }
}
