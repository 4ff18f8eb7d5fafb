//! Live sandbox model: classification, liveness probing and the registry.

mod environment;
mod probe;
mod registry;

use std::fmt;
use std::path::{Path, PathBuf};

pub use environment::{
    EnvironmentError, EnvironmentSnapshot, NAME_VARIABLE, WORKSPACE_VARIABLE, classify,
    read_environment,
};
pub use probe::{ProcessProbe, SignalProbe};
pub use registry::SandboxRegistry;

/// Sandbox flavour, guessed from the sandbox's environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SandboxKind {
    /// Neither marker variable was present.
    Unclassified,
    /// Sandbox enforcing a workspace security profile.
    Workspace,
    /// Sandbox wrapping an individual desktop application.
    DesktopApp,
}

impl fmt::Display for SandboxKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Unclassified => "unclassified",
            Self::Workspace => "workspace",
            Self::DesktopApp => "desktop app",
        };
        f.write_str(label)
    }
}

/// One live, classified sandbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxProcess {
    pid: u32,
    name: String,
    kind: SandboxKind,
    workspace_ordinal: Option<u32>,
    desktop_entry_path: Option<PathBuf>,
}

impl SandboxProcess {
    /// Builds a workspace sandbox bound to `ordinal`.
    #[must_use]
    pub fn workspace(pid: u32, name: impl Into<String>, ordinal: u32) -> Self {
        Self {
            pid,
            name: name.into(),
            kind: SandboxKind::Workspace,
            workspace_ordinal: Some(ordinal),
            desktop_entry_path: None,
        }
    }

    /// Builds a desktop application sandbox whose entry is not yet resolved.
    #[must_use]
    pub fn desktop_app(pid: u32, name: impl Into<String>) -> Self {
        Self {
            pid,
            name: name.into(),
            kind: SandboxKind::DesktopApp,
            workspace_ordinal: None,
            desktop_entry_path: None,
        }
    }

    /// Process id of the sandbox.
    #[must_use]
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Name declared by the sandbox in its environment.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sandbox flavour.
    #[must_use]
    pub fn kind(&self) -> SandboxKind {
        self.kind
    }

    /// Workspace the sandbox belongs to, for workspace sandboxes.
    #[must_use]
    pub fn workspace_ordinal(&self) -> Option<u32> {
        self.workspace_ordinal
    }

    /// Desktop entry the sandbox's policy is read from, once resolved.
    #[must_use]
    pub fn desktop_entry_path(&self) -> Option<&Path> {
        self.desktop_entry_path.as_deref()
    }

    /// Records the desktop entry resolved for this sandbox.
    pub fn set_desktop_entry_path(&mut self, path: impl Into<PathBuf>) {
        self.desktop_entry_path = Some(path.into());
    }
}
