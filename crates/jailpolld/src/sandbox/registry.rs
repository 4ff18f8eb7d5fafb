//! In-memory table of tracked sandboxes keyed by pid.
//!
//! Entries are ordered by pid, so lookups by name or ordinal that match
//! several sandboxes always resolve to the lowest pid.

use std::collections::BTreeMap;
use std::path::Path;

use super::{SandboxKind, SandboxProcess};

/// Owns every tracked [`SandboxProcess`].
#[derive(Debug, Default)]
pub struct SandboxRegistry {
    sandboxes: BTreeMap<u32, SandboxProcess>,
}

impl SandboxRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tracked sandboxes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sandboxes.len()
    }

    /// Whether no sandbox is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sandboxes.is_empty()
    }

    /// Whether `pid` is tracked.
    #[must_use]
    pub fn contains(&self, pid: u32) -> bool {
        self.sandboxes.contains_key(&pid)
    }

    /// Looks up a sandbox by pid.
    #[must_use]
    pub fn get(&self, pid: u32) -> Option<&SandboxProcess> {
        self.sandboxes.get(&pid)
    }

    /// Tracks `sandbox`. An already tracked pid is left untouched and the
    /// rejected value is handed back.
    pub fn insert(&mut self, sandbox: SandboxProcess) -> Result<(), SandboxProcess> {
        if self.contains(sandbox.pid()) {
            return Err(sandbox);
        }
        self.sandboxes.insert(sandbox.pid(), sandbox);
        Ok(())
    }

    /// Stops tracking `pid`, returning the removed sandbox.
    pub fn remove(&mut self, pid: u32) -> Option<SandboxProcess> {
        self.sandboxes.remove(&pid)
    }

    /// Drops every tracked sandbox.
    pub fn clear(&mut self) {
        self.sandboxes.clear();
    }

    /// Iterates over tracked sandboxes in pid order.
    pub fn iter(&self) -> impl Iterator<Item = &SandboxProcess> {
        self.sandboxes.values()
    }

    /// First workspace sandbox bound to `ordinal`.
    #[must_use]
    pub fn find_workspace(&self, ordinal: u32) -> Option<&SandboxProcess> {
        self.iter().find(|sandbox| {
            sandbox.kind() == SandboxKind::Workspace && sandbox.workspace_ordinal() == Some(ordinal)
        })
    }

    /// First desktop application sandbox declaring `name`.
    #[must_use]
    pub fn find_desktop_app(&self, name: &str) -> Option<&SandboxProcess> {
        self.iter()
            .find(|sandbox| sandbox.kind() == SandboxKind::DesktopApp && sandbox.name() == name)
    }

    /// First desktop application sandbox whose policy comes from `path`.
    #[must_use]
    pub fn find_by_desktop_entry(&self, path: &Path) -> Option<&SandboxProcess> {
        self.iter().find(|sandbox| {
            sandbox.kind() == SandboxKind::DesktopApp && sandbox.desktop_entry_path() == Some(path)
        })
    }
}
