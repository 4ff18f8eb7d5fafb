//! File-backed workspace settings store.
//!
//! The store is a JSON document listing workspaces. Reloading it diffs the new
//! document against the previous snapshot and reports one property path per
//! changed field, the same shape of notification a desktop settings daemon
//! emits.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use super::{
    BANDWIDTH_DOWNLOAD_PROPERTY, BANDWIDTH_UPLOAD_PROPERTY, ENABLE_NETWORK_PROPERTY,
    FINE_TUNED_NETWORK_PROPERTY, SETTINGS_TARGET, WorkspaceNetwork, WorkspaceSettings,
    workspace_property,
};

/// One workspace as stored on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct WorkspaceRecord {
    /// Workspace ordinal.
    pub ordinal: u32,
    /// Name workspace sandboxes declare in `FIREJAIL_SANDBOX_NAME`.
    pub name: String,
    /// Networking enabled for the workspace.
    pub enable_network: bool,
    /// Bandwidth shaping enabled for the workspace.
    pub fine_tuned_network: bool,
    /// Download bound.
    pub download_speed: u32,
    /// Upload bound.
    pub upload_speed: u32,
}

impl WorkspaceRecord {
    fn network(&self) -> WorkspaceNetwork {
        WorkspaceNetwork {
            enabled: self.enable_network,
            fine_tuned: self.fine_tuned_network,
            download: self.download_speed,
            upload: self.upload_speed,
        }
    }

    fn changed_keys(&self, other: &Self) -> Vec<&'static str> {
        [
            (
                ENABLE_NETWORK_PROPERTY,
                self.enable_network != other.enable_network,
            ),
            (
                FINE_TUNED_NETWORK_PROPERTY,
                self.fine_tuned_network != other.fine_tuned_network,
            ),
            (
                BANDWIDTH_DOWNLOAD_PROPERTY,
                self.download_speed != other.download_speed,
            ),
            (
                BANDWIDTH_UPLOAD_PROPERTY,
                self.upload_speed != other.upload_speed,
            ),
        ]
        .into_iter()
        .filter_map(|(key, changed)| changed.then_some(key))
        .collect()
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct SettingsDocument {
    #[serde(default)]
    workspaces: Vec<WorkspaceRecord>,
}

type Snapshot = BTreeMap<u32, WorkspaceRecord>;

/// Failures while reading the settings store.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The file could not be read.
    #[error("cannot read workspace settings '{path}': {source}")]
    Read {
        /// Store location.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The file is not a valid settings document.
    #[error("invalid workspace settings '{path}': {source}")]
    Parse {
        /// Store location.
        path: PathBuf,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
}

/// Read handle onto the current settings snapshot.
#[derive(Debug, Clone, Default)]
pub struct SharedSettings {
    snapshot: Arc<RwLock<Snapshot>>,
}

impl SharedSettings {
    /// Builds a handle over a fixed set of workspaces.
    #[must_use]
    pub fn from_records(records: impl IntoIterator<Item = WorkspaceRecord>) -> Self {
        let snapshot = records
            .into_iter()
            .map(|record| (record.ordinal, record))
            .collect();
        Self {
            snapshot: Arc::new(RwLock::new(snapshot)),
        }
    }

    fn replace(&self, snapshot: Snapshot) -> Snapshot {
        let mut guard = self.snapshot.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *guard, snapshot)
    }
}

impl WorkspaceSettings for SharedSettings {
    fn ordinal_for_name(&self, name: &str) -> Option<u32> {
        let guard = self.snapshot.read().unwrap_or_else(PoisonError::into_inner);
        guard
            .values()
            .find(|record| record.name == name)
            .map(|record| record.ordinal)
    }

    fn network(&self, ordinal: u32) -> WorkspaceNetwork {
        let guard = self.snapshot.read().unwrap_or_else(PoisonError::into_inner);
        guard
            .get(&ordinal)
            .map(WorkspaceRecord::network)
            .unwrap_or_default()
    }
}

/// Writer side of the store: loads the JSON file and publishes snapshots.
#[derive(Debug)]
pub struct SettingsFile {
    path: PathBuf,
    shared: SharedSettings,
}

impl SettingsFile {
    /// Opens the store at `path`. A missing file yields an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SettingsError> {
        let store = Self {
            path: path.into(),
            shared: SharedSettings::default(),
        };
        let snapshot = read_snapshot(&store.path)?;
        store.shared.replace(snapshot);
        Ok(store)
    }

    /// Location of the store.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Handle used by the poller to read settings.
    #[must_use]
    pub fn reader(&self) -> SharedSettings {
        self.shared.clone()
    }

    /// Re-reads the store and returns the property paths whose values changed.
    ///
    /// On failure the previous snapshot stays in place.
    pub fn reload(&self) -> Result<Vec<String>, SettingsError> {
        let next = read_snapshot(&self.path)?;
        let previous = self.shared.replace(next.clone());
        let changed = diff(&previous, &next);
        debug!(
            target: SETTINGS_TARGET,
            path = %self.path.display(),
            changes = changed.len(),
            "workspace settings reloaded"
        );
        Ok(changed)
    }
}

fn read_snapshot(path: &Path) -> Result<Snapshot, SettingsError> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(source) if source.kind() == io::ErrorKind::NotFound => {
            warn!(
                target: SETTINGS_TARGET,
                path = %path.display(),
                "workspace settings file not found, no workspace is configured"
            );
            return Ok(Snapshot::new());
        }
        Err(source) => {
            return Err(SettingsError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    let document: SettingsDocument =
        serde_json::from_str(&text).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(document
        .workspaces
        .into_iter()
        .map(|record| (record.ordinal, record))
        .collect())
}

fn diff(previous: &Snapshot, next: &Snapshot) -> Vec<String> {
    let absent = WorkspaceRecord::default();
    let mut ordinals: Vec<u32> = previous.keys().chain(next.keys()).copied().collect();
    ordinals.sort_unstable();
    ordinals.dedup();

    let mut changed = Vec::new();
    for ordinal in ordinals {
        let keys = match (previous.get(&ordinal), next.get(&ordinal)) {
            (Some(before), Some(after)) => before.changed_keys(after),
            (Some(_), None) | (None, Some(_)) => vec![
                ENABLE_NETWORK_PROPERTY,
                FINE_TUNED_NETWORK_PROPERTY,
                BANDWIDTH_DOWNLOAD_PROPERTY,
                BANDWIDTH_UPLOAD_PROPERTY,
            ],
            (None, None) => absent.changed_keys(&absent),
        };
        changed.extend(keys.into_iter().map(|key| workspace_property(ordinal, key)));
    }
    changed
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn write(dir: &TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("workspaces.json");
        fs::write(&path, body).expect("write settings");
        path
    }

    const INITIAL: &str = r#"{"workspaces": [
        {"ordinal": 1, "name": "Work", "enable_network": true, "fine_tuned_network": true,
         "download_speed": 500, "upload_speed": 100},
        {"ordinal": 2, "name": "Banking", "enable_network": false}
    ]}"#;

    #[test]
    fn reads_workspaces() {
        let dir = TempDir::new().expect("temp dir");
        let store = SettingsFile::open(write(&dir, INITIAL)).expect("open store");
        let reader = store.reader();
        assert_eq!(reader.ordinal_for_name("Work"), Some(1));
        assert_eq!(reader.ordinal_for_name("Games"), None);
        assert_eq!(
            reader.network(1),
            WorkspaceNetwork {
                enabled: true,
                fine_tuned: true,
                download: 500,
                upload: 100,
            }
        );
        assert!(!reader.network(2).enabled);
        assert_eq!(reader.network(9), WorkspaceNetwork::default());
    }

    #[test]
    fn missing_file_is_an_empty_store() {
        let dir = TempDir::new().expect("temp dir");
        let store = SettingsFile::open(dir.path().join("absent.json")).expect("open store");
        assert_eq!(store.reader().ordinal_for_name("Work"), None);
    }

    #[test]
    fn reload_reports_changed_properties() {
        let dir = TempDir::new().expect("temp dir");
        let path = write(&dir, INITIAL);
        let store = SettingsFile::open(&path).expect("open store");
        fs::write(
            &path,
            r#"{"workspaces": [
                {"ordinal": 1, "name": "Work", "enable_network": true, "fine_tuned_network": true,
                 "download_speed": 800, "upload_speed": 100},
                {"ordinal": 3, "name": "Games", "enable_network": true}
            ]}"#,
        )
        .expect("rewrite settings");

        let changed = store.reload().expect("reload");
        assert_eq!(
            changed,
            vec![
                "/security/workspace_1/bandwidth_download",
                "/security/workspace_2/enable_network",
                "/security/workspace_2/fine_tuned_network",
                "/security/workspace_2/bandwidth_download",
                "/security/workspace_2/bandwidth_upload",
                "/security/workspace_3/enable_network",
                "/security/workspace_3/fine_tuned_network",
                "/security/workspace_3/bandwidth_download",
                "/security/workspace_3/bandwidth_upload",
            ]
        );
        assert_eq!(store.reader().network(1).download, 800);
    }

    #[test]
    fn invalid_document_keeps_previous_snapshot() {
        let dir = TempDir::new().expect("temp dir");
        let path = write(&dir, INITIAL);
        let store = SettingsFile::open(&path).expect("open store");
        fs::write(&path, "{ not json").expect("corrupt settings");

        let error = store.reload().expect_err("invalid JSON");
        assert!(matches!(error, SettingsError::Parse { .. }));
        assert_eq!(store.reader().ordinal_for_name("Work"), Some(1));
    }
}
