//! Workspace security settings: read access and property-change routing keys.

mod store;

use std::fmt;

use thiserror::Error;

pub use store::{SettingsError, SettingsFile, SharedSettings, WorkspaceRecord};

pub(crate) const SETTINGS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::settings");

/// Prefix shared by every workspace security property.
pub const WORKSPACE_PROPERTY_PREFIX: &str = "/security/workspace_";

/// Property carrying the download bound of a workspace.
pub const BANDWIDTH_DOWNLOAD_PROPERTY: &str = "bandwidth_download";

/// Property carrying the upload bound of a workspace.
pub const BANDWIDTH_UPLOAD_PROPERTY: &str = "bandwidth_upload";

/// Property carrying the proxy address of a workspace.
pub const PROXY_IP_PROPERTY: &str = "proxy_ip";

/// Property carrying the proxy port of a workspace.
pub const PROXY_PORT_PROPERTY: &str = "proxy_port";

/// Property toggling networking for a workspace.
pub const ENABLE_NETWORK_PROPERTY: &str = "enable_network";

/// Property toggling bandwidth fine-tuning for a workspace.
pub const FINE_TUNED_NETWORK_PROPERTY: &str = "fine_tuned_network";

/// Network settings of one workspace.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkspaceNetwork {
    /// Networking is available inside the workspace's sandboxes.
    pub enabled: bool,
    /// Bandwidth is shaped per workspace rather than left unrestricted.
    pub fine_tuned: bool,
    /// Download bound.
    pub download: u32,
    /// Upload bound.
    pub upload: u32,
}

/// Read interface of the workspace configuration store.
pub trait WorkspaceSettings: Send + Sync {
    /// Maps a workspace sandbox's declared name to its workspace ordinal.
    fn ordinal_for_name(&self, name: &str) -> Option<u32>;

    /// Current network settings; unknown workspaces report networking disabled.
    fn network(&self, ordinal: u32) -> WorkspaceNetwork;
}

/// Builds the property path for `key` of workspace `ordinal`.
#[must_use]
pub fn workspace_property(ordinal: u32, key: &str) -> String {
    format!("{WORKSPACE_PROPERTY_PREFIX}{ordinal}/{key}")
}

/// A changed property that belongs to a workspace's security settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyPath<'a> {
    ordinal: u32,
    key: &'a str,
    full: &'a str,
}

/// A workspace security property that does not follow
/// `/security/workspace_<ordinal>/<key>`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed workspace property '{path}', expected /security/workspace_<ordinal>/<key>")]
pub struct PropertyPathError {
    /// Offending property path.
    pub path: String,
}

impl<'a> PropertyPath<'a> {
    /// Parses `path`.
    ///
    /// Returns `Ok(None)` for properties outside the workspace security
    /// namespace, which the poller does not manage.
    pub fn parse(path: &'a str) -> Result<Option<Self>, PropertyPathError> {
        let Some(rest) = path.strip_prefix(WORKSPACE_PROPERTY_PREFIX) else {
            return Ok(None);
        };
        let malformed = || PropertyPathError {
            path: path.to_owned(),
        };
        let (digits, tail) = rest.split_once('/').ok_or_else(malformed)?;
        if digits.is_empty() || !digits.bytes().all(|byte| byte.is_ascii_digit()) {
            return Err(malformed());
        }
        let ordinal = digits.parse().map_err(|_| malformed())?;
        let key = tail.rsplit('/').next().unwrap_or(tail);
        if key.is_empty() {
            return Err(malformed());
        }
        Ok(Some(Self {
            ordinal,
            key,
            full: path,
        }))
    }

    /// Workspace the property belongs to.
    #[must_use]
    pub fn ordinal(&self) -> u32 {
        self.ordinal
    }

    /// Trailing key segment.
    #[must_use]
    pub fn key(&self) -> &'a str {
        self.key
    }

    /// The full property path.
    #[must_use]
    pub fn as_str(&self) -> &'a str {
        self.full
    }
}

impl fmt::Display for PropertyPath<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.full)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn parses_workspace_properties() {
        let parsed = PropertyPath::parse("/security/workspace_3/bandwidth_download")
            .expect("well formed")
            .expect("workspace property");
        assert_eq!(parsed.ordinal(), 3);
        assert_eq!(parsed.key(), BANDWIDTH_DOWNLOAD_PROPERTY);
        assert_eq!(parsed.to_string(), "/security/workspace_3/bandwidth_download");
    }

    #[test]
    fn nested_keys_use_the_trailing_segment() {
        let parsed = PropertyPath::parse("/security/workspace_12/proxy/proxy_port")
            .expect("well formed")
            .expect("workspace property");
        assert_eq!(parsed.ordinal(), 12);
        assert_eq!(parsed.key(), PROXY_PORT_PROPERTY);
    }

    #[rstest]
    #[case("/general/theme")]
    #[case("/security/workspaces")]
    fn ignores_other_namespaces(#[case] path: &str) {
        assert_eq!(PropertyPath::parse(path), Ok(None));
    }

    #[rstest]
    #[case("/security/workspace_xyz/bandwidth_download")]
    #[case("/security/workspace_/bandwidth_download")]
    #[case("/security/workspace_3")]
    #[case("/security/workspace_3/")]
    #[case("/security/workspace_-3/bandwidth_upload")]
    #[case("/security/workspace_99999999999/bandwidth_upload")]
    fn rejects_malformed_paths(#[case] path: &str) {
        let error = PropertyPath::parse(path).expect_err("malformed");
        assert_eq!(error.path, path);
    }

    #[test]
    fn builds_property_paths() {
        assert_eq!(
            workspace_property(7, BANDWIDTH_UPLOAD_PROPERTY),
            "/security/workspace_7/bandwidth_upload"
        );
    }
}
