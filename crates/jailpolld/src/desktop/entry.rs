//! Desktop-entry reader covering the keys the poller consults.
//!
//! Files are read as key files with `configparser`; only `#` starts a comment
//! and only `=` separates keys from values, so list values such as
//! `Categories=Network;Email;` survive intact.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use configparser::ini::Ini;
use thiserror::Error;

/// Group holding the application description.
pub const DESKTOP_ENTRY_GROUP: &str = "Desktop Entry";

/// Explicitly enables or disables networking for the application's sandbox.
pub const ENABLE_NETWORK_KEY: &str = "X-XfceFirejailEnableNetwork";

/// Download bandwidth bound for the application's sandbox.
pub const BANDWIDTH_DOWNLOAD_KEY: &str = "X-XfceFirejailBandwidthDownload";

/// Upload bandwidth bound for the application's sandbox.
pub const BANDWIDTH_UPLOAD_KEY: &str = "X-XfceFirejailBandwidthUpload";

/// Failures while loading a desktop entry.
#[derive(Debug, Error)]
pub enum DesktopEntryError {
    /// The file could not be read.
    #[error("cannot read desktop entry '{path}': {source}")]
    Read {
        /// Entry location.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The file is not a well-formed key file.
    #[error("malformed desktop entry '{path}': {message}")]
    Malformed {
        /// Entry location.
        path: PathBuf,
        /// Parser diagnostic.
        message: String,
    },
    /// The file has no `[Desktop Entry]` group.
    #[error("'{path}' has no [Desktop Entry] group")]
    MissingGroup {
        /// Entry location.
        path: PathBuf,
    },
    /// The entry describes something other than an application.
    #[error("'{path}' does not describe an application")]
    NotAnApplication {
        /// Entry location.
        path: PathBuf,
    },
    /// The entry has no display name.
    #[error("'{path}' has no Name key")]
    MissingName {
        /// Entry location.
        path: PathBuf,
    },
}

/// Parsed `[Desktop Entry]` group of an application descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesktopEntry {
    path: PathBuf,
    keys: HashMap<String, Option<String>>,
}

impl DesktopEntry {
    /// Loads and validates the entry at `path`.
    pub fn load(path: &Path) -> Result<Self, DesktopEntryError> {
        let text = fs::read_to_string(path).map_err(|source| DesktopEntryError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, &text)
    }

    /// Parses `text` as if it had been read from `path`.
    pub fn parse(path: &Path, text: &str) -> Result<Self, DesktopEntryError> {
        let mut groups = key_file_reader()
            .read(text.to_owned())
            .map_err(|message| DesktopEntryError::Malformed {
                path: path.to_path_buf(),
                message,
            })?;
        let keys = groups
            .remove(DESKTOP_ENTRY_GROUP)
            .ok_or_else(|| DesktopEntryError::MissingGroup {
                path: path.to_path_buf(),
            })?;
        let entry = Self {
            path: path.to_path_buf(),
            keys,
        };
        if entry.string("Type") != Some("Application") {
            return Err(DesktopEntryError::NotAnApplication {
                path: entry.path,
            });
        }
        if entry.string("Name").is_none_or(str::is_empty) {
            return Err(DesktopEntryError::MissingName { path: entry.path });
        }
        Ok(entry)
    }

    /// Location the entry was read from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Untranslated display name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.string("Name").unwrap_or_default()
    }

    /// Whether the entry asks to be hidden from application listings.
    #[must_use]
    pub fn is_hidden(&self) -> bool {
        self.boolean("Hidden") == Some(true)
    }

    /// Raw value of `key`.
    #[must_use]
    pub fn string(&self, key: &str) -> Option<&str> {
        self.keys.get(key).and_then(Option::as_deref)
    }

    /// Whether `key` is present.
    #[must_use]
    pub fn has_key(&self, key: &str) -> bool {
        self.keys.contains_key(key)
    }

    /// Boolean value of `key`; `None` when absent or not a boolean.
    #[must_use]
    pub fn boolean(&self, key: &str) -> Option<bool> {
        match self.string(key)? {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        }
    }

    /// Integer value of `key`; `None` when absent, `Some(Err)` when malformed.
    #[must_use]
    pub fn integer(&self, key: &str) -> Option<Result<u32, std::num::ParseIntError>> {
        self.string(key).map(|value| value.trim().parse())
    }
}

fn key_file_reader() -> Ini {
    let mut defaults = Ini::new_cs().defaults();
    defaults.comment_symbols = vec!['#'];
    defaults.delimiters = vec!['='];
    Ini::new_from_defaults(defaults)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    const MAIL: &str = "\
# Mail client
[Desktop Entry]
Type=Application
Name=Mail
Name[fr]=Courrier
Exec=mail
Categories=Network;Email;
X-XfceFirejailBandwidthDownload=5000
X-XfceFirejailBandwidthUpload = oops

[Desktop Action Compose]
Name=Compose
";

    fn parse(text: &str) -> Result<DesktopEntry, DesktopEntryError> {
        DesktopEntry::parse(Path::new("/apps/mail.desktop"), text)
    }

    #[test]
    fn reads_keys_from_desktop_group_only() {
        let entry = parse(MAIL).expect("valid entry");
        assert_eq!(entry.name(), "Mail");
        assert_eq!(entry.string("Name[fr]"), Some("Courrier"));
        assert_eq!(entry.string("Categories"), Some("Network;Email;"));
        assert_eq!(entry.integer(BANDWIDTH_DOWNLOAD_KEY).map(Result::ok), Some(Some(5000)));
        assert!(matches!(entry.integer(BANDWIDTH_UPLOAD_KEY), Some(Err(_))));
        assert!(!entry.has_key(ENABLE_NETWORK_KEY));
        assert!(!entry.is_hidden());
    }

    #[rstest]
    #[case::no_group("Type=Application\nName=Mail\n")]
    #[case::other_group("[Desktop Action New]\nName=New\n")]
    fn rejects_files_without_desktop_group(#[case] text: &str) {
        assert!(matches!(
            parse(text),
            Err(DesktopEntryError::MissingGroup { .. })
        ));
    }

    #[test]
    fn rejects_links() {
        let text = "[Desktop Entry]\nType=Link\nName=Docs\nURL=https://example.org\n";
        assert!(matches!(
            parse(text),
            Err(DesktopEntryError::NotAnApplication { .. })
        ));
    }

    #[test]
    fn rejects_nameless_applications() {
        assert!(matches!(
            parse("[Desktop Entry]\nType=Application\n"),
            Err(DesktopEntryError::MissingName { .. })
        ));
    }

    #[rstest]
    #[case("true", Some(true))]
    #[case("1", Some(true))]
    #[case("false", Some(false))]
    #[case("no", None)]
    fn parses_booleans(#[case] raw: &str, #[case] expected: Option<bool>) {
        let text = format!("[Desktop Entry]\nType=Application\nName=A\n{ENABLE_NETWORK_KEY}={raw}\n");
        let entry = parse(&text).expect("valid entry");
        assert_eq!(entry.boolean(ENABLE_NETWORK_KEY), expected);
    }

    #[test]
    fn rejects_unterminated_group_headers() {
        assert!(matches!(
            parse("[Desktop Entry\nType=Application\nName=Mail\n"),
            Err(DesktopEntryError::Malformed { .. })
        ));
    }
}
