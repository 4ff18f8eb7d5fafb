//! Desktop-entry metadata: parsing, enumeration and change notifications.

mod catalogue;
mod entry;

use std::path::PathBuf;

use notify::EventKind;
use notify::event::{ModifyKind, RenameMode};

pub use catalogue::{ApplicationCatalogue, ApplicationInfo, XdgCatalogue};
pub use entry::{
    BANDWIDTH_DOWNLOAD_KEY, BANDWIDTH_UPLOAD_KEY, DESKTOP_ENTRY_GROUP, DesktopEntry,
    DesktopEntryError, ENABLE_NETWORK_KEY,
};

pub(crate) const DESKTOP_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::desktop");

/// What happened to a file in a desktop-entry directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DesktopChange {
    /// A file appeared, including being renamed into place.
    Created,
    /// A file's contents or metadata changed.
    Changed,
    /// A file disappeared, including being renamed away.
    Deleted,
}

/// Change notification for a single desktop-entry file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesktopEntryEvent {
    /// Kind of change.
    pub change: DesktopChange,
    /// Affected file.
    pub path: PathBuf,
}

impl DesktopEntryEvent {
    /// Builds an event for `path`.
    pub fn new(change: DesktopChange, path: impl Into<PathBuf>) -> Self {
        Self {
            change,
            path: path.into(),
        }
    }

    /// Translates a watcher notification; access and unknown kinds yield nothing.
    #[must_use]
    pub fn from_notify(event: &notify::Event) -> Vec<Self> {
        let change = match event.kind {
            EventKind::Create(_) | EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
                DesktopChange::Created
            }
            EventKind::Remove(_) | EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
                DesktopChange::Deleted
            }
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
                return rename_pair(&event.paths);
            }
            EventKind::Modify(ModifyKind::Name(_)) => return Vec::new(),
            EventKind::Modify(_) => DesktopChange::Changed,
            _ => return Vec::new(),
        };
        event
            .paths
            .iter()
            .map(|path| Self::new(change, path.clone()))
            .collect()
    }
}

fn rename_pair(paths: &[PathBuf]) -> Vec<DesktopEntryEvent> {
    match paths {
        [from, to] => vec![
            DesktopEntryEvent::new(DesktopChange::Deleted, from.clone()),
            DesktopEntryEvent::new(DesktopChange::Created, to.clone()),
        ],
        _ => Vec::new(),
    }
}
