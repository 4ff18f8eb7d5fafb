//! Enumeration of installed desktop applications.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use jailpoll_config::ApplicationDirectories;

use super::DESKTOP_TARGET;
use super::entry::DesktopEntry;

/// Display name and location of an installed application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationInfo {
    /// Human-readable application name.
    pub name: String,
    /// Desktop entry describing the application.
    pub path: PathBuf,
}

/// Source of installed application descriptions.
pub trait ApplicationCatalogue: Send + Sync {
    /// Lists every visible application, highest-priority entries first.
    fn applications(&self) -> Vec<ApplicationInfo>;

    /// Resolves the desktop entry whose display name is `name`.
    fn find_by_name(&self, name: &str) -> Option<PathBuf> {
        self.applications()
            .into_iter()
            .find(|info| info.name == name)
            .map(|info| info.path)
    }
}

/// Catalogue reading the XDG application directories.
///
/// A desktop-file id (the path relative to its directory, with `/` replaced by
/// `-`) seen in a higher-priority directory shadows the same id further down.
#[derive(Debug, Clone)]
pub struct XdgCatalogue {
    directories: ApplicationDirectories,
}

impl XdgCatalogue {
    /// Builds a catalogue over `directories`.
    #[must_use]
    pub fn new(directories: ApplicationDirectories) -> Self {
        Self { directories }
    }
}

impl ApplicationCatalogue for XdgCatalogue {
    fn applications(&self) -> Vec<ApplicationInfo> {
        let mut seen = HashSet::new();
        let mut found = Vec::new();
        for root in self.directories.in_priority_order() {
            for path in desktop_files(root.as_std_path()) {
                let Some(id) = desktop_file_id(root.as_std_path(), &path) else {
                    continue;
                };
                if !seen.insert(id) {
                    continue;
                }
                match DesktopEntry::load(&path) {
                    Ok(entry) if !entry.is_hidden() => found.push(ApplicationInfo {
                        name: entry.name().to_owned(),
                        path,
                    }),
                    Ok(_) => {}
                    Err(error) => debug!(
                        target: DESKTOP_TARGET,
                        error = %error,
                        "skipping unusable desktop entry"
                    ),
                }
            }
        }
        found
    }
}

fn desktop_files(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(error) => {
                debug!(
                    target: DESKTOP_TARGET,
                    root = %root.display(),
                    %error,
                    "skipping unreadable part of applications directory"
                );
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
        .filter(|path| path.extension().is_some_and(|ext| ext == "desktop"))
        .collect()
}

fn desktop_file_id(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<_> = relative
        .components()
        .map(|part| part.as_os_str().to_string_lossy())
        .collect();
    Some(parts.join("-"))
}
