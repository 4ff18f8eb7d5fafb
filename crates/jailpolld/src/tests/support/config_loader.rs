//! Test configuration loaders for scenarios covering success and failure paths.

use std::ffi::OsString;
use std::fs;
use std::sync::Arc;

use camino::Utf8PathBuf;
use ortho_config::{OrthoConfig, OrthoError};
use tempfile::TempDir;

use jailpoll_config::Config;

use crate::bootstrap::ConfigLoader;

/// Loader pointing every path at a temporary directory.
pub struct TestConfigLoader {
    root: TempDir,
}

impl TestConfigLoader {
    #[must_use]
    pub fn new() -> Self {
        let root = TempDir::new().expect("failed to create temporary directory");
        fs::create_dir(root.path().join("runtime")).expect("create runtime directory");
        Self { root }
    }

    fn path(&self, relative: &str) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(self.root.path().join(relative))
            .expect("temporary path was not valid UTF-8")
    }

    /// Location of the settings file the loaded configuration names.
    #[must_use]
    pub fn settings_file(&self) -> Utf8PathBuf {
        self.path("workspaces.json")
    }

    /// Writes the settings file.
    pub fn write_settings(&self, body: &str) {
        fs::write(self.settings_file(), body).expect("write settings file");
    }
}

impl ConfigLoader for TestConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(Config {
            runtime_dir: Some(self.path("runtime")),
            settings_file: Some(self.settings_file()),
            data_home: Some(self.path("data")),
            log_filter: Some(String::from("warn")),
            ..Config::default()
        })
    }
}

/// Loader that intentionally fails by passing an invalid CLI value.
pub struct FailingConfigLoader;

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        let args = vec![
            OsString::from("jailpolld"),
            OsString::from("--retry-attempts"),
            OsString::from("many"),
        ];
        Config::load_from_iter(args)
    }
}
