//! Reads a sandbox's environment snapshot to find out what kind of sandbox it is.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::SandboxKind;

/// Marks a sandbox launched for a workspace; its value is irrelevant.
pub const WORKSPACE_VARIABLE: &str = "FIREJAIL_SANDBOX_WORKSPACE";

/// Carries the sandbox's self-declared name.
pub const NAME_VARIABLE: &str = "FIREJAIL_SANDBOX_NAME";

/// Classification derived from an environment snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentSnapshot {
    /// Kind of sandbox; [`SandboxKind::Unclassified`] when no marker was seen.
    pub kind: SandboxKind,
    /// Declared sandbox name, empty when absent.
    pub name: String,
}

/// Failure to read an environment snapshot.
#[derive(Debug, Error)]
pub enum EnvironmentError {
    /// The snapshot could not be opened or read.
    #[error("cannot read environment snapshot '{path}': {source}")]
    Read {
        /// Snapshot location.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}

/// Opens and classifies the snapshot at `path`.
pub fn read_environment(path: &Path) -> Result<EnvironmentSnapshot, EnvironmentError> {
    let read_error = |source| EnvironmentError::Read {
        path: path.to_path_buf(),
        source,
    };
    let file = File::open(path).map_err(read_error)?;
    classify(BufReader::new(file)).map_err(read_error)
}

/// Classifies a stream of `KEY=VALUE` records.
///
/// Records end with a newline or a NUL byte; the last one may be unterminated.
/// The workspace marker wins over the name marker regardless of order.
pub fn classify(mut reader: impl BufRead) -> io::Result<EnvironmentSnapshot> {
    let mut kind = SandboxKind::Unclassified;
    let mut name = String::new();
    let mut record = Vec::new();

    loop {
        record.clear();
        if reader.read_until(b'\n', &mut record)? == 0 {
            break;
        }
        for line in record.split(|byte| *byte == b'\n' || *byte == 0) {
            let line = String::from_utf8_lossy(line);
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            match key {
                WORKSPACE_VARIABLE => kind = SandboxKind::Workspace,
                NAME_VARIABLE => {
                    value.clone_into(&mut name);
                    if kind == SandboxKind::Unclassified {
                        kind = SandboxKind::DesktopApp;
                    }
                }
                _ => {}
            }
        }
    }

    Ok(EnvironmentSnapshot { kind, name })
}
