//! Launches the external sandbox tool to apply bandwidth limits.

use std::ffi::{OsStr, OsString};
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::process::{Child, Command, Stdio};
use std::thread;

use thiserror::Error;
use tracing::{debug, warn};

use super::{BandwidthLimits, POLICY_TARGET};

/// Environment variables whose names start with one of these are not passed on.
const STRIPPED_VARIABLE_PREFIXES: [&[u8]; 2] = [b"PATH", b"DESKTOP_STARTUP_ID"];

/// The enforcement tool could not be started.
#[derive(Debug, Error)]
#[error("failed to launch '{program}' for sandbox '{sandbox}': {source}")]
pub struct EnforcementError {
    /// Program that failed to start.
    pub program: String,
    /// Sandbox the limits were meant for.
    pub sandbox: String,
    /// Underlying spawn error.
    #[source]
    pub source: io::Error,
}

/// Applies bandwidth limits to a named sandbox.
pub trait BandwidthEnforcer: Send + Sync {
    /// Starts enforcement; success means the launch succeeded, not the outcome.
    fn enforce(&self, sandbox: &str, limits: BandwidthLimits) -> Result<(), EnforcementError>;
}

/// Enforcer invoking `firejail --bandwidth=<name> set auto <down> <up>`.
#[derive(Debug, Clone)]
pub struct FirejailEnforcer {
    program: String,
    safe_path: String,
}

impl FirejailEnforcer {
    /// Builds an enforcer running `program` with `PATH` set to `safe_path`.
    pub fn new(program: impl Into<String>, safe_path: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            safe_path: safe_path.into(),
        }
    }

    /// Assembles the command without spawning it.
    #[must_use]
    pub fn command(&self, sandbox: &str, limits: BandwidthLimits) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(bandwidth_arguments(sandbox, limits))
            .env_clear()
            .envs(sanitised_environment(std::env::vars_os(), &self.safe_path))
            .stdin(Stdio::null());
        command
    }
}

impl BandwidthEnforcer for FirejailEnforcer {
    fn enforce(&self, sandbox: &str, limits: BandwidthLimits) -> Result<(), EnforcementError> {
        debug!(
            target: POLICY_TARGET,
            program = %self.program,
            sandbox,
            download = limits.download,
            upload = limits.upload,
            "launching bandwidth enforcement"
        );
        let child = self
            .command(sandbox, limits)
            .spawn()
            .map_err(|source| EnforcementError {
                program: self.program.clone(),
                sandbox: sandbox.to_owned(),
                source,
            })?;
        reap(child, sandbox.to_owned());
        Ok(())
    }
}

/// Arguments passed to the enforcement tool.
#[must_use]
pub fn bandwidth_arguments(sandbox: &str, limits: BandwidthLimits) -> Vec<String> {
    vec![
        format!("--bandwidth={sandbox}"),
        String::from("set"),
        String::from("auto"),
        limits.download.to_string(),
        limits.upload.to_string(),
    ]
}

/// Copies `vars`, dropping search-path and startup-notification variables, and
/// appends `PATH=<safe_path>`.
pub fn sanitised_environment(
    vars: impl IntoIterator<Item = (OsString, OsString)>,
    safe_path: &str,
) -> Vec<(OsString, OsString)> {
    let mut environment: Vec<_> = vars
        .into_iter()
        .filter(|(key, _)| !is_stripped(key))
        .collect();
    environment.push((OsString::from("PATH"), OsString::from(safe_path)));
    environment
}

fn is_stripped(key: &OsStr) -> bool {
    let key = key.as_bytes();
    STRIPPED_VARIABLE_PREFIXES
        .iter()
        .any(|prefix| key.starts_with(prefix))
}

fn reap(mut child: Child, sandbox: String) {
    let spawned = thread::Builder::new()
        .name(String::from("jailpoll-reaper"))
        .spawn(move || match child.wait() {
            Ok(status) => debug!(
                target: POLICY_TARGET,
                sandbox = %sandbox,
                %status,
                "bandwidth enforcement exited"
            ),
            Err(error) => debug!(
                target: POLICY_TARGET,
                sandbox = %sandbox,
                %error,
                "could not collect bandwidth enforcement status"
            ),
        });
    if let Err(error) = spawned {
        warn!(
            target: POLICY_TARGET,
            %error,
            "could not start reaper thread, child left unreaped"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(OsString, OsString)> {
        pairs
            .iter()
            .map(|(key, value)| (OsString::from(key), OsString::from(value)))
            .collect()
    }

    #[test]
    fn builds_firejail_arguments() {
        let limits = BandwidthLimits::new(5000, 250);
        assert_eq!(
            bandwidth_arguments("Mail", limits),
            vec!["--bandwidth=Mail", "set", "auto", "5000", "250"]
        );
    }

    #[test]
    fn sanitising_replaces_search_paths() {
        let input = vars(&[
            ("HOME", "/home/ada"),
            ("PATH", "/home/ada/bin:/usr/bin"),
            ("PATHEXT", ".sh"),
            ("DESKTOP_STARTUP_ID", "xfce-123"),
            ("LANG", "C.UTF-8"),
        ]);
        let output = sanitised_environment(input, "/usr/bin:/bin");
        assert_eq!(
            output,
            vars(&[
                ("HOME", "/home/ada"),
                ("LANG", "C.UTF-8"),
                ("PATH", "/usr/bin:/bin"),
            ])
        );
    }

    #[test]
    fn command_uses_only_the_sanitised_environment() {
        let enforcer = FirejailEnforcer::new("firejail", "/usr/bin");
        let command = enforcer.command("Web Browser", BandwidthLimits::default());
        assert_eq!(command.get_program(), "firejail");
        let path = command
            .get_envs()
            .find(|(key, _)| *key == "PATH")
            .and_then(|(_, value)| value);
        assert_eq!(path, Some(OsStr::new("/usr/bin")));
        let args: Vec<_> = command.get_args().collect();
        assert_eq!(args.first(), Some(&OsStr::new("--bandwidth=Web Browser")));
    }

    #[test]
    fn missing_program_is_a_launch_failure() {
        let enforcer = FirejailEnforcer::new("/nonexistent/jailpoll-firejail", "/usr/bin");
        let error = enforcer
            .enforce("Mail", BandwidthLimits::default())
            .expect_err("program does not exist");
        assert_eq!(error.sandbox, "Mail");
        assert_eq!(error.source.kind(), io::ErrorKind::NotFound);
    }
}
