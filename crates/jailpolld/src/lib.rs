//! Sandbox policy poller daemon.
//!
//! `jailpolld` watches the Firejail runtime directory for sandboxes as they
//! start and stop, classifies each one from its environment snapshot, and
//! keeps its bandwidth limits in step with two sources of truth:
//!
//! - workspace sandboxes follow the per-workspace network settings held in
//!   the [`settings`] store;
//! - desktop application sandboxes follow custom keys in the application's
//!   [`desktop`] entry.
//!
//! Limits are enforced by launching `firejail --bandwidth=<name> set auto`
//! through a [`policy::BandwidthEnforcer`].
//!
//! Every notification source feeds one channel, and the [`Runtime`] processes
//! those events one at a time on a single thread, so the [`SandboxPoller`]
//! owns its registry without locking. Sandboxes whose environment snapshot
//! is not written yet are retried on a fixed interval up to a ceiling. Nothing
//! inside the loop is fatal: a sandbox that cannot be managed is logged and
//! left alone.

mod bootstrap;
pub mod desktop;
pub mod discovery;
mod health;
pub mod policy;
pub mod poller;
mod process;
pub mod sandbox;
pub mod settings;
mod telemetry;

pub use bootstrap::{
    BootstrapError, ConfigLoader, Daemon, StaticConfigLoader, SystemConfigLoader, bootstrap_with,
};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use poller::{AddOutcome, PollerDeps, SandboxPoller};
pub use process::{
    LaunchError, PollerEvent, Runtime, SignalError, SignalForwarder, SystemSignals, WatchError,
    WatchPlan, WatchSet, WatchTarget, run_daemon,
};
pub use telemetry::{TelemetryError, TelemetryHandle};

#[cfg(test)]
mod tests;
