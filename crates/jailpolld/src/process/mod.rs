//! Daemon process plumbing: launch, signals, watchers and the event loop.

mod errors;
mod launch;
mod runtime;
mod signals;
mod watch;

pub use errors::LaunchError;
pub use launch::run_daemon;
#[cfg(test)]
pub(crate) use launch::{LaunchPlan, run_daemon_with, watch_plan};
pub use runtime::{PollerEvent, Runtime};
pub use signals::{SignalError, SignalForwarder, SystemSignals};
pub use watch::{WatchError, WatchPlan, WatchSet, WatchTarget};

pub(crate) const PROCESS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::process");
