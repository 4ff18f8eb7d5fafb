//! Test suites for the sandbox poller daemon.

pub(crate) mod support;
