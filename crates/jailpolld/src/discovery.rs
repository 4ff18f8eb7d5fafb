//! Sandbox discovery through the runtime directory.
//!
//! Every running sandbox owns a directory entry named after its pid. The entry
//! appears before the sandbox's environment snapshot is written, so additions
//! are deferred and retried on a fixed interval up to a ceiling.

use std::fs;
use std::io;
use std::path::Path;
use std::time::{Duration, Instant};

use notify::EventKind;

pub(crate) const DISCOVERY_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::discovery");

/// Change to the runtime directory, reduced to what the poller reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryEvent {
    /// An entry appeared.
    Created(String),
    /// An entry disappeared.
    Deleted(String),
    /// Anything else; only logged.
    Other {
        /// Entry concerned.
        entry: String,
        /// Watcher description of the change.
        kind: String,
    },
}

impl DiscoveryEvent {
    /// Translates a watcher notification into one event per affected entry.
    #[must_use]
    pub fn from_notify(event: &notify::Event) -> Vec<Self> {
        event
            .paths
            .iter()
            .filter_map(|path| path.file_name())
            .map(|name| {
                let entry = name.to_string_lossy().into_owned();
                match event.kind {
                    EventKind::Create(_) => Self::Created(entry),
                    EventKind::Remove(_) => Self::Deleted(entry),
                    kind => Self::Other {
                        entry,
                        kind: format!("{kind:?}"),
                    },
                }
            })
            .collect()
    }
}

/// Parses a runtime-directory entry name as a pid.
///
/// Only plain decimal digits are accepted, so `self` and similar entries
/// yield `None`, as does pid 0.
#[must_use]
pub fn parse_pid(entry: &str) -> Option<u32> {
    if entry.is_empty() || !entry.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    entry.parse().ok().filter(|pid| *pid != 0)
}

/// Lists the entries currently present in the runtime directory.
pub fn scan_runtime_dir(dir: &Path) -> io::Result<Vec<String>> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir)? {
        entries.push(entry?.file_name().to_string_lossy().into_owned());
    }
    entries.sort();
    Ok(entries)
}

/// Retry state for a runtime-directory entry that is not ready yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAddition {
    entry: String,
    attempts: u32,
}

impl PendingAddition {
    /// Starts tracking `entry` with no attempt made.
    pub fn new(entry: impl Into<String>) -> Self {
        Self {
            entry: entry.into(),
            attempts: 0,
        }
    }

    /// Entry name.
    #[must_use]
    pub fn entry(&self) -> &str {
        &self.entry
    }

    /// Attempts made so far.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Counts one more attempt.
    pub fn record_attempt(&mut self) {
        self.attempts = self.attempts.saturating_add(1);
    }
}

#[derive(Debug)]
struct Scheduled {
    due: Instant,
    pending: PendingAddition,
}

/// Deadline queue of deferred additions.
///
/// The queue never fires anything itself; the event loop asks for the next
/// deadline and hands due entries back to the poller.
#[derive(Debug)]
pub struct RetryQueue {
    interval: Duration,
    ceiling: u32,
    scheduled: Vec<Scheduled>,
}

impl RetryQueue {
    /// Builds a queue firing every `interval`, allowing `ceiling` attempts.
    #[must_use]
    pub fn new(interval: Duration, ceiling: u32) -> Self {
        Self {
            interval,
            ceiling,
            scheduled: Vec::new(),
        }
    }

    /// Attempt ceiling.
    #[must_use]
    pub fn ceiling(&self) -> u32 {
        self.ceiling
    }

    /// Number of pending additions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.scheduled.len()
    }

    /// Whether nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scheduled.is_empty()
    }

    /// Whether `entry` is waiting for another attempt.
    #[must_use]
    pub fn is_pending(&self, entry: &str) -> bool {
        self.scheduled
            .iter()
            .any(|scheduled| scheduled.pending.entry() == entry)
    }

    /// Queues `pending` one interval after `now`.
    ///
    /// Returns `false`, dropping `pending`, once its attempts reached the
    /// ceiling or when the entry already has a chain running.
    pub fn schedule(&mut self, pending: PendingAddition, now: Instant) -> bool {
        if pending.attempts() >= self.ceiling || self.is_pending(pending.entry()) {
            return false;
        }
        self.scheduled.push(Scheduled {
            due: now + self.interval,
            pending,
        });
        true
    }

    /// Earliest deadline, if anything is pending.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.scheduled.iter().map(|scheduled| scheduled.due).min()
    }

    /// Removes and returns every addition due at `now`, earliest first.
    pub fn take_due(&mut self, now: Instant) -> Vec<PendingAddition> {
        let (mut due, waiting): (Vec<_>, Vec<_>) = self
            .scheduled
            .drain(..)
            .partition(|scheduled| scheduled.due <= now);
        self.scheduled = waiting;
        due.sort_by_key(|scheduled| scheduled.due);
        due.into_iter().map(|scheduled| scheduled.pending).collect()
    }

    /// Drops every pending addition.
    pub fn clear(&mut self) {
        self.scheduled.clear();
    }
}
