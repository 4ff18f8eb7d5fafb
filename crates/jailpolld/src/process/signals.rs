//! Signal handling: reload on `SIGHUP`, shutdown on termination signals.

use std::io;
use std::sync::mpsc::Sender;
use std::thread;

use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGQUIT, SIGTERM};
use signal_hook::iterator::Signals;
use thiserror::Error;
use tracing::info;

use super::PROCESS_TARGET;
use super::runtime::PollerEvent;

/// Delivers process signals to the event loop.
pub trait SignalForwarder: Send + Sync {
    /// Starts forwarding; returns once forwarding is in place.
    fn forward(&self, events: Sender<PollerEvent>) -> Result<(), SignalError>;
}

/// Errors reported while setting up signal forwarding.
#[derive(Debug, Error)]
pub enum SignalError {
    /// Installing signal handlers failed.
    #[error("failed to install signal handlers: {source}")]
    Install {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The forwarding thread could not be started.
    #[error("failed to start signal thread: {source}")]
    Thread {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Forwards `SIGHUP` as a reload and `SIGTERM`, `SIGINT` and `SIGQUIT` as a
/// shutdown request.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemSignals;

impl SignalForwarder for SystemSignals {
    fn forward(&self, events: Sender<PollerEvent>) -> Result<(), SignalError> {
        let mut signals = Signals::new([SIGTERM, SIGINT, SIGQUIT, SIGHUP])
            .map_err(|source| SignalError::Install { source })?;
        thread::Builder::new()
            .name(String::from("jailpoll-signals"))
            .spawn(move || {
                for signal in signals.forever() {
                    let event = event_for(signal);
                    info!(target: PROCESS_TARGET, signal, ?event, "signal received");
                    let stop = event == PollerEvent::Shutdown;
                    if events.send(event).is_err() || stop {
                        break;
                    }
                }
            })
            .map_err(|source| SignalError::Thread { source })?;
        Ok(())
    }
}

fn event_for(signal: i32) -> PollerEvent {
    if signal == SIGHUP {
        PollerEvent::Reload
    } else {
        PollerEvent::Shutdown
    }
}
