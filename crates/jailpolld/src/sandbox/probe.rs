//! Liveness checks for sandboxed processes.

use nix::errno::Errno;
use nix::sys::signal::kill;
use nix::unistd::Pid;

/// Answers whether a process still exists.
pub trait ProcessProbe: Send + Sync {
    /// Returns `false` only when the process is known to have exited.
    fn is_alive(&self, pid: u32) -> bool;
}

/// Probe that sends the null signal to the process.
#[derive(Debug, Default, Clone, Copy)]
pub struct SignalProbe;

impl ProcessProbe for SignalProbe {
    fn is_alive(&self, pid: u32) -> bool {
        let Ok(raw) = i32::try_from(pid) else {
            return false;
        };
        // Any failure other than ESRCH (typically EPERM for another user's
        // process) still proves the pid exists.
        !matches!(kill(Pid::from_raw(raw), None), Err(Errno::ESRCH))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_process_is_alive() {
        assert!(SignalProbe.is_alive(std::process::id()));
    }

    #[test]
    fn pid_beyond_the_kernel_range_is_gone() {
        assert!(!SignalProbe.is_alive(u32::MAX));
    }
}
