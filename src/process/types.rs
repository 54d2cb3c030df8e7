/*!
 * Process Types
 * Child outcomes and supervision policies
 */

use crate::core::limits::SIGNAL_EXIT_BASE;
use crate::core::types::ExitStatus;
use nix::sys::signal::Signal;
use nix::sys::wait::WaitStatus;
use serde::Serialize;
use std::fmt;

/// One observed state change of a child process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildOutcome {
    /// Terminated normally with this status
    Exited(ExitStatus),
    /// Terminated by a signal
    Killed(Signal),
    /// Terminated by a signal and dumped core
    Dumped(Signal),
    /// Stopped under a tracer
    Trapped(Signal),
    /// Stopped by job control
    Stopped(Signal),
    /// Resumed after a stop
    Continued,
}

impl ChildOutcome {
    /// Translate a wait status; `None` while the child is still running
    pub fn from_wait_status(status: WaitStatus) -> Option<Self> {
        match status {
            WaitStatus::Exited(_, code) => Some(ChildOutcome::Exited(code)),
            WaitStatus::Signaled(_, signal, true) => Some(ChildOutcome::Dumped(signal)),
            WaitStatus::Signaled(_, signal, false) => Some(ChildOutcome::Killed(signal)),
            WaitStatus::Stopped(_, signal) => Some(ChildOutcome::Stopped(signal)),
            WaitStatus::Continued(_) => Some(ChildOutcome::Continued),
            #[cfg(any(target_os = "linux", target_os = "android"))]
            WaitStatus::PtraceEvent(_, signal, _) => Some(ChildOutcome::Trapped(signal)),
            #[cfg(any(target_os = "linux", target_os = "android"))]
            WaitStatus::PtraceSyscall(_) => Some(ChildOutcome::Trapped(Signal::SIGTRAP)),
            WaitStatus::StillAlive => None,
        }
    }

    /// Whether the child is gone for good
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            ChildOutcome::Exited(_) | ChildOutcome::Killed(_) | ChildOutcome::Dumped(_)
        )
    }

    /// Terminal outcome other than a zero exit
    pub const fn is_failure(&self) -> bool {
        match self {
            ChildOutcome::Exited(code) => *code != 0,
            ChildOutcome::Killed(_) | ChildOutcome::Dumped(_) => true,
            _ => false,
        }
    }

    /// Exit status this outcome propagates
    ///
    /// Signal terminations map to `128 + signal`; non-terminal states to 0.
    pub fn status_code(&self) -> ExitStatus {
        match self {
            ChildOutcome::Exited(code) => *code,
            ChildOutcome::Killed(signal) | ChildOutcome::Dumped(signal) => {
                SIGNAL_EXIT_BASE + *signal as i32
            }
            _ => 0,
        }
    }
}

impl fmt::Display for ChildOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChildOutcome::Exited(code) => write!(f, "exited with status {}", code),
            ChildOutcome::Killed(signal) => write!(f, "killed by {}", signal),
            ChildOutcome::Dumped(signal) => write!(f, "dumped core on {}", signal),
            ChildOutcome::Trapped(signal) => write!(f, "trapped by {}", signal),
            ChildOutcome::Stopped(signal) => write!(f, "stopped by {}", signal),
            ChildOutcome::Continued => write!(f, "continued"),
        }
    }
}

/// How the launcher waits for each dispatched batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum WaitPolicy {
    /// Block until each child terminates; failures are logged and batching goes on
    #[default]
    Synchronous,
    /// Never block; finished children are reaped opportunistically
    FireAndForget,
    /// Block, and abort the run on the first failing child
    Strict,
}

impl WaitPolicy {
    #[inline]
    pub const fn is_blocking(&self) -> bool {
        !matches!(self, WaitPolicy::FireAndForget)
    }
}

impl fmt::Display for WaitPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WaitPolicy::Synchronous => "synchronous",
            WaitPolicy::FireAndForget => "fire-and-forget",
            WaitPolicy::Strict => "strict",
        };
        f.write_str(name)
    }
}
