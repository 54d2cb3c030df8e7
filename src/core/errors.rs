/*!
 * Error Types
 * Centralized error handling with thiserror and miette
 */

use crate::core::types::{ExitStatus, Pid};
use crate::process::ChildOutcome;
use miette::Diagnostic;
use nix::errno::Errno;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

// Re-export MemoryError from memory module
pub use crate::memory::MemoryError;

/// Launcher operation result
pub type LaunchResult<T> = Result<T, LaunchError>;

/// Unified launcher error type with miette diagnostics
#[derive(Error, Debug, Diagnostic)]
pub enum LaunchError {
    #[error("Memory error: {0}")]
    #[diagnostic(
        code(launcher::memory),
        help("A container could not grow. Check available memory or reduce the argument volume.")
    )]
    Memory(#[from] MemoryError),

    #[error("Argument list too long: {context}")]
    #[diagnostic(
        code(launcher::too_big),
        help("The fixed arguments alone, or a single batch in force mode, exceed the system argument space.")
    )]
    ArgumentListTooLong { context: String },

    #[error("Usage error: {0}")]
    #[diagnostic(code(launcher::usage), help("Run with --help for the accepted options."))]
    Usage(String),

    #[error("Cannot open token source {path:?}: {source}")]
    #[diagnostic(code(launcher::source_open))]
    SourceOpen {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Cannot stat token source {path:?}: {source}")]
    #[diagnostic(code(launcher::source_stat))]
    SourceStat {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Cannot read token source {path:?}: {source}")]
    #[diagnostic(code(launcher::source_read))]
    SourceRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Token source {path:?} is a {kind}")]
    #[diagnostic(
        code(launcher::source_type),
        help("Token sources must be regular files, character or block devices, FIFOs or sockets.")
    )]
    UnsupportedSource { path: PathBuf, kind: &'static str },

    #[error("Token of {length} bytes exceeds the single argument limit of {limit} bytes")]
    #[diagnostic(code(launcher::oversized_token))]
    OversizedToken { length: usize, limit: usize },

    #[error("fork(2) failed: {0}")]
    #[diagnostic(code(launcher::fork))]
    Fork(Errno),

    #[error("exec of {program:?} failed: {errno}")]
    #[diagnostic(
        code(launcher::exec),
        help("Check that the program exists in PATH and is executable.")
    )]
    Exec { program: String, errno: Errno },

    #[error("waiting for child {pid} failed: {errno}")]
    #[diagnostic(code(launcher::wait))]
    Wait { pid: Pid, errno: Errno },

    #[error("Cannot encode the limits report: {0}")]
    #[diagnostic(code(launcher::encode))]
    Encode(#[from] serde_json::Error),

    #[error("child process {pid} failed: {outcome}")]
    #[diagnostic(code(launcher::child_failed))]
    ChildFailed { pid: Pid, outcome: ChildOutcome },
}

impl LaunchError {
    /// Build an argument-list-too-long error
    pub fn too_big(context: impl Into<String>) -> Self {
        LaunchError::ArgumentListTooLong {
            context: context.into(),
        }
    }

    /// OS error number describing this failure
    pub fn errno(&self) -> Errno {
        match self {
            LaunchError::Memory(err) => err.errno(),
            LaunchError::ArgumentListTooLong { .. } | LaunchError::OversizedToken { .. } => {
                Errno::E2BIG
            }
            LaunchError::Usage(_) | LaunchError::UnsupportedSource { .. } => Errno::EINVAL,
            LaunchError::SourceOpen { source, .. }
            | LaunchError::SourceStat { source, .. }
            | LaunchError::SourceRead { source, .. } => io_errno(source),
            LaunchError::Fork(errno) => *errno,
            LaunchError::Exec { errno, .. } | LaunchError::Wait { errno, .. } => *errno,
            LaunchError::Encode(_) => Errno::EIO,
            LaunchError::ChildFailed { .. } => Errno::ECHILD,
        }
    }

    /// Exit status the launcher terminates with for this error
    ///
    /// A failed child in strict mode propagates its own status; everything
    /// else exits with the OS error number.
    pub fn exit_code(&self) -> ExitStatus {
        match self {
            LaunchError::ChildFailed { outcome, .. } => outcome.status_code(),
            other => other.errno() as ExitStatus,
        }
    }
}

/// OS error number carried by an I/O error, EIO when there is none
pub fn io_errno(err: &io::Error) -> Errno {
    err.raw_os_error().map(Errno::from_raw).unwrap_or(Errno::EIO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nix::sys::signal::Signal;

    #[test]
    fn test_exit_codes_follow_errno() {
        assert_eq!(LaunchError::too_big("setup").exit_code(), Errno::E2BIG as i32);
        assert_eq!(
            LaunchError::Usage("missing program".into()).exit_code(),
            Errno::EINVAL as i32
        );
        assert_eq!(
            LaunchError::Memory(MemoryError::OutOfMemory { requested: 1 }).exit_code(),
            Errno::ENOMEM as i32
        );
    }

    #[test]
    fn test_child_failure_propagates_status() {
        let exited = LaunchError::ChildFailed {
            pid: 42,
            outcome: ChildOutcome::Exited(2),
        };
        assert_eq!(exited.exit_code(), 2);

        let killed = LaunchError::ChildFailed {
            pid: 42,
            outcome: ChildOutcome::Killed(Signal::SIGKILL),
        };
        assert_eq!(killed.exit_code(), 128 + Signal::SIGKILL as i32);
    }

    #[test]
    fn test_io_errno_mapping() {
        let err = io::Error::from_raw_os_error(Errno::ENOENT as i32);
        assert_eq!(io_errno(&err), Errno::ENOENT);

        let synthetic = io::Error::new(io::ErrorKind::Other, "no errno");
        assert_eq!(io_errno(&synthetic), Errno::EIO);
    }
}
