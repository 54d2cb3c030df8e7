/*!
 * Process Executor
 * fork/exec/wait on the host operating system
 */

use super::traits::{Executor, LaunchRequest};
use super::types::ChildOutcome;
use crate::core::errors::{LaunchError, LaunchResult};
use crate::core::types::{ExitStatus, Pid};
use crate::monitoring::diagnostics;
use crate::vector::PointerList;
use nix::errno::Errno;
use nix::libc;
use nix::sys::signal::{signal, SigHandler, Signal};
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::{fork, ForkResult, Pid as NixPid};
use std::ffi::{c_char, CStr};
use tracing::{debug, trace};

const DEV_NULL: &CStr = c"/dev/null";

/// Executor backed by fork(2), execvp(3) and waitpid(2)
#[derive(Debug, Default)]
pub struct ForkExecutor {
    spawned: usize,
}

impl ForkExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Children started so far
    pub fn spawned(&self) -> usize {
        self.spawned
    }
}

/// Point standard input at /dev/null
fn redirect_stdin_to_null() -> Result<(), Errno> {
    // SAFETY: plain open/dup2/close on a static path; async-signal-safe.
    unsafe {
        let fd = libc::open(DEV_NULL.as_ptr(), libc::O_RDONLY);
        if fd < 0 {
            return Err(Errno::last());
        }
        if fd != libc::STDIN_FILENO {
            let rc = libc::dup2(fd, libc::STDIN_FILENO);
            let errno = Errno::last();
            libc::close(fd);
            if rc < 0 {
                return Err(errno);
            }
        }
    }
    Ok(())
}

/// Replace the process image; returns the errno on failure
///
/// `argv` is built by the caller so nothing allocates between fork and exec.
///
/// SIGPIPE goes back to its default disposition first; the Rust runtime
/// ignores it and an ignored signal survives exec.
fn exec(request: &LaunchRequest<'_>, argv: &PointerList<'_>) -> Errno {
    // SAFETY: SigDfl installs no handler.
    if let Err(errno) = unsafe { signal(Signal::SIGPIPE, SigHandler::SigDfl) } {
        return errno;
    }
    if request.stdin_null {
        if let Err(errno) = redirect_stdin_to_null() {
            return errno;
        }
    }

    let empty_env: [*const c_char; 1] = [std::ptr::null()];

    // SAFETY: program is NUL-terminated and argv/envp are null-terminated
    // lists whose strings outlive the call (it only returns on failure).
    unsafe {
        if request.clean_env {
            libc::execvpe(request.program.as_ptr(), argv.as_ptr(), empty_env.as_ptr());
        } else {
            libc::execvp(request.program.as_ptr(), argv.as_ptr());
        }
    }
    Errno::last()
}

fn exec_error(request: &LaunchRequest<'_>, errno: Errno) -> LaunchError {
    LaunchError::Exec {
        program: request.program.to_string_lossy().into_owned(),
        errno,
    }
}

impl Executor for ForkExecutor {
    fn spawn(&mut self, request: &LaunchRequest<'_>) -> LaunchResult<Pid> {
        let argv = request.argv.to_pointer_list();

        // SAFETY: the launcher is single-threaded; the child only execs or _exits.
        match unsafe { fork() } {
            Ok(ForkResult::Parent { child }) => {
                self.spawned += 1;
                debug!(
                    pid = child.as_raw(),
                    args = request.argv.count(),
                    "child dispatched"
                );
                Ok(child.as_raw())
            }
            Ok(ForkResult::Child) => {
                let errno = exec(request, &argv);
                diagnostics::log_with_error(errno, "cannot execute program");
                // SAFETY: terminate the child without running parent cleanup.
                unsafe { libc::_exit(errno as i32) }
            }
            Err(errno) => Err(LaunchError::Fork(errno)),
        }
    }

    fn wait(&mut self, pid: Pid) -> LaunchResult<ChildOutcome> {
        let flags = WaitPidFlag::WUNTRACED | WaitPidFlag::WCONTINUED;
        loop {
            match waitpid(NixPid::from_raw(pid), Some(flags)) {
                Ok(status) => {
                    if let Some(outcome) = ChildOutcome::from_wait_status(status) {
                        trace!(pid, %outcome, "child state changed");
                        return Ok(outcome);
                    }
                }
                Err(Errno::EINTR) => continue,
                Err(errno) => return Err(LaunchError::Wait { pid, errno }),
            }
        }
    }

    fn reap_finished(&mut self) -> usize {
        let mut reaped = 0;
        loop {
            match waitpid(None, Some(WaitPidFlag::WNOHANG)) {
                Ok(WaitStatus::StillAlive) | Err(Errno::ECHILD) => break,
                Ok(status) => {
                    if let Some(outcome) = ChildOutcome::from_wait_status(status) {
                        debug!(pid = ?status.pid(), %outcome, "background child reaped");
                        if outcome.is_terminal() {
                            reaped += 1;
                        }
                    }
                }
                Err(Errno::EINTR) => continue,
                Err(errno) => {
                    diagnostics::log_with_error(errno, "cannot reap finished children");
                    break;
                }
            }
        }
        reaped
    }

    fn reap_all(&mut self) -> LaunchResult<usize> {
        let mut reaped = 0;
        loop {
            match waitpid(None, None) {
                Ok(status) => {
                    if ChildOutcome::from_wait_status(status).is_some_and(|o| o.is_terminal()) {
                        reaped += 1;
                    }
                }
                Err(Errno::ECHILD) => break,
                Err(Errno::EINTR) => continue,
                Err(errno) => return Err(LaunchError::Wait { pid: -1, errno }),
            }
        }
        if reaped > 0 {
            debug!(reaped, "outstanding children reaped");
        }
        Ok(reaped)
    }

    fn exec_in_place(&mut self, request: &LaunchRequest<'_>) -> LaunchResult<ExitStatus> {
        debug!(args = request.argv.count(), "final invocation in place");
        let argv = request.argv.to_pointer_list();
        let errno = exec(request, &argv);
        Err(exec_error(request, errno))
    }
}
