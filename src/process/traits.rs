/*!
 * Process Traits
 * The seam between batch dispatch and the operating system
 */

use super::types::ChildOutcome;
use crate::core::errors::LaunchResult;
use crate::core::types::{ExitStatus, Pid};
use crate::vector::StringVector;
use std::ffi::CStr;

/// Everything needed to run one invocation
#[derive(Debug, Clone, Copy)]
pub struct LaunchRequest<'a> {
    /// Program looked up through PATH
    pub program: &'a CStr,
    /// Full argument vector, `argv[0]` included
    pub argv: &'a StringVector,
    /// Run with an empty environment
    pub clean_env: bool,
    /// Give the child `/dev/null` as standard input
    pub stdin_null: bool,
}

/// Process creation and supervision
pub trait Executor {
    /// Start a child running `request`
    fn spawn(&mut self, request: &LaunchRequest<'_>) -> LaunchResult<Pid>;

    /// Block until the next state change of `pid`
    fn wait(&mut self, pid: Pid) -> LaunchResult<ChildOutcome>;

    /// Collect children that already terminated without blocking
    fn reap_finished(&mut self) -> usize;

    /// Block until every child has terminated
    fn reap_all(&mut self) -> LaunchResult<usize>;

    /// Replace the current process with `request`
    ///
    /// Only returns when the replacement did not happen (or, for
    /// non-OS executors, with the status the invocation would have had).
    fn exec_in_place(&mut self, request: &LaunchRequest<'_>) -> LaunchResult<ExitStatus>;
}
