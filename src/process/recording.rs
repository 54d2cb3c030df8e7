/*!
 * Recording Executor
 * In-memory executor that captures every launch instead of forking
 */

use super::traits::{Executor, LaunchRequest};
use super::types::ChildOutcome;
use crate::core::errors::{LaunchError, LaunchResult};
use crate::core::types::{ExitStatus, Pid};
use nix::errno::Errno;
use std::collections::{HashMap, VecDeque};

const FIRST_PID: Pid = 1000;

/// One captured invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedLaunch {
    pub pid: Option<Pid>,
    pub program: Vec<u8>,
    pub argv: Vec<Vec<u8>>,
    pub clean_env: bool,
    pub stdin_null: bool,
}

impl RecordedLaunch {
    fn capture(pid: Option<Pid>, request: &LaunchRequest<'_>) -> Self {
        Self {
            pid,
            program: request.program.to_bytes().to_vec(),
            argv: request.argv.iter().map(<[u8]>::to_vec).collect(),
            clean_env: request.clean_env,
            stdin_null: request.stdin_null,
        }
    }

    /// Arguments after `argv[0]`
    pub fn args(&self) -> &[Vec<u8>] {
        self.argv.get(1..).unwrap_or(&[])
    }
}

/// Executor that records launches and replays scripted child outcomes
///
/// Every child exits with status 0 unless a script says otherwise.
#[derive(Debug, Default)]
pub struct RecordingExecutor {
    spawned: Vec<RecordedLaunch>,
    in_place: Option<RecordedLaunch>,
    scripts: HashMap<usize, Vec<ChildOutcome>>,
    pending: HashMap<Pid, VecDeque<ChildOutcome>>,
    final_status: ExitStatus,
    fail_spawn_at: Option<usize>,
    reaped: usize,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// State changes the `index`-th spawned child (0-based) reports
    pub fn with_script(mut self, index: usize, outcomes: Vec<ChildOutcome>) -> Self {
        self.scripts.insert(index, outcomes);
        self
    }

    /// Terminal outcome of the `index`-th spawned child
    pub fn with_outcome(self, index: usize, outcome: ChildOutcome) -> Self {
        self.with_script(index, vec![outcome])
    }

    /// Status reported by the in-place invocation
    pub fn with_final_status(mut self, status: ExitStatus) -> Self {
        self.final_status = status;
        self
    }

    /// Make the `index`-th spawn fail like fork(2) with EAGAIN
    pub fn with_spawn_failure(mut self, index: usize) -> Self {
        self.fail_spawn_at = Some(index);
        self
    }

    /// Launches made through `spawn`, in order
    pub fn spawned(&self) -> &[RecordedLaunch] {
        &self.spawned
    }

    /// The in-place invocation, if one happened
    pub fn in_place(&self) -> Option<&RecordedLaunch> {
        self.in_place.as_ref()
    }

    /// Spawned launches followed by the in-place one
    pub fn all_launches(&self) -> Vec<&RecordedLaunch> {
        self.spawned.iter().chain(self.in_place.iter()).collect()
    }

    /// Children reaped through `reap_finished`/`reap_all`
    pub fn reaped(&self) -> usize {
        self.reaped
    }

    /// Children spawned but not yet observed as terminated
    pub fn outstanding(&self) -> usize {
        self.pending.len()
    }

    fn take_pending(&mut self) -> usize {
        let count = self.pending.len();
        self.pending.clear();
        self.reaped += count;
        count
    }
}

impl Executor for RecordingExecutor {
    fn spawn(&mut self, request: &LaunchRequest<'_>) -> LaunchResult<Pid> {
        let index = self.spawned.len();
        if self.fail_spawn_at == Some(index) {
            return Err(LaunchError::Fork(Errno::EAGAIN));
        }

        let pid = FIRST_PID + index as Pid;
        let script = self
            .scripts
            .remove(&index)
            .unwrap_or_else(|| vec![ChildOutcome::Exited(0)]);
        self.pending.insert(pid, script.into());
        self.spawned.push(RecordedLaunch::capture(Some(pid), request));
        Ok(pid)
    }

    fn wait(&mut self, pid: Pid) -> LaunchResult<ChildOutcome> {
        let Some(queue) = self.pending.get_mut(&pid) else {
            return Err(LaunchError::Wait {
                pid,
                errno: Errno::ECHILD,
            });
        };

        let outcome = queue.pop_front().unwrap_or(ChildOutcome::Exited(0));
        if outcome.is_terminal() || queue.is_empty() {
            self.pending.remove(&pid);
        }
        Ok(outcome)
    }

    fn reap_finished(&mut self) -> usize {
        self.take_pending()
    }

    fn reap_all(&mut self) -> LaunchResult<usize> {
        Ok(self.take_pending())
    }

    fn exec_in_place(&mut self, request: &LaunchRequest<'_>) -> LaunchResult<ExitStatus> {
        self.in_place = Some(RecordedLaunch::capture(None, request));
        Ok(self.final_status)
    }
}
