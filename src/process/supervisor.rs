/*!
 * Child Supervisor
 * Applies the wait policy to each dispatched child
 */

use super::traits::Executor;
use super::types::{ChildOutcome, WaitPolicy};
use crate::core::errors::{LaunchError, LaunchResult};
use crate::core::types::{ExitStatus, Pid};
use tracing::{debug, warn};

/// What supervision concluded about one child
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The child terminated with this outcome and batching goes on
    Completed(ChildOutcome),
    /// The child was left running
    Detached,
}

/// Tracks dispatched children under one wait policy
#[derive(Debug, Clone)]
pub struct Supervisor {
    policy: WaitPolicy,
    last_status: ExitStatus,
    dispatched: usize,
    failures: usize,
}

impl Supervisor {
    pub fn new(policy: WaitPolicy) -> Self {
        Self {
            policy,
            last_status: 0,
            dispatched: 0,
            failures: 0,
        }
    }

    #[inline]
    pub fn policy(&self) -> WaitPolicy {
        self.policy
    }

    /// Status of the most recent child that terminated under supervision
    #[inline]
    pub fn last_status(&self) -> ExitStatus {
        self.last_status
    }

    /// Children handed to `supervise`
    #[inline]
    pub fn dispatched(&self) -> usize {
        self.dispatched
    }

    /// Children that terminated unsuccessfully
    #[inline]
    pub fn failures(&self) -> usize {
        self.failures
    }

    /// Follow `pid` according to the policy
    ///
    /// Stopped, continued and trapped states are reported and waited past.
    /// In strict mode a failing child ends the run with `ChildFailed`.
    pub fn supervise<E: Executor>(&mut self, executor: &mut E, pid: Pid) -> LaunchResult<Verdict> {
        self.dispatched += 1;

        if !self.policy.is_blocking() {
            let reaped = executor.reap_finished();
            if reaped > 0 {
                debug!(reaped, "finished children collected");
            }
            return Ok(Verdict::Detached);
        }

        let outcome = loop {
            let outcome = executor.wait(pid)?;
            if outcome.is_terminal() {
                break outcome;
            }
            warn!(pid, %outcome, "child process changed state");
        };

        self.last_status = outcome.status_code();
        if outcome.is_failure() {
            self.failures += 1;
            if self.policy == WaitPolicy::Strict {
                return Err(LaunchError::ChildFailed { pid, outcome });
            }
            warn!(pid, %outcome, "child process failed, continuing");
        } else {
            debug!(pid, "child process finished");
        }

        Ok(Verdict::Completed(outcome))
    }

    /// Collect every child still running
    pub fn drain<E: Executor>(&mut self, executor: &mut E) -> LaunchResult<usize> {
        let reaped = executor.reap_all()?;
        if reaped > 0 {
            debug!(reaped, policy = %self.policy, "children drained");
        }
        Ok(reaped)
    }
}
