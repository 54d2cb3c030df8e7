/*!
 * Batch Engine
 * Packs streamed tokens into invocations that fit the argument limits
 *
 * Dispatch is lazy: a full batch is only launched once the next token
 * proves there is more work. Whatever is left when input ends (possibly
 * just the fixed arguments) runs in place of the launcher itself.
 */

use super::config::RunConfig;
use super::limits::{ArgLimits, InfoReport};
use super::source::TokenSource;
use super::tokenizer::TokenReader;
use crate::core::errors::{LaunchError, LaunchResult};
use crate::core::num::round_up;
use crate::core::types::ExitStatus;
use crate::memory::GrowthAllocator;
use crate::process::{Executor, LaunchRequest, Supervisor};
use crate::vector::StringVector;
use std::io::Read;
use std::mem::size_of;
use tracing::{debug, info};

const WORD: usize = size_of::<usize>();

/// Streams tokens into batches and hands them to an executor
#[derive(Debug)]
pub struct BatchEngine<E: Executor> {
    config: RunConfig,
    limits: ArgLimits,
    allocator: GrowthAllocator,
    initial: StringVector,
    max_tokens: usize,
    executor: E,
    supervisor: Supervisor,
    batches: usize,
}

impl<E: Executor> BatchEngine<E> {
    /// Build the fixed leading arguments and check them against the limits
    pub fn new(
        config: RunConfig,
        limits: ArgLimits,
        allocator: GrowthAllocator,
        executor: E,
    ) -> LaunchResult<Self> {
        let mut initial = StringVector::new(allocator);
        initial.append(config.argv0().as_bytes())?;
        for arg in &config.common_args {
            initial.append(arg.as_bytes())?;
        }

        if limits.is_exceeded_by(&initial) {
            return Err(LaunchError::too_big(format!(
                "{} initial arguments need {} bytes, {} available",
                initial.count(),
                initial.argv_size(),
                limits.size_args
            )));
        }

        let mut max_tokens = limits.argc_max - initial.count();
        if let Some(cap) = config.max_batch_tokens {
            max_tokens = max_tokens.min(cap);
        }

        debug!(
            initial = initial.count(),
            max_tokens,
            size_args = limits.size_args,
            policy = %config.policy,
            "batch engine ready"
        );

        Ok(Self {
            supervisor: Supervisor::new(config.policy),
            config,
            limits,
            allocator,
            initial,
            max_tokens,
            executor,
            batches: 0,
        })
    }

    #[inline]
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    #[inline]
    pub fn limits(&self) -> &ArgLimits {
        &self.limits
    }

    #[inline]
    pub fn initial(&self) -> &StringVector {
        &self.initial
    }

    /// Streamed tokens allowed per batch
    #[inline]
    pub fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    /// Batches dispatched to children so far
    #[inline]
    pub fn batches(&self) -> usize {
        self.batches
    }

    #[inline]
    pub fn executor(&self) -> &E {
        &self.executor
    }

    #[inline]
    pub fn supervisor(&self) -> &Supervisor {
        &self.supervisor
    }

    #[inline]
    pub fn allocator(&self) -> &GrowthAllocator {
        &self.allocator
    }

    pub fn into_executor(self) -> E {
        self.executor
    }

    pub fn info_report(&self) -> InfoReport {
        InfoReport::new(&self.limits, &self.initial)
    }

    /// Run every batch from `source`
    ///
    /// The source is closed, and deleted when requested, before the final
    /// invocation and also when the run fails.
    pub fn run(&mut self, mut source: TokenSource) -> LaunchResult<ExitStatus> {
        let stdin_null = source.is_stdin();
        let path = source.path().to_path_buf();

        let streamed = match source.reader() {
            Some(reader) => {
                let tokens = TokenReader::new(
                    reader,
                    path,
                    self.limits.read_buffer(),
                    self.limits.arg_buffer.saturating_sub(1),
                    self.config.oversized,
                );
                self.stream(tokens, stdin_null)
            }
            None => self.initial.try_clone().map_err(LaunchError::from),
        };

        source.close();
        source.delete_if_unchanged();

        let current = streamed?;
        self.finish(&current, stdin_null)
    }

    /// Run every batch from an already open token stream
    pub fn run_tokens<R: Read>(
        &mut self,
        tokens: TokenReader<R>,
        stdin_null: bool,
    ) -> LaunchResult<ExitStatus> {
        let last = self.stream(tokens, stdin_null)?;
        self.finish(&last, stdin_null)
    }

    /// Consume `tokens`, dispatching full batches; returns the last batch
    pub fn stream<R: Read>(
        &mut self,
        mut tokens: TokenReader<R>,
        stdin_null: bool,
    ) -> LaunchResult<StringVector> {
        let mut current = self.initial.try_clone()?;
        let mut in_batch = 0usize;

        while let Some(token) = tokens.next_token()? {
            if !self.fits(&self.initial, 0, token.len()) {
                return Err(LaunchError::too_big(format!(
                    "a token of {} bytes does not fit into an empty batch",
                    token.len()
                )));
            }

            if !self.fits(&current, in_batch, token.len()) {
                if self.config.force_single {
                    return Err(LaunchError::too_big(
                        "input does not fit into a single invocation",
                    ));
                }
                self.dispatch(&current, stdin_null)?;
                current = self.initial.try_clone()?;
                in_batch = 0;
            }

            current.append(token)?;
            in_batch += 1;
        }

        debug!(
            tokens = tokens.tokens(),
            batches = self.batches,
            remaining = in_batch,
            "token source exhausted"
        );
        Ok(current)
    }

    /// Whether one more token of `len` bytes fits next to `in_batch` tokens
    fn fits(&self, batch: &StringVector, in_batch: usize, len: usize) -> bool {
        if in_batch >= self.max_tokens {
            return false;
        }
        let Some(slot) = len.checked_add(1).and_then(|n| round_up(n, WORD)) else {
            return false;
        };
        batch
            .argv_size()
            .checked_add(slot)
            .and_then(|n| n.checked_add(WORD))
            .is_some_and(|needed| needed <= self.limits.size_args)
    }

    fn dispatch(&mut self, batch: &StringVector, stdin_null: bool) -> LaunchResult<()> {
        let request = LaunchRequest {
            program: self.config.program.as_c_str(),
            argv: batch,
            clean_env: self.config.clean_env,
            stdin_null,
        };
        let pid = self.executor.spawn(&request)?;
        self.batches += 1;
        info!(
            batch = self.batches,
            pid,
            args = batch.count(),
            bytes = batch.argv_size(),
            "batch dispatched"
        );

        self.supervisor.supervise(&mut self.executor, pid)?;
        Ok(())
    }

    /// Wait for stragglers, then run the last batch in place
    fn finish(&mut self, last: &StringVector, stdin_null: bool) -> LaunchResult<ExitStatus> {
        self.supervisor.drain(&mut self.executor)?;

        info!(
            batches = self.batches,
            args = last.count(),
            "running final invocation"
        );
        let request = LaunchRequest {
            program: self.config.program.as_c_str(),
            argv: last,
            clean_env: self.config.clean_env,
            stdin_null,
        };
        self.executor.exec_in_place(&request)
    }
}
