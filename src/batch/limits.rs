/*!
 * Argument Limits
 * Argument space, argument count and the informational limits report
 */

use crate::core::errors::{LaunchError, LaunchResult};
use crate::core::limits::{
    ARGC_PADDING, ARG_BUFFER_PAGES, ARG_MAX_FALLBACK, ENV_HEADROOM, PAGE_SIZE_DEFAULT,
    STACK_ARG_DIVISOR,
};
use crate::core::num::round_up;
use crate::vector::StringVector;
use nix::sys::resource::{getrlimit, Resource};
use nix::unistd::{sysconf, SysconfVar};
use serde::Serialize;
use std::fmt::Write as _;
use std::mem::size_of;
use tracing::debug;

const WORD: usize = size_of::<usize>();

/// Argument space available to every invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ArgLimits {
    /// System page size
    pub page_size: usize,
    /// Largest single argument, terminator included
    pub arg_buffer: usize,
    /// Environment bytes as inherited
    pub env_size_raw: usize,
    /// Environment bytes reserved after rounding and headroom
    pub env_size: usize,
    /// Argument space the system reports
    pub arg_max: usize,
    /// Argument space left for `argv` strings and pointers
    pub size_args: usize,
    /// Largest argument count, `argv[0]` included
    pub argc_max: usize,
}

impl ArgLimits {
    /// Limits for the running process and its environment
    pub fn detect(clean_env: bool, page_size: usize) -> LaunchResult<Self> {
        Self::compute(system_arg_max(), environment_size(), clean_env, page_size)
    }

    /// Derive limits from raw inputs
    ///
    /// The environment is rounded up to whole default pages with at least
    /// half a page of slack; a clean environment reserves only that slack.
    pub fn compute(
        arg_max: usize,
        env_size_raw: usize,
        clean_env: bool,
        page_size: usize,
    ) -> LaunchResult<Self> {
        let env_size = if clean_env {
            ENV_HEADROOM
        } else {
            let rounded = round_up(env_size_raw, PAGE_SIZE_DEFAULT)
                .ok_or_else(|| LaunchError::too_big("rounding the environment size"))?;
            if rounded - env_size_raw <= ENV_HEADROOM {
                rounded
                    .checked_add(PAGE_SIZE_DEFAULT)
                    .ok_or_else(|| LaunchError::too_big("adding environment headroom"))?
            } else {
                rounded
            }
        };

        let padding = ARGC_PADDING * WORD;
        let space = arg_max
            .checked_sub(env_size)
            .ok_or_else(|| LaunchError::too_big("environment exceeds the argument space"))?;
        let argc_max = (space / WORD)
            .checked_sub(ARGC_PADDING)
            .ok_or_else(|| LaunchError::too_big("no room for argument pointers"))?;
        let size_args = space - padding;

        let limits = Self {
            page_size,
            arg_buffer: ARG_BUFFER_PAGES * page_size,
            env_size_raw,
            env_size,
            arg_max,
            size_args,
            argc_max,
        };
        debug!(?limits, "argument limits computed");
        Ok(limits)
    }

    /// Override the argument space, keeping everything else
    pub fn with_size_args(mut self, size_args: usize) -> Self {
        self.size_args = size_args;
        self
    }

    /// Read buffer size: one argument buffer plus a page
    pub fn read_buffer(&self) -> usize {
        self.arg_buffer + self.page_size
    }

    /// Whether `argv` already exceeds either limit
    pub fn is_exceeded_by(&self, argv: &StringVector) -> bool {
        argv.count() > self.argc_max || argv.argv_size() > self.size_args
    }
}

/// System argument space
///
/// sysconf(ARG_MAX), then a quarter of RLIMIT_STACK, then a large constant.
pub fn system_arg_max() -> usize {
    if let Ok(Some(len)) = sysconf(SysconfVar::ARG_MAX) {
        if len > 0 {
            return len as usize;
        }
    }
    if let Ok((soft, _)) = getrlimit(Resource::RLIMIT_STACK) {
        return usize::try_from(soft / STACK_ARG_DIVISOR as u64).unwrap_or(ARG_MAX_FALLBACK);
    }
    ARG_MAX_FALLBACK
}

/// Bytes the inherited environment occupies (`KEY=VALUE\0` per entry)
pub fn environment_size() -> usize {
    std::env::vars_os()
        .map(|(key, value)| key.len() + value.len() + 2)
        .sum()
}

/// Limits as shown by the info mode
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InfoReport {
    pub page_size: usize,
    pub max_arg_length: usize,
    pub env_size_raw: usize,
    pub env_size_rounded: usize,
    pub arg_max_system: usize,
    pub arg_max_current: usize,
    pub initial_length: usize,
    pub argc_max: usize,
    pub initial_count: usize,
}

impl InfoReport {
    pub fn new(limits: &ArgLimits, initial: &StringVector) -> Self {
        Self {
            page_size: limits.page_size,
            max_arg_length: limits.arg_buffer,
            env_size_raw: limits.env_size_raw,
            env_size_rounded: limits.env_size,
            arg_max_system: limits.arg_max,
            arg_max_current: limits.size_args,
            initial_length: initial.argv_size(),
            argc_max: limits.argc_max,
            initial_count: initial.count(),
        }
    }

    /// Human readable, one value per line
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let rows: [(&str, usize); 9] = [
            ("System page size", self.page_size),
            ("Maximum (single) argument length", self.max_arg_length),
            ("Environment size, as is", self.env_size_raw),
            ("Environment size, round", self.env_size_rounded),
            ("Maximum arguments length, system", self.arg_max_system),
            ("Maximum arguments length, current", self.arg_max_current),
            ("Initial arguments length", self.initial_length),
            ("Maximum argument count", self.argc_max),
            ("Initial argument count", self.initial_count),
        ];
        for (label, value) in rows {
            let _ = writeln!(out, "{:<36}{}", format!("{}:", label), value);
        }
        out
    }

    pub fn render_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
