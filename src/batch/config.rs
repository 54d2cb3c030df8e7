/*!
 * Run Configuration
 * Everything a batch run needs, resolved before any token is read
 */

use crate::core::errors::{LaunchError, LaunchResult};
use crate::process::WaitPolicy;
use serde::Serialize;
use std::ffi::{CString, OsStr};
use std::os::unix::ffi::OsStrExt;
use std::path::PathBuf;

/// Where tokens come from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SourceSpec {
    Stdin,
    Path(PathBuf),
}

impl SourceSpec {
    /// `-` selects standard input, anything else is a path
    pub fn parse(arg: &OsStr) -> Self {
        if arg.as_bytes() == b"-" {
            SourceSpec::Stdin
        } else {
            SourceSpec::Path(PathBuf::from(arg))
        }
    }

    pub fn is_stdin(&self) -> bool {
        matches!(self, SourceSpec::Stdin)
    }
}

/// What happens to a token longer than the single-argument buffer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum OversizedPolicy {
    /// Cut the token at the buffer size and warn
    #[default]
    Truncate,
    /// Fail the run with E2BIG
    Reject,
}

/// Resolved options of one run
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub program: CString,
    pub arg0: Option<CString>,
    pub common_args: Vec<CString>,
    pub source: SourceSpec,
    pub clean_env: bool,
    pub force_single: bool,
    pub policy: WaitPolicy,
    pub delete_source: bool,
    pub oversized: OversizedPolicy,
    /// Upper bound on streamed tokens per batch, on top of the system limits
    pub max_batch_tokens: Option<usize>,
}

impl RunConfig {
    pub fn new(program: CString, source: SourceSpec) -> Self {
        Self {
            program,
            arg0: None,
            common_args: Vec::new(),
            source,
            clean_env: false,
            force_single: false,
            policy: WaitPolicy::default(),
            delete_source: false,
            oversized: OversizedPolicy::default(),
            max_batch_tokens: None,
        }
    }

    pub fn with_arg0(mut self, arg0: Option<CString>) -> Self {
        self.arg0 = arg0;
        self
    }

    pub fn with_common_args(mut self, args: Vec<CString>) -> Self {
        self.common_args = args;
        self
    }

    pub fn with_clean_env(mut self, clean_env: bool) -> Self {
        self.clean_env = clean_env;
        self
    }

    pub fn with_force_single(mut self, force: bool) -> Self {
        self.force_single = force;
        self
    }

    pub fn with_policy(mut self, policy: WaitPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Request deletion of the token file; ignored for standard input
    pub fn with_delete_source(mut self, delete: bool) -> Self {
        self.delete_source = delete;
        self
    }

    pub fn with_oversized(mut self, policy: OversizedPolicy) -> Self {
        self.oversized = policy;
        self
    }

    pub fn with_max_batch_tokens(mut self, max: Option<usize>) -> Self {
        self.max_batch_tokens = max;
        self
    }

    /// `argv[0]` of every invocation
    pub fn argv0(&self) -> &CString {
        self.arg0.as_ref().unwrap_or(&self.program)
    }

    /// Whether children must not inherit standard input
    pub fn reads_stdin(&self) -> bool {
        self.source.is_stdin()
    }
}

/// Convert a command-line argument into a C string
pub fn c_arg(arg: &OsStr) -> LaunchResult<CString> {
    CString::new(arg.as_bytes())
        .map_err(|_| LaunchError::Usage(format!("argument {:?} contains a NUL byte", arg)))
}
