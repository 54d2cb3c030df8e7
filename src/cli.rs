/*!
 * Command Line
 * Option parsing for the launcher binary
 */

use crate::batch::{c_arg, OversizedPolicy, RunConfig, SourceSpec};
use crate::core::errors::{LaunchError, LaunchResult};
use crate::process::WaitPolicy;
use clap::{Parser, ValueEnum};
use std::ffi::OsString;

/// Output format of the info mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum InfoFormat {
    #[default]
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "launcher", version)]
#[command(
    about = "Run a program over NUL-separated arguments, as many per invocation as fit",
    long_about = None
)]
#[command(override_usage = "launcher [OPTIONS] <PROGRAM> [ARGS]... <TOKEN_FILE | ->")]
pub struct Cli {
    /// Use ARG0 as argv[0] of every invocation
    #[arg(short = 'a', long = "arg0", value_name = "ARG0")]
    pub arg0: Option<OsString>,

    /// Run the program with an empty environment
    #[arg(short = 'c', long = "clean-env")]
    pub clean_env: bool,

    /// Print the argument limits and exit
    #[arg(short = 'i', long = "info")]
    pub info: bool,

    /// Format of the info report (json goes to standard output)
    #[arg(long = "info-format", value_enum, default_value_t = InfoFormat::Text)]
    pub info_format: InfoFormat,

    /// Fail instead of splitting the input into several invocations
    #[arg(short = 'f', long = "force")]
    pub force: bool,

    /// Do not wait for invocations to finish
    #[arg(short = 'n', long = "no-wait", conflicts_with = "strict")]
    pub no_wait: bool,

    /// Abort on the first invocation that fails
    #[arg(short = 's', long = "strict")]
    pub strict: bool,

    /// Delete the token file once it has been read
    #[arg(short = 'u', long = "unlink")]
    pub unlink: bool,

    /// Pass at most N tokens per invocation
    #[arg(short = 'm', long = "max-args", value_name = "N",
          value_parser = clap::value_parser!(u64).range(1..))]
    pub max_args: Option<u64>,

    /// Fail on tokens longer than the single argument limit instead of truncating
    #[arg(long = "reject-oversized")]
    pub reject_oversized: bool,

    /// Program, its common arguments and the token file (`-` for standard input)
    #[arg(
        value_name = "COMMAND",
        trailing_var_arg = true,
        allow_hyphen_values = true,
        num_args = 1..,
        required_unless_present = "info"
    )]
    pub command: Vec<OsString>,
}

impl Cli {
    pub fn policy(&self) -> WaitPolicy {
        if self.strict {
            WaitPolicy::Strict
        } else if self.no_wait {
            WaitPolicy::FireAndForget
        } else {
            WaitPolicy::Synchronous
        }
    }

    /// Resolve the parsed options into a run configuration
    ///
    /// The info mode accepts a missing token file and even a missing program.
    pub fn to_config(&self) -> LaunchResult<RunConfig> {
        let (program, rest) = match self.command.split_first() {
            Some(split) => split,
            None if self.info => return Ok(RunConfig::new(Default::default(), SourceSpec::Stdin)),
            None => return Err(LaunchError::Usage("missing program".into())),
        };

        let (source, common) = match rest.split_last() {
            Some((source, common)) => (SourceSpec::parse(source), common),
            None if self.info => (SourceSpec::Stdin, rest),
            None => return Err(LaunchError::Usage("missing token file".into())),
        };

        let common_args = common
            .iter()
            .map(|arg| c_arg(arg))
            .collect::<LaunchResult<Vec<_>>>()?;
        let arg0 = self.arg0.as_deref().map(c_arg).transpose()?;
        let oversized = if self.reject_oversized {
            OversizedPolicy::Reject
        } else {
            OversizedPolicy::Truncate
        };

        Ok(RunConfig::new(c_arg(program)?, source)
            .with_arg0(arg0)
            .with_common_args(common_args)
            .with_clean_env(self.clean_env)
            .with_force_single(self.force)
            .with_policy(self.policy())
            .with_delete_source(self.unlink)
            .with_oversized(oversized)
            .with_max_batch_tokens(self.max_args.and_then(|n| usize::try_from(n).ok())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;
    use pretty_assertions::assert_eq;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("launcher").chain(args.iter().copied()))
    }

    #[test]
    fn test_program_args_and_source() {
        let cli = parse(&["-s", "echo", "-n", "--x", "tokens"]).unwrap();
        assert_eq!(cli.policy(), WaitPolicy::Strict);

        let config = cli.to_config().unwrap();
        assert_eq!(config.program.as_c_str(), c"echo");
        assert_eq!(config.common_args, vec![c"-n".to_owned(), c"--x".to_owned()]);
        assert_eq!(config.source, SourceSpec::Path("tokens".into()));
    }

    #[test]
    fn test_stdin_source() {
        let cli = parse(&["-u", "cat", "-"]).unwrap();
        let config = cli.to_config().unwrap();
        assert!(config.reads_stdin());
        assert!(config.delete_source);
    }

    #[test]
    fn test_no_wait_conflicts_with_strict() {
        let err = parse(&["-n", "-s", "echo", "-"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArgumentConflict);
    }

    #[test]
    fn test_missing_token_file() {
        let cli = parse(&["echo"]).unwrap();
        assert!(matches!(cli.to_config(), Err(LaunchError::Usage(_))));
    }

    #[test]
    fn test_missing_program() {
        assert!(parse(&[]).is_err());
        assert!(parse(&["-i"]).unwrap().to_config().is_ok());
    }

    #[test]
    fn test_options() {
        let cli = parse(&[
            "-a", "alias", "-c", "-f", "-m", "10", "--reject-oversized", "prog", "file",
        ])
        .unwrap();
        let config = cli.to_config().unwrap();
        assert_eq!(config.argv0().as_c_str(), c"alias");
        assert!(config.clean_env);
        assert!(config.force_single);
        assert_eq!(config.max_batch_tokens, Some(10));
        assert_eq!(config.oversized, OversizedPolicy::Reject);
        assert_eq!(config.policy, WaitPolicy::Synchronous);
    }

    #[test]
    fn test_max_args_must_be_positive() {
        assert!(parse(&["-m", "0", "prog", "file"]).is_err());
    }

    #[test]
    fn test_info_format() {
        let cli = parse(&["-i", "--info-format", "json"]).unwrap();
        assert!(cli.info);
        assert_eq!(cli.info_format, InfoFormat::Json);
    }
}
