/*!
 * Batch Launcher - Main Entry Point
 *
 * launcher [OPTIONS] <PROGRAM> [ARGS]... <TOKEN_FILE | ->
 */

use batch_launcher::batch::BatchEngine;
use batch_launcher::cli::{Cli, InfoFormat};
use batch_launcher::{
    init_tracing, AllocatorConfig, ArgLimits, ForkExecutor, GrowthAllocator, LaunchError,
    LaunchResult, TokenSource,
};
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use nix::errno::Errno;
use tracing::{debug, error};

fn main() {
    init_tracing();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => err.exit(),
            _ => {
                let _ = err.print();
                std::process::exit(Errno::EINVAL as i32);
            }
        },
    };

    let code = match run(&cli) {
        Ok(status) => status,
        Err(err) => {
            let code = err.exit_code();
            if matches!(err, LaunchError::Usage(_)) {
                eprintln!("{}", Cli::command().render_usage());
            }
            error!(code, "launcher failed");
            eprintln!("{:?}", miette::Report::new(err));
            code
        }
    };
    std::process::exit(code);
}

fn run(cli: &Cli) -> LaunchResult<i32> {
    let config = cli.to_config()?;
    let allocator = GrowthAllocator::new(AllocatorConfig::from_env());
    let limits = ArgLimits::detect(config.clean_env, allocator.geometry().page_size())?;
    debug!(?config, "configuration resolved");

    if cli.info {
        let engine = BatchEngine::new(config, limits, allocator, ForkExecutor::new())?;
        let report = engine.info_report();
        match cli.info_format {
            InfoFormat::Text => eprint!("{}", report.render_text()),
            InfoFormat::Json => {
                println!("{}", report.render_json()?);
            }
        }
        return Ok(0);
    }

    let mut engine = BatchEngine::new(config, limits, allocator, ForkExecutor::new())?;
    let source = TokenSource::open(&engine.config().source, engine.config().delete_source)?;
    engine.run(source)
}
