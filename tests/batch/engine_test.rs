/*!
 * Batch Engine Tests
 * Batching, failure policies and ordering through the recording executor
 */

use batch_launcher::batch::{ArgLimits, BatchEngine, OversizedPolicy, RunConfig, SourceSpec};
use batch_launcher::batch::TokenReader;
use batch_launcher::memory::{AllocatorConfig, GrowthAllocator};
use batch_launcher::process::{ChildOutcome, RecordingExecutor, WaitPolicy};
use batch_launcher::LaunchError;
use nix::sys::signal::Signal;
use pretty_assertions::assert_eq;
use std::ffi::CString;
use std::io::Cursor;
use std::path::PathBuf;

fn limits() -> ArgLimits {
    ArgLimits::compute(2_097_152, 0, true, 4096).unwrap()
}

fn engine(config: RunConfig, executor: RecordingExecutor) -> BatchEngine<RecordingExecutor> {
    BatchEngine::new(
        config,
        limits(),
        GrowthAllocator::new(AllocatorConfig::default()),
        executor,
    )
    .unwrap()
}

fn reader(input: Vec<u8>) -> TokenReader<Cursor<Vec<u8>>> {
    TokenReader::new(
        Cursor::new(input),
        PathBuf::from("tokens"),
        limits().read_buffer(),
        limits().arg_buffer - 1,
        OversizedPolicy::Truncate,
    )
}

fn numbered(count: usize) -> (Vec<u8>, Vec<Vec<u8>>) {
    let tokens: Vec<Vec<u8>> = (0..count).map(|i| i.to_string().into_bytes()).collect();
    let mut input = Vec::new();
    for token in &tokens {
        input.extend_from_slice(token);
        input.push(0);
    }
    (input, tokens)
}

fn program(name: &str) -> RunConfig {
    RunConfig::new(CString::new(name).unwrap(), SourceSpec::Stdin)
}

#[test]
fn test_hundred_thousand_tokens_in_batches_of_ten() {
    let (input, tokens) = numbered(100_000);
    let config = program("echo").with_max_batch_tokens(Some(10));
    let mut engine = engine(config, RecordingExecutor::new());

    assert_eq!(engine.run_tokens(reader(input), false).unwrap(), 0);
    assert_eq!(engine.batches(), 9_999);

    let executor = engine.into_executor();
    let launches = executor.all_launches();
    assert_eq!(launches.len(), 10_000);
    assert!(launches.iter().all(|l| l.args().len() == 10));
    assert!(launches.iter().all(|l| l.argv[0] == b"echo"));

    let seen: Vec<Vec<u8>> = launches
        .iter()
        .flat_map(|l| l.args().iter().cloned())
        .collect();
    assert_eq!(seen, tokens);
}

#[test]
fn test_everything_fits_in_one_invocation() {
    let (input, tokens) = numbered(1000);
    let mut engine = engine(program("printf"), RecordingExecutor::new());
    engine.run_tokens(reader(input), false).unwrap();

    let executor = engine.into_executor();
    assert!(executor.spawned().is_empty());
    assert_eq!(executor.in_place().unwrap().args(), tokens.as_slice());
}

#[test]
fn test_force_refuses_before_any_dispatch() {
    let config = program("echo")
        .with_force_single(true)
        .with_max_batch_tokens(Some(1));
    let mut engine = engine(config, RecordingExecutor::new());

    let err = engine.run_tokens(reader(b"a\0b\0".to_vec()), false).unwrap_err();
    assert!(matches!(err, LaunchError::ArgumentListTooLong { .. }));
    assert_eq!(err.exit_code(), nix::libc::E2BIG);
    assert!(engine.into_executor().all_launches().is_empty());
}

#[test]
fn test_strict_stops_at_third_batch() {
    let config = program("sh")
        .with_policy(WaitPolicy::Strict)
        .with_max_batch_tokens(Some(1));
    let executor = RecordingExecutor::new().with_outcome(2, ChildOutcome::Exited(2));
    let mut engine = engine(config, executor);

    let err = engine
        .run_tokens(reader(b"1\x002\x003\x004\x005\0".to_vec()), false)
        .unwrap_err();
    assert!(matches!(err, LaunchError::ChildFailed { .. }));
    assert_eq!(err.exit_code(), 2);

    let executor = engine.into_executor();
    let ran: Vec<&[Vec<u8>]> = executor.all_launches().iter().map(|l| l.args()).collect();
    assert_eq!(
        ran,
        vec![&[b"1".to_vec()][..], &[b"2".to_vec()][..], &[b"3".to_vec()][..]]
    );
}

#[test]
fn test_strict_reports_signal_as_status() {
    let config = program("prog")
        .with_policy(WaitPolicy::Strict)
        .with_max_batch_tokens(Some(1));
    let executor = RecordingExecutor::new().with_outcome(0, ChildOutcome::Killed(Signal::SIGTERM));
    let mut engine = engine(config, executor);

    let err = engine.run_tokens(reader(b"a\0b\0".to_vec()), false).unwrap_err();
    assert_eq!(err.exit_code(), 128 + Signal::SIGTERM as i32);
}

#[test]
fn test_stopped_child_is_waited_past() {
    let config = program("prog")
        .with_policy(WaitPolicy::Strict)
        .with_max_batch_tokens(Some(1));
    let executor = RecordingExecutor::new().with_script(
        0,
        vec![
            ChildOutcome::Stopped(Signal::SIGTSTP),
            ChildOutcome::Continued,
            ChildOutcome::Exited(0),
        ],
    );
    let mut engine = engine(config, executor);

    assert_eq!(engine.run_tokens(reader(b"a\0b\0".to_vec()), false).unwrap(), 0);
    assert_eq!(engine.into_executor().all_launches().len(), 2);
}

#[test]
fn test_spawn_failure_is_fatal() {
    let config = program("prog").with_max_batch_tokens(Some(1));
    let executor = RecordingExecutor::new().with_spawn_failure(1);
    let mut engine = engine(config, executor);

    let err = engine
        .run_tokens(reader(b"a\0b\0c\0".to_vec()), false)
        .unwrap_err();
    assert!(matches!(err, LaunchError::Fork(_)));
    assert_eq!(err.exit_code(), nix::libc::EAGAIN);
    assert!(engine.into_executor().in_place().is_none());
}

#[test]
fn test_final_status_is_returned() {
    let config = program("prog").with_max_batch_tokens(Some(2));
    let executor = RecordingExecutor::new()
        .with_outcome(0, ChildOutcome::Exited(9))
        .with_final_status(4);
    let mut engine = engine(config, executor);

    assert_eq!(engine.run_tokens(reader(b"a\0b\0c\0".to_vec()), false).unwrap(), 4);
    assert_eq!(engine.supervisor().failures(), 1);
}

#[test]
fn test_oversized_token_truncated_into_batch() {
    let limit = limits().arg_buffer - 1;
    let mut input = vec![b'z'; limit + 100];
    input.push(0);
    input.extend_from_slice(b"tail\0");

    let mut engine = engine(program("echo"), RecordingExecutor::new());
    engine.run_tokens(reader(input), false).unwrap();

    let executor = engine.into_executor();
    let args = executor.in_place().unwrap().args().to_vec();
    assert_eq!(args.len(), 2);
    assert_eq!(args[0].len(), limit);
    assert_eq!(args[1], b"tail".to_vec());
}

#[test]
fn test_oversized_token_rejected() {
    let limit = limits().arg_buffer - 1;
    let mut input = vec![b'z'; limit + 1];
    input.push(0);

    let config = program("echo").with_oversized(OversizedPolicy::Reject);
    let mut engine = engine(config, RecordingExecutor::new());
    let tokens = TokenReader::new(
        Cursor::new(input),
        PathBuf::from("tokens"),
        4096,
        limit,
        OversizedPolicy::Reject,
    );

    let err = engine.run_tokens(tokens, false).unwrap_err();
    assert!(matches!(err, LaunchError::OversizedToken { .. }));
    assert_eq!(err.exit_code(), nix::libc::E2BIG);
}
