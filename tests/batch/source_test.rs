/*!
 * Token Source Tests
 * Running from files, deletion and rejected source types
 */

use batch_launcher::batch::{ArgLimits, BatchEngine, RunConfig, SourceSpec, TokenSource};
use batch_launcher::memory::{AllocatorConfig, GrowthAllocator};
use batch_launcher::process::{ChildOutcome, RecordingExecutor, WaitPolicy};
use batch_launcher::LaunchError;
use pretty_assertions::assert_eq;
use std::fs;

fn engine(config: RunConfig, executor: RecordingExecutor) -> BatchEngine<RecordingExecutor> {
    BatchEngine::new(
        config,
        ArgLimits::compute(2_097_152, 0, true, 4096).unwrap(),
        GrowthAllocator::new(AllocatorConfig::default()),
        executor,
    )
    .unwrap()
}

#[test]
fn test_run_from_file_and_delete() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tokens");
    fs::write(&path, b"one\0two\0three").unwrap();

    let spec = SourceSpec::Path(path.clone());
    let config = RunConfig::new(c"echo".into(), spec.clone()).with_delete_source(true);
    let mut engine = engine(config, RecordingExecutor::new());
    let source = TokenSource::open(&spec, true).unwrap();

    assert_eq!(engine.run(source).unwrap(), 0);
    assert!(!path.exists());

    let executor = engine.into_executor();
    let run = executor.in_place().unwrap();
    assert_eq!(
        run.args(),
        &[b"one".to_vec(), b"two".to_vec(), b"three".to_vec()]
    );
    assert!(!run.stdin_null);
}

#[test]
fn test_file_kept_without_delete() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tokens");
    fs::write(&path, b"x\0").unwrap();

    let spec = SourceSpec::Path(path.clone());
    let mut engine = engine(RunConfig::new(c"echo".into(), spec.clone()), RecordingExecutor::new());
    engine.run(TokenSource::open(&spec, false).unwrap()).unwrap();
    assert!(path.exists());
}

#[test]
fn test_file_deleted_even_when_run_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tokens");
    fs::write(&path, b"a\0b\0c\0").unwrap();

    let spec = SourceSpec::Path(path.clone());
    let config = RunConfig::new(c"prog".into(), spec.clone())
        .with_policy(WaitPolicy::Strict)
        .with_max_batch_tokens(Some(1))
        .with_delete_source(true);
    let executor = RecordingExecutor::new().with_outcome(0, ChildOutcome::Exited(3));
    let mut engine = engine(config, executor);

    let err = engine.run(TokenSource::open(&spec, true).unwrap()).unwrap_err();
    assert_eq!(err.exit_code(), 3);
    assert!(!path.exists());
}

#[test]
fn test_empty_file_runs_bare_program() {
    let file = tempfile::NamedTempFile::new().unwrap();
    let spec = SourceSpec::Path(file.path().to_path_buf());
    let config = RunConfig::new(c"true".into(), spec.clone())
        .with_common_args(vec![c"-v".into()]);
    let mut engine = engine(config, RecordingExecutor::new().with_final_status(0));

    engine.run(TokenSource::open(&spec, false).unwrap()).unwrap();
    let executor = engine.into_executor();
    assert_eq!(
        executor.in_place().unwrap().argv,
        vec![b"true".to_vec(), b"-v".to_vec()]
    );
}

#[test]
fn test_symlink_source_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("tokens");
    fs::write(&target, b"a\0").unwrap();
    let link = dir.path().join("link");
    std::os::unix::fs::symlink(&target, &link).unwrap();

    let err = TokenSource::open(&SourceSpec::Path(link), true).unwrap_err();
    assert!(matches!(err, LaunchError::UnsupportedSource { .. }));
    assert_eq!(err.exit_code(), nix::libc::EINVAL);
    assert!(target.exists());
}

#[test]
fn test_fifo_source_accepted() {
    let dir = tempfile::tempdir().unwrap();
    let fifo = dir.path().join("pipe");
    nix::unistd::mkfifo(&fifo, nix::sys::stat::Mode::S_IRWXU).unwrap();

    let writer = {
        let fifo = fifo.clone();
        std::thread::spawn(move || fs::write(fifo, b"p\0q\0").unwrap())
    };

    let spec = SourceSpec::Path(fifo.clone());
    let mut engine = engine(RunConfig::new(c"echo".into(), spec.clone()), RecordingExecutor::new());
    engine.run(TokenSource::open(&spec, true).unwrap()).unwrap();
    writer.join().unwrap();

    assert_eq!(
        engine.into_executor().in_place().unwrap().args(),
        &[b"p".to_vec(), b"q".to_vec()]
    );
    // Not a regular file, so it is never unlinked
    assert!(fifo.exists());
}
