use drivesweep_core::{AccessError, ApprovalSandbox, FileRecord};
use drivesweep_ops::{
    BatchExecutor, ExecutionState, ItemErrorKind, ItemStatus, OperationEvent, OperationRequest,
    OpsError, SetupError, start_execute,
};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

fn record(path: &Path) -> FileRecord {
    let size = fs::metadata(path).map(|m| m.len()).unwrap_or(0);
    FileRecord::new(path, size, SystemTime::now(), "/")
}

fn make_files(dir: &Path, count: usize) -> Vec<FileRecord> {
    (0..count)
        .map(|i| {
            let path = dir.join(format!("file{i}.txt"));
            fs::write(&path, format!("content {i}")).unwrap();
            record(&path)
        })
        .collect()
}

fn executor_for(root: &Path) -> BatchExecutor {
    BatchExecutor::new(Arc::new(ApprovalSandbox::with_roots([root]).unwrap()))
}

#[tokio::test]
async fn test_copy_never_overwrites() {
    let temp = TempDir::new().unwrap();
    let src = temp.path().join("src");
    let dest = temp.path().join("dest");
    fs::create_dir_all(&src).unwrap();
    fs::create_dir_all(&dest).unwrap();
    fs::write(src.join("song.mp3"), "new").unwrap();
    fs::write(dest.join("song.mp3"), "old").unwrap();

    let executor = executor_for(temp.path());
    let request = OperationRequest::copy(vec![record(&src.join("song.mp3"))], &dest);
    let outcome = executor
        .execute(request, |_| {}, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.succeeded, 1);
    assert_eq!(fs::read_to_string(dest.join("song.mp3")).unwrap(), "old");
    assert_eq!(fs::read_to_string(dest.join("song (1).mp3")).unwrap(), "new");
    assert!(src.join("song.mp3").exists());
    match &outcome.items[0].status {
        ItemStatus::Succeeded { destination, .. } => {
            assert_eq!(destination.as_deref(), Some(dest.join("song (1).mp3").as_path()));
        }
        other => panic!("expected success, got {other:?}"),
    }
}

#[tokio::test]
async fn test_cancel_after_two_of_ten() {
    let temp = TempDir::new().unwrap();
    let src = temp.path().join("src");
    fs::create_dir_all(&src).unwrap();
    let targets = make_files(&src, 10);

    let executor = executor_for(temp.path());
    let cancel = CancellationToken::new();
    let request = OperationRequest::copy(targets, temp.path().join("dest"));

    let mut ticks = Vec::new();
    let outcome = executor
        .execute(
            request,
            |progress| {
                ticks.push(progress.processed);
                if progress.processed == 2 {
                    cancel.cancel();
                }
            },
            &cancel,
        )
        .await
        .unwrap();

    assert!(outcome.cancelled);
    assert_eq!(outcome.attempted, 10);
    assert_eq!(outcome.succeeded, 2);
    assert_eq!(outcome.failed, 0);
    assert_eq!(outcome.unprocessed, 8);
    assert_eq!(ticks, vec![1, 2]);
    assert_eq!(executor.state(), ExecutionState::Cancelled);
    assert_eq!(fs::read_dir(temp.path().join("dest")).unwrap().count(), 2);
}

#[tokio::test]
async fn test_delete_with_one_file_already_gone() {
    let temp = TempDir::new().unwrap();
    let mut targets = make_files(temp.path(), 5);
    fs::remove_file(&targets[2].path).unwrap();

    let executor = executor_for(temp.path());
    let outcome = executor
        .execute(
            OperationRequest::delete(targets.clone()),
            |_| {},
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.succeeded, 4);
    assert_eq!(outcome.failed, 1);
    let errors: Vec<_> = outcome.errors().collect();
    assert_eq!(errors[0].kind, ItemErrorKind::NotFound);
    assert_eq!(errors[0].to_string(), "file2.txt: File not found");

    outcome.retain_unsucceeded(&mut targets);
    assert_eq!(targets.len(), 1);
    assert_eq!(targets[0].name.as_str(), "file2.txt");
}

#[tokio::test]
async fn test_move_removes_sources() {
    let temp = TempDir::new().unwrap();
    let src = temp.path().join("src");
    let dest = temp.path().join("dest");
    fs::create_dir_all(&src).unwrap();
    let targets = make_files(&src, 3);

    let executor = executor_for(temp.path());
    let outcome = executor
        .execute(
            OperationRequest::move_to(targets.clone(), &dest),
            |_| {},
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.succeeded, 3);
    for target in &targets {
        assert!(!target.path.exists());
        assert!(dest.join(target.name.as_str()).exists());
    }
}

#[tokio::test]
async fn test_unapproved_destination_is_rejected_before_io() {
    let approved = TempDir::new().unwrap();
    let outside = TempDir::new().unwrap();
    let targets = make_files(approved.path(), 2);
    let dest = outside.path().join("new_folder");

    let executor = executor_for(approved.path());
    let result = executor
        .execute(
            OperationRequest::copy(targets, &dest),
            |_| {},
            &CancellationToken::new(),
        )
        .await;

    match result {
        Err(OpsError::Permission(AccessError::NotApproved { path })) => assert_eq!(path, dest),
        other => panic!("expected NotApproved, got {other:?}"),
    }
    assert!(!dest.exists());
    assert_eq!(executor.state(), ExecutionState::Failed);
}

#[tokio::test]
async fn test_unapproved_target_fails_whole_batch() {
    let approved = TempDir::new().unwrap();
    let outside = TempDir::new().unwrap();
    let mut targets = make_files(approved.path(), 2);
    targets.extend(make_files(outside.path(), 1));

    let executor = executor_for(approved.path());
    let result = executor
        .execute(
            OperationRequest::delete(targets.clone()),
            |_| {},
            &CancellationToken::new(),
        )
        .await;

    assert!(matches!(result, Err(OpsError::Permission(_))));
    assert!(targets.iter().all(|t| t.path.exists()));
}

#[tokio::test]
async fn test_copy_without_destination_is_a_setup_error() {
    let temp = TempDir::new().unwrap();
    let targets = make_files(temp.path(), 1);
    let mut request = OperationRequest::copy(targets, temp.path());
    request.destination = None;

    let executor = executor_for(temp.path());
    let result = executor
        .execute(request, |_| {}, &CancellationToken::new())
        .await;

    assert!(matches!(
        result,
        Err(OpsError::Setup(SetupError::MissingDestination { .. }))
    ));
}

#[tokio::test]
async fn test_start_execute_streams_progress() {
    let temp = TempDir::new().unwrap();
    let targets = make_files(temp.path(), 3);
    let executor = Arc::new(executor_for(temp.path()));

    let mut events = start_execute(
        executor,
        OperationRequest::copy(targets, temp.path().join("out")),
        CancellationToken::new(),
    );

    let mut progress_events = 0;
    let mut outcome = None;
    while let Some(event) = events.recv().await {
        match event {
            OperationEvent::Progress(_) => progress_events += 1,
            OperationEvent::Complete(result) => outcome = Some(result.unwrap()),
        }
    }

    let outcome = outcome.expect("complete event");
    assert_eq!(outcome.succeeded, 3);
    assert_eq!(progress_events, 3);
}

#[cfg(unix)]
#[tokio::test]
async fn test_dot_dot_through_symlink_stays_inside_root() {
    let temp = TempDir::new().unwrap();
    let data = temp.path().join("data");
    let outside = temp.path().join("outside");
    fs::create_dir_all(&data).unwrap();
    fs::create_dir_all(outside.join("inner")).unwrap();
    fs::write(outside.join("victim.txt"), "keep").unwrap();
    std::os::unix::fs::symlink(outside.join("inner"), data.join("link")).unwrap();

    let target = data.join("link").join("..").join("victim.txt");
    let executor = executor_for(&data);
    let outcome = executor
        .execute(
            OperationRequest::delete(vec![record(&target)]),
            |_| {},
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.succeeded, 0);
    assert_eq!(outcome.failed, 1);
    let errors: Vec<_> = outcome.errors().collect();
    assert_eq!(errors[0].kind, ItemErrorKind::NotFound);
    assert_eq!(errors[0].path, data.join("victim.txt"));
    assert_eq!(fs::read_to_string(outside.join("victim.txt")).unwrap(), "keep");
}
