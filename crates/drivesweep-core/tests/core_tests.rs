use drivesweep_core::{
    AccessError, ApprovalSandbox, Drive, DriveKind, SearchCriteria, SearchOptions,
};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

#[test]
fn test_sandbox_with_real_directories() {
    let temp = TempDir::new().unwrap();
    let approved = temp.path().join("approved");
    let outside = temp.path().join("outside");
    std::fs::create_dir(&approved).unwrap();
    std::fs::create_dir(&outside).unwrap();

    let sandbox = ApprovalSandbox::new();
    assert!(sandbox.approve(&approved).unwrap());

    assert!(sandbox.is_approved(approved.join("song.mp3")));
    assert!(!sandbox.is_approved(outside.join("song.mp3")));
    assert!(!sandbox.is_approved(approved.join("../outside/song.mp3")));
}

#[test]
fn test_approving_twice_matches_approving_once() {
    let once = ApprovalSandbox::new();
    once.approve("/data").unwrap();

    let twice = ApprovalSandbox::new();
    twice.approve("/data").unwrap();
    twice.approve("/data").unwrap();

    assert_eq!(once.list_approved_roots(), twice.list_approved_roots());
}

#[test]
fn test_rejected_path_is_reported() {
    let sandbox = ApprovalSandbox::with_roots(["/data"]).unwrap();
    match sandbox.check("/home/user/secret.txt") {
        Err(AccessError::NotApproved { path }) => {
            assert_eq!(path, PathBuf::from("/home/user/secret.txt"));
        }
        other => panic!("expected NotApproved, got {other:?}"),
    }
}

#[test]
fn test_concurrent_readers_and_writer() {
    let sandbox = Arc::new(ApprovalSandbox::with_roots(["/data"]).unwrap());

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let sandbox = Arc::clone(&sandbox);
            std::thread::spawn(move || {
                sandbox.approve(format!("/media/disk{i}")).unwrap();
                for _ in 0..100 {
                    assert!(sandbox.is_approved("/data/file.txt"));
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(sandbox.len(), 5);
}

#[test]
fn test_approve_all_skips_unavailable_drives() {
    let drive = |root: &str, available| Drive {
        root: PathBuf::from(root),
        label: root.to_string(),
        kind: DriveKind::Fixed,
        file_system: "ext4".to_string(),
        total_bytes: 0,
        free_bytes: 0,
        available,
    };
    let drives = vec![drive("/mnt/a", true), drive("/mnt/b", false), drive("/mnt/a", true)];

    let sandbox = ApprovalSandbox::new();
    assert_eq!(sandbox.approve_all(&drives), 1);
    assert!(sandbox.is_approved("/mnt/a/x"));
    assert!(!sandbox.is_approved("/mnt/b/x"));
}

#[test]
fn test_criteria_scope_and_subfolders() {
    let criteria = SearchCriteria::builder()
        .extensions(["txt"])
        .extensions([".md"])
        .build()
        .unwrap();

    assert!(criteria.scope.is_none());
    assert!(criteria.include_subfolders);
    assert!(criteria.matches_extension("MD"));
    assert!(criteria.matches_extension(".txt"));
}

#[test]
fn test_options_builder() {
    let options = SearchOptions::builder()
        .follow_symlinks(true)
        .max_depth(Some(8usize))
        .include_hidden(false)
        .exclude_patterns(vec!["node_modules".to_string(), "*.cache".to_string()])
        .build()
        .unwrap();

    assert!(options.follow_symlinks);
    assert_eq!(options.effective_max_depth(), 8);
    let set = options.exclusion_set().unwrap();
    assert!(set.is_match("node_modules"));
    assert!(set.is_match("thumbs.CACHE"));
}
