use cardpress_core::error::{DeployError, LockHolder, StagingError};
use cardpress_core::staging::{DeployLock, StagingArea, ASSETS_DIR};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn prepare_starts_from_empty_tree_with_assets() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("deploy");
    fs::create_dir_all(root.join("OLD")).unwrap();
    fs::write(root.join("OLD").join("index.html"), "stale").unwrap();
    fs::write(root.join("leftover.txt"), "stale").unwrap();

    let area = StagingArea::prepare(&root).unwrap();
    assert_eq!(area.root(), root.as_path());
    assert_eq!(entries(&root), [ASSETS_DIR]);
    assert!(entries(&area.assets_dir()).is_empty());
    assert_eq!(area.record_dir("E001"), root.join("E001"));
}

#[test]
fn prepare_creates_missing_parents() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("a").join("b").join("deploy");
    let area = StagingArea::prepare(&root).unwrap();
    assert!(area.assets_dir().is_dir());
}

#[test]
fn lock_file_sits_next_to_staging_dir() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("deploy");
    assert_eq!(DeployLock::lock_path(&root).unwrap(), tmp.path().join("deploy.lock"));

    let _area = StagingArea::prepare(&root).unwrap();
    assert!(tmp.path().join("deploy.lock").is_file());
}

#[test]
fn second_prepare_on_same_path_is_rejected() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("deploy");
    let first = StagingArea::prepare(&root).unwrap();
    fs::write(first.assets_dir().join("logo.svg"), "<svg/>").unwrap();

    let err = StagingArea::prepare(&root).unwrap_err();
    assert!(matches!(err, StagingError::Locked { .. }));
    assert!(matches!(DeployError::from(err), DeployError::InProgress { .. }));
    // The running deployment's tree is untouched.
    assert!(first.assets_dir().join("logo.svg").is_file());
}

#[test]
fn cleanup_removes_tree_and_releases_lock() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("deploy");
    let area = StagingArea::prepare(&root).unwrap();
    fs::write(area.assets_dir().join("x.jpg"), b"jpg").unwrap();

    area.cleanup().unwrap();
    assert!(!root.exists());
    assert!(!tmp.path().join("deploy.lock").exists());

    // Lock is free again.
    StagingArea::prepare(&root).unwrap().cleanup().unwrap();
}

#[test]
fn drop_cleans_up_on_early_exit() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("deploy");

    fn failing_run(root: &Path) -> Result<(), String> {
        let area = StagingArea::prepare(root).map_err(|e| e.to_string())?;
        fs::create_dir(area.record_dir("E001")).map_err(|e| e.to_string())?;
        Err("generation blew up".into())
    }

    assert!(failing_run(&root).is_err());
    assert!(!root.exists());
    assert!(!tmp.path().join("deploy.lock").exists());
}

#[test]
fn explicit_lock_blocks_staging() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("deploy");
    let lock = DeployLock::acquire(&root).unwrap();
    assert!(lock.path().is_file());
    assert!(matches!(StagingArea::prepare(&root), Err(StagingError::Locked { .. })));
    assert!(!root.exists());

    drop(lock);
    assert!(StagingArea::prepare(&root).is_ok());
}

#[test]
fn locked_error_names_the_holder_pid() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("deploy");
    let _held = DeployLock::acquire(&root).unwrap();
    let pid = std::process::id();

    let err = StagingArea::prepare(&root).unwrap_err();
    match &err {
        StagingError::Locked { holder, .. } => assert_eq!(holder, &LockHolder(Some(pid))),
        other => panic!("unexpected error {other:?}"),
    }
    let message = DeployError::from(err).to_string();
    assert!(message.contains(&format!("held by pid {pid}")), "{message}");
    assert!(message.contains("deploy.lock"), "{message}");
}

#[test]
fn unreadable_lock_contents_leave_holder_unknown() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("deploy");
    fs::write(tmp.path().join("deploy.lock"), "").unwrap();

    assert_eq!(DeployLock::holder(&tmp.path().join("deploy.lock")), LockHolder(None));
    let message = StagingArea::prepare(&root).unwrap_err().to_string();
    assert!(message.contains("holder unknown"), "{message}");
}

#[test]
fn root_without_file_name_is_invalid() {
    let err = DeployLock::lock_path(Path::new("/")).unwrap_err();
    assert!(matches!(err, StagingError::InvalidRoot(_)));
}
