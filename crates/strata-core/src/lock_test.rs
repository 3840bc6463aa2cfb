use super::*;
use crate::process::FixedProbe;
use std::time::SystemTime;
use tempfile::tempdir;

fn manager(dir: &Path, alive: bool) -> LockManager {
    LockManager::in_dir(dir).with_probe(Arc::new(FixedProbe(alive)))
}

fn write_foreign_lock(path: &Path, pid: u32) {
    let record = LockRecord {
        pid,
        timestamp: "2024-02-06T15:30:45.000Z".to_string(),
    };
    fs::write(path, record.render()).unwrap();
}

#[test]
fn test_record_render_and_parse() {
    let record = LockRecord {
        pid: 4242,
        timestamp: "2024-02-06T15:30:45.123Z".to_string(),
    };
    assert_eq!(
        record.render(),
        "PID: 4242\nTimestamp: 2024-02-06T15:30:45.123Z\n"
    );
    assert_eq!(LockRecord::parse(&record.render()), Some(record));
    assert_eq!(LockRecord::parse("garbage"), None);
    assert_eq!(LockRecord::parse(""), None);
}

#[test]
fn test_acquire_writes_own_pid_and_release_removes() {
    let dir = tempdir().unwrap();
    let lock = LockManager::in_dir(&dir.path().join("locks"));

    let guard = lock.acquire().unwrap();
    let content = fs::read_to_string(lock.path()).unwrap();
    let record = LockRecord::parse(&content).unwrap();
    assert_eq!(record.pid, std::process::id());
    assert!(!record.timestamp.is_empty());

    guard.release().unwrap();
    assert!(!lock.path().exists());
}

#[test]
fn test_live_holder_is_rejected() {
    let dir = tempdir().unwrap();
    let lock = manager(dir.path(), true);
    write_foreign_lock(lock.path(), 999_999);

    let err = lock.acquire().unwrap_err();
    assert!(
        matches!(err, CoreError::MigrationAlreadyRunning { pid: 999_999, .. }),
        "unexpected error: {err}"
    );
    // The competing lock is left intact.
    let record = LockRecord::parse(&fs::read_to_string(lock.path()).unwrap()).unwrap();
    assert_eq!(record.pid, 999_999);
}

#[test]
fn test_second_acquire_in_same_process_is_rejected() {
    let dir = tempdir().unwrap();
    let lock = LockManager::in_dir(dir.path());

    let _guard = lock.acquire().unwrap();
    let err = lock.acquire().unwrap_err();
    assert!(matches!(err, CoreError::MigrationAlreadyRunning { .. }));
}

#[test]
fn test_stale_lock_is_replaced() {
    let dir = tempdir().unwrap();
    let lock = manager(dir.path(), false);
    write_foreign_lock(lock.path(), 999_999);

    let guard = lock.acquire().unwrap();
    let record = LockRecord::parse(&fs::read_to_string(lock.path()).unwrap()).unwrap();
    assert_eq!(record.pid, std::process::id());
    drop(guard);
    assert!(!lock.path().exists());

    let leftovers: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
    assert!(leftovers.is_empty(), "stale lock left debris behind");
}

#[test]
fn test_old_unreadable_lock_is_treated_as_stale() {
    let dir = tempdir().unwrap();
    let lock = manager(dir.path(), true);
    fs::write(lock.path(), "not a lock record").unwrap();
    let file = fs::File::options().write(true).open(lock.path()).unwrap();
    file.set_modified(SystemTime::now() - Duration::from_secs(60))
        .unwrap();
    drop(file);

    let _guard = lock.acquire().unwrap();
    let record = LockRecord::parse(&fs::read_to_string(lock.path()).unwrap()).unwrap();
    assert_eq!(record.pid, std::process::id());
}

#[test]
fn test_release_without_lock_is_ok() {
    let dir = tempdir().unwrap();
    let lock = LockManager::in_dir(dir.path());
    lock.release().unwrap();
    lock.release().unwrap();
}

#[test]
fn test_release_leaves_foreign_lock() {
    let dir = tempdir().unwrap();
    let lock = manager(dir.path(), true);
    write_foreign_lock(lock.path(), 999_999);

    lock.release().unwrap();
    assert!(lock.path().exists());
}

#[test]
fn test_guard_drop_releases() {
    let dir = tempdir().unwrap();
    let lock = LockManager::in_dir(dir.path());
    {
        let _guard = lock.acquire().unwrap();
        assert!(lock.path().exists());
    }
    assert!(!lock.path().exists());
}

#[test]
fn test_holder_reports_liveness() {
    let dir = tempdir().unwrap();
    let lock = manager(dir.path(), false);
    assert_eq!(lock.holder().unwrap(), None);

    write_foreign_lock(lock.path(), 12345);
    let holder = lock.holder().unwrap().unwrap();
    assert_eq!(holder.record.pid, 12345);
    assert!(!holder.alive);
}

#[test]
fn test_clear_respects_live_holder_unless_forced() {
    let dir = tempdir().unwrap();
    let lock = manager(dir.path(), true);
    assert_eq!(lock.clear(false).unwrap(), ClearOutcome::NotLocked);

    write_foreign_lock(lock.path(), 12345);
    assert!(matches!(
        lock.clear(false).unwrap(),
        ClearOutcome::HolderAlive(LockRecord { pid: 12345, .. })
    ));
    assert!(lock.path().exists());

    assert!(matches!(
        lock.clear(true).unwrap(),
        ClearOutcome::Removed(Some(LockRecord { pid: 12345, .. }))
    ));
    assert!(!lock.path().exists());
}

#[test]
fn test_clear_removes_stale_lock() {
    let dir = tempdir().unwrap();
    let lock = manager(dir.path(), false);
    write_foreign_lock(lock.path(), 12345);

    assert!(matches!(
        lock.clear(false).unwrap(),
        ClearOutcome::Removed(Some(_))
    ));
    assert!(!lock.path().exists());
}

#[test]
fn test_restore_puts_back_moved_lock() {
    let dir = tempdir().unwrap();
    let lock = manager(dir.path(), true);
    let aside = dir.path().join("migrate.lock.stale-1");
    write_foreign_lock(&aside, 4242);
    let moved = fs::read_to_string(&aside).unwrap();

    lock.restore(&aside, &moved).unwrap();

    assert!(!aside.exists());
    assert_eq!(fs::read_to_string(lock.path()).unwrap(), moved);
}

#[test]
fn test_restore_keeps_moved_lock_when_path_was_retaken() {
    let dir = tempdir().unwrap();
    let lock = manager(dir.path(), true);
    let aside = dir.path().join("migrate.lock.stale-1");
    write_foreign_lock(&aside, 4242);
    write_foreign_lock(lock.path(), 5151);
    let moved = fs::read_to_string(&aside).unwrap();

    lock.restore(&aside, &moved).unwrap();

    assert_eq!(fs::read_to_string(&aside).unwrap(), moved);
    let holder = LockRecord::parse(&fs::read_to_string(lock.path()).unwrap()).unwrap();
    assert_eq!(holder.pid, 5151);
}
