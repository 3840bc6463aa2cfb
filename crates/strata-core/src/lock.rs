//! Exclusive, PID-stamped advisory lock for the migration subsystem.
//!
//! The lock is a single file created with create-if-absent semantics. Its body
//! is `PID: <n>\nTimestamp: <iso8601>\n`. A lock whose holder process no longer
//! exists is stale and is removed before acquisition is retried.

use chrono::{SecondsFormat, Utc};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::error::{CoreError, CoreResult};
use crate::process::{ProcProbe, ProcessProbe};

/// File name of the lock inside the lock root
pub const LOCK_FILE: &str = "migrate.lock";

/// Upper bound on create/stale-removal rounds before giving up
const MAX_ATTEMPTS: u32 = 16;

/// An unreadable lock younger than this is assumed to be mid-write
const WRITE_GRACE: Duration = Duration::from_secs(1);

const WRITE_GRACE_POLL: Duration = Duration::from_millis(20);

/// Contents of the lock file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockRecord {
    pub pid: u32,
    pub timestamp: String,
}

impl LockRecord {
    /// Record for the given holder, stamped now
    pub fn now(pid: u32) -> Self {
        Self {
            pid,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    /// Serialize to the on-disk form
    pub fn render(&self) -> String {
        format!("PID: {}\nTimestamp: {}\n", self.pid, self.timestamp)
    }

    /// Parse the on-disk form; `None` if no valid PID line is present.
    pub fn parse(content: &str) -> Option<Self> {
        let mut pid = None;
        let mut timestamp = String::new();
        for line in content.lines() {
            if let Some(rest) = line.strip_prefix("PID:") {
                pid = rest.trim().parse::<u32>().ok();
            } else if let Some(rest) = line.strip_prefix("Timestamp:") {
                timestamp = rest.trim().to_string();
            }
        }
        pid.map(|pid| Self { pid, timestamp })
    }
}

/// Current lock holder as seen by an observer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockHolder {
    pub record: LockRecord,
    pub alive: bool,
}

/// Outcome of [`LockManager::clear`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClearOutcome {
    /// There was no lock file
    NotLocked,
    /// The lock file was removed
    Removed(Option<LockRecord>),
    /// The holder is alive and `force` was not given
    HolderAlive(LockRecord),
}

/// Acquires and releases the migration lock
#[derive(Clone)]
pub struct LockManager {
    path: PathBuf,
    pid: u32,
    probe: Arc<dyn ProcessProbe>,
}

impl std::fmt::Debug for LockManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockManager")
            .field("path", &self.path)
            .field("pid", &self.pid)
            .finish()
    }
}

impl LockManager {
    /// Lock at `path`, held on behalf of the current process
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            pid: std::process::id(),
            probe: Arc::new(ProcProbe),
        }
    }

    /// Lock at `<lock_dir>/migrate.lock`
    pub fn in_dir(lock_dir: &Path) -> Self {
        Self::new(lock_dir.join(LOCK_FILE))
    }

    /// Replace the liveness probe
    pub fn with_probe(mut self, probe: Arc<dyn ProcessProbe>) -> Self {
        self.probe = probe;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Acquire the lock, removing stale locks left by dead processes.
    ///
    /// Fails with [`CoreError::MigrationAlreadyRunning`] when a live process
    /// holds the lock. That case is never retried. May sleep briefly while
    /// another process is still writing its lock, so async callers should run
    /// it on a blocking thread.
    pub fn acquire(&self) -> CoreResult<LockGuard> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| CoreError::io(parent, e))?;
        }

        for attempt in 1..=MAX_ATTEMPTS {
            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&self.path)
            {
                Ok(mut file) => {
                    let record = LockRecord::now(self.pid);
                    if let Err(e) = file
                        .write_all(record.render().as_bytes())
                        .and_then(|_| file.sync_all())
                    {
                        let _ = fs::remove_file(&self.path);
                        return Err(CoreError::io(&self.path, e));
                    }
                    log::info!(
                        "Acquired migration lock at {} (PID {})",
                        self.path.display(),
                        self.pid
                    );
                    return Ok(LockGuard {
                        manager: self.clone(),
                        released: false,
                    });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    self.handle_existing(attempt)?;
                }
                Err(e) => return Err(CoreError::io(&self.path, e)),
            }
        }

        Err(CoreError::LockRetriesExhausted {
            path: self.path.display().to_string(),
            attempts: MAX_ATTEMPTS,
        })
    }

    /// Inspect an existing lock file: fail on a live holder, clear a stale one.
    fn handle_existing(&self, attempt: u32) -> CoreResult<()> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            // Vanished between create and read; retry.
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(CoreError::io(&self.path, e)),
        };

        match LockRecord::parse(&content) {
            Some(record) if self.probe.is_alive(record.pid) => {
                Err(CoreError::MigrationAlreadyRunning {
                    pid: record.pid,
                    path: self.path.display().to_string(),
                })
            }
            Some(record) => {
                log::warn!(
                    "Removing stale migration lock held by dead PID {} since {} (attempt {})",
                    record.pid,
                    record.timestamp,
                    attempt
                );
                self.remove_stale(&content)
            }
            None if self.recently_modified() => {
                std::thread::sleep(WRITE_GRACE_POLL);
                Ok(())
            }
            None => {
                log::warn!(
                    "Removing unreadable migration lock at {}",
                    self.path.display()
                );
                self.remove_stale(&content)
            }
        }
    }

    fn recently_modified(&self) -> bool {
        fs::metadata(&self.path)
            .and_then(|m| m.modified())
            .ok()
            .and_then(|modified| modified.elapsed().ok())
            .is_some_and(|age| age < WRITE_GRACE)
    }

    /// Remove a lock judged stale from `observed` contents.
    ///
    /// The file is first renamed aside so that a fresh lock created by a
    /// competing process in the meantime is detected and put back.
    fn remove_stale(&self, observed: &str) -> CoreResult<()> {
        let aside = self
            .path
            .with_extension(format!("lock.stale-{}", self.pid));
        match fs::rename(&self.path, &aside) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(CoreError::io(&self.path, e)),
        }

        let moved = fs::read_to_string(&aside).unwrap_or_default();
        if moved != observed {
            return self.restore(&aside, &moved);
        }
        fs::remove_file(&aside).map_err(|e| CoreError::io(&aside, e))
    }

    /// Put back a fresh lock that was moved aside by mistake.
    ///
    /// If yet another lock appeared at the path meanwhile, both claimants
    /// believe they hold the lock. The moved file is then kept next to the
    /// lock so the conflict stays visible to the operator.
    fn restore(&self, aside: &Path, moved: &str) -> CoreResult<()> {
        match fs::hard_link(aside, &self.path) {
            Ok(()) => fs::remove_file(aside).map_err(|e| CoreError::io(aside, e)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                log::error!(
                    "Competing migration locks: {} was taken while the lock of {} was being restored; kept at {}",
                    self.path.display(),
                    LockRecord::parse(moved)
                        .map_or_else(|| "an unknown holder".to_string(), |r| format!("PID {}", r.pid)),
                    aside.display()
                );
                Ok(())
            }
            Err(e) => Err(CoreError::io(&self.path, e)),
        }
    }

    /// Release the lock held by this process.
    ///
    /// Safe to call when no lock is held: that only logs a warning. A lock
    /// owned by a different PID is left untouched.
    pub fn release(&self) -> CoreResult<()> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::warn!(
                    "Release requested but no migration lock exists at {}",
                    self.path.display()
                );
                return Ok(());
            }
            Err(e) => return Err(CoreError::io(&self.path, e)),
        };

        if let Some(record) = LockRecord::parse(&content) {
            if record.pid != self.pid {
                log::warn!(
                    "Migration lock at {} belongs to PID {}, not releasing",
                    self.path.display(),
                    record.pid
                );
                return Ok(());
            }
        }

        match fs::remove_file(&self.path) {
            Ok(()) => {
                log::info!("Released migration lock at {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::warn!(
                    "Migration lock at {} vanished before release",
                    self.path.display()
                );
                Ok(())
            }
            Err(e) => Err(CoreError::io(&self.path, e)),
        }
    }

    /// Read the current holder without acquiring.
    pub fn holder(&self) -> CoreResult<Option<LockHolder>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(CoreError::io(&self.path, e)),
        };

        Ok(LockRecord::parse(&content).map(|record| LockHolder {
            alive: self.probe.is_alive(record.pid),
            record,
        }))
    }

    /// Remove a lock whose holder is dead, or any lock with `force`.
    pub fn clear(&self, force: bool) -> CoreResult<ClearOutcome> {
        if !self.path.exists() {
            return Ok(ClearOutcome::NotLocked);
        }

        let holder = self.holder()?;
        if let Some(LockHolder {
            record,
            alive: true,
        }) = &holder
        {
            if !force {
                return Ok(ClearOutcome::HolderAlive(record.clone()));
            }
            log::warn!("Force-removing migration lock held by live PID {}", record.pid);
        }

        match fs::remove_file(&self.path) {
            Ok(()) => Ok(ClearOutcome::Removed(holder.map(|h| h.record))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(ClearOutcome::NotLocked),
            Err(e) => Err(CoreError::io(&self.path, e)),
        }
    }
}

/// Held migration lock; released on drop if not released explicitly
#[derive(Debug)]
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct LockGuard {
    manager: LockManager,
    released: bool,
}

impl LockGuard {
    /// Release now, surfacing any IO error.
    pub fn release(mut self) -> CoreResult<()> {
        self.released = true;
        self.manager.release()
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = self.manager.release() {
            log::warn!("Failed to release migration lock: {}", e);
        }
    }
}

#[cfg(test)]
#[path = "lock_test.rs"]
mod tests;
