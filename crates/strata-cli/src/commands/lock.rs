//! Lock command implementation

use anyhow::{bail, Context, Result};
use strata_core::lock::ClearOutcome;
use strata_core::LockManager;

use crate::cli::{GlobalArgs, LockArgs, LockCommand};
use crate::commands::common::load_config;

/// Execute the lock command
pub async fn execute(args: &LockArgs, global: &GlobalArgs) -> Result<()> {
    let config = load_config(global)?;
    let lock = LockManager::new(config.paths().lock_file);

    match &args.command {
        LockCommand::Status => {
            match lock.holder().context("Failed to read migration lock")? {
                None if lock.path().exists() => {
                    println!("Lock file {} is unreadable", lock.path().display())
                }
                None => println!("Not locked ({})", lock.path().display()),
                Some(holder) => println!(
                    "Locked by PID {} since {} ({})",
                    holder.record.pid,
                    holder.record.timestamp,
                    if holder.alive { "running" } else { "stale" }
                ),
            }
            Ok(())
        }
        LockCommand::Clear { force } => {
            match lock.clear(*force).context("Failed to clear migration lock")? {
                ClearOutcome::NotLocked => println!("Not locked"),
                ClearOutcome::Removed(Some(record)) => {
                    println!("Removed lock held by PID {}", record.pid)
                }
                ClearOutcome::Removed(None) => println!("Removed unreadable lock file"),
                ClearOutcome::HolderAlive(record) => bail!(
                    "Lock is held by running PID {}; use --force to remove it anyway",
                    record.pid
                ),
            }
            Ok(())
        }
    }
}
