//! CLI argument definitions using clap derive API

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use strata_core::MigrationStatus;
use strata_exec::Phase;

/// strata - tracked, rollback-capable system migrations
#[derive(Parser, Debug)]
#[command(name = "strata")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all commands
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file (default: $STRATA_CONFIG, then /etc/strata/strata.yml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the migrations root
    #[arg(long, global = true, env = "STRATA_MIGRATIONS_DIR")]
    pub migrations_dir: Option<PathBuf>,

    /// Override the rollback quarantine root
    #[arg(long, global = true, env = "STRATA_ROLLBACK_DIR")]
    pub rollback_dir: Option<PathBuf>,

    /// Override the lock root
    #[arg(long, global = true, env = "STRATA_LOCK_DIR")]
    pub lock_dir: Option<PathBuf>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Apply a migration: install, run, optional ready check, rollback on failure
    Migrate(MigrateArgs),

    /// List recorded migrations
    Ls(LsArgs),

    /// Show captured phase output of a migration's latest attempt
    Logs(LogsArgs),

    /// Inspect or clear the migration lock
    Lock(LockArgs),

    /// Show the current mount table
    Mounts(MountsArgs),
}

/// Arguments for the migrate command
#[derive(Args, Debug, Clone)]
pub struct MigrateArgs {
    /// Migration label; must not already be applied
    #[arg(short, long)]
    pub name: String,

    /// Install phase script
    #[arg(long)]
    pub install: PathBuf,

    /// Run phase script
    #[arg(long)]
    pub run: PathBuf,

    /// Ready check script, run after the run phase
    #[arg(long)]
    pub ready: Option<PathBuf>,

    /// Rollback script, run when any phase fails
    #[arg(long)]
    pub rollback: Option<PathBuf>,
}

/// Arguments for the ls command
#[derive(Args, Debug, Clone)]
pub struct LsArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub output: OutputFormat,

    /// Only show migrations with this status
    #[arg(short, long, value_enum)]
    pub status: Option<StatusFilter>,
}

/// Table or JSON output
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Table format
    Table,
    /// JSON output
    Json,
}

/// Status filter for ls
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter {
    Pending,
    Applied,
    Failed,
    Rolledback,
}

impl From<StatusFilter> for MigrationStatus {
    fn from(filter: StatusFilter) -> Self {
        match filter {
            StatusFilter::Pending => MigrationStatus::Pending,
            StatusFilter::Applied => MigrationStatus::Applied,
            StatusFilter::Failed => MigrationStatus::Failed,
            StatusFilter::Rolledback => MigrationStatus::RolledBack,
        }
    }
}

/// Arguments for the logs command
#[derive(Args, Debug, Clone)]
pub struct LogsArgs {
    /// Migration name
    pub name: String,

    /// Only show this phase
    #[arg(short, long, value_enum)]
    pub phase: Option<PhaseFilter>,
}

/// Phase filter for logs
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseFilter {
    Install,
    Run,
    Ready,
    Rollback,
}

impl From<PhaseFilter> for Phase {
    fn from(filter: PhaseFilter) -> Self {
        match filter {
            PhaseFilter::Install => Phase::Install,
            PhaseFilter::Run => Phase::Run,
            PhaseFilter::Ready => Phase::Ready,
            PhaseFilter::Rollback => Phase::Rollback,
        }
    }
}

/// Arguments for the lock command
#[derive(Args, Debug, Clone)]
pub struct LockArgs {
    #[command(subcommand)]
    pub command: LockCommand,
}

/// Lock subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum LockCommand {
    /// Show the lock holder and whether it is alive
    Status,

    /// Remove a stale lock
    Clear {
        /// Remove the lock even if its holder is alive
        #[arg(long)]
        force: bool,
    },
}

/// Arguments for the mounts command
#[derive(Args, Debug, Clone)]
pub struct MountsArgs {
    /// Only show mounts of this filesystem type (e.g. overlay)
    #[arg(short = 't', long)]
    pub fstype: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub output: OutputFormat,
}

#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;
