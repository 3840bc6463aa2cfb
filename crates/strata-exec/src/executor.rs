//! Phase script execution.
//!
//! Scripts run as child processes with stdin closed. stdout and stderr share
//! a single handle on `<phase>_output.log` inside the migration directory, so
//! the log holds the interleaved combined output and exists even when the
//! script fails or this process dies mid-phase.

use async_trait::async_trait;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use crate::error::{MigrationError, MigrationResult};
use crate::phase::Phase;

/// One script to run for one phase
#[derive(Debug, Clone, Copy)]
pub struct ScriptInvocation<'a> {
    pub phase: Phase,
    pub script: &'a Path,
    /// Directory receiving the output log
    pub migration_dir: &'a Path,
    /// Extra environment variables for the child
    pub env: &'a [(String, String)],
}

/// Result of running one phase script
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseOutcome {
    pub phase: Phase,
    pub success: bool,
    /// `None` when the script could not start or was killed by a signal
    pub exit_code: Option<i32>,
    /// Combined stdout and stderr
    pub output: String,
    pub log_path: PathBuf,
}

/// Runs phase scripts.
///
/// A non-zero exit is reported through [`PhaseOutcome::success`], never as an
/// error. Errors are reserved for failures to persist the output log.
#[async_trait]
pub trait ScriptExecutor: Send + Sync {
    async fn execute(&self, invocation: ScriptInvocation<'_>) -> MigrationResult<PhaseOutcome>;
}

/// Executes scripts as child processes, optionally through an interpreter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellExecutor {
    interpreter: Option<String>,
}

impl ShellExecutor {
    /// `interpreter` of `None` executes the script file directly
    pub fn new(interpreter: Option<String>) -> Self {
        Self { interpreter }
    }

    fn command(&self, script: &Path) -> tokio::process::Command {
        match &self.interpreter {
            Some(interpreter) => {
                let mut cmd = tokio::process::Command::new(interpreter);
                cmd.arg(script);
                cmd
            }
            None => tokio::process::Command::new(script),
        }
    }
}

impl Default for ShellExecutor {
    fn default() -> Self {
        Self::new(Some("sh".to_string()))
    }
}

#[async_trait]
impl ScriptExecutor for ShellExecutor {
    async fn execute(&self, invocation: ScriptInvocation<'_>) -> MigrationResult<PhaseOutcome> {
        let ScriptInvocation {
            phase,
            script,
            migration_dir,
            env,
        } = invocation;

        let log_path = migration_dir.join(phase.log_file_name());
        let stdout =
            File::create(&log_path).map_err(|e| MigrationError::io("create", &log_path, e))?;
        let stderr = stdout
            .try_clone()
            .map_err(|e| MigrationError::io("open", &log_path, e))?;

        log::info!("Running {} script {}", phase, script.display());

        let status = self
            .command(script)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr))
            .envs(env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .kill_on_drop(true)
            .status()
            .await;

        let (success, exit_code) = match status {
            Ok(status) => (status.success(), status.code()),
            Err(e) => {
                append_log(
                    &log_path,
                    &format!("strata: failed to start {}: {}\n", script.display(), e),
                )?;
                (false, None)
            }
        };

        let output = read_log(&log_path)?;

        if success {
            log::info!("{} script succeeded", phase);
        } else {
            log::warn!(
                "{} script failed ({}); output in {}",
                phase,
                describe_exit(exit_code),
                log_path.display()
            );
        }

        Ok(PhaseOutcome {
            phase,
            success,
            exit_code,
            output,
            log_path,
        })
    }
}

/// Human-readable exit description
pub fn describe_exit(exit_code: Option<i32>) -> String {
    match exit_code {
        Some(code) => format!("exit code {}", code),
        None => "no exit code".to_string(),
    }
}

fn append_log(path: &Path, text: &str) -> MigrationResult<()> {
    let mut file = OpenOptions::new()
        .append(true)
        .open(path)
        .map_err(|e| MigrationError::io("open", path, e))?;
    file.write_all(text.as_bytes())
        .map_err(|e| MigrationError::io("write", path, e))
}

fn read_log(path: &Path) -> MigrationResult<String> {
    let bytes = fs::read(path).map_err(|e| MigrationError::io("read", path, e))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
#[path = "executor_test.rs"]
mod tests;
