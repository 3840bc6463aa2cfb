//! Error types for strata-exec

use strata_core::CoreError;
use thiserror::Error;

use crate::phase::Phase;

/// Migration failures, tagged by cause
#[derive(Error, Debug)]
pub enum MigrationError {
    /// M001: Malformed or incomplete request
    #[error("[M001] Invalid migration request: {0}")]
    Validation(String),

    /// M002: A supplied script path does not exist
    #[error("[M002] {phase} script not found: {path}")]
    ScriptNotFound { phase: Phase, path: String },

    /// M003: A record with this name already reached `applied`
    #[error("[M003] Migration '{name}' has already been applied")]
    AlreadyApplied { name: String },

    /// M004: The attempt directory already exists
    #[error("[M004] Migration directory already exists: {path}")]
    MigrationDirExists { path: String },

    /// M005: A phase script exited unsuccessfully
    #[error("[M005] {}", phase.failure_reason())]
    PhaseFailed { phase: Phase, output: String },

    /// M006: Filesystem operation failed
    #[error("[M006] Failed to {action} '{path}': {source}")]
    Io {
        action: &'static str,
        path: String,
        source: std::io::Error,
    },

    /// M007: The blocking lock acquisition task did not complete
    #[error("[M007] Lock acquisition task failed: {0}")]
    LockTask(#[from] tokio::task::JoinError),

    /// Lock, metadata or configuration error
    #[error(transparent)]
    Core(#[from] CoreError),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MigrationError {
    pub(crate) fn io(action: &'static str, path: &std::path::Path, source: std::io::Error) -> Self {
        MigrationError::Io {
            action,
            path: path.display().to_string(),
            source,
        }
    }

    /// The failed phase, for phase failures
    pub fn phase(&self) -> Option<Phase> {
        match self {
            MigrationError::PhaseFailed { phase, .. } => Some(*phase),
            _ => None,
        }
    }
}

/// Result type alias for MigrationError
pub type MigrationResult<T> = Result<T, MigrationError>;
