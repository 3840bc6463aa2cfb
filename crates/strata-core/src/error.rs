//! Error types for strata-core

use thiserror::Error;

/// Core error type for strata
#[derive(Error, Debug)]
pub enum CoreError {
    /// S001: Configuration file not found
    #[error("[S001] Config file not found: {path}")]
    ConfigNotFound { path: String },

    /// S002: Failed to parse configuration file
    #[error("[S002] Failed to parse config {path}: {message}")]
    ConfigParseError { path: String, message: String },

    /// S003: Invalid migration name
    #[error("[S003] Invalid migration name '{name}': {reason}")]
    InvalidMigrationName { name: String, reason: String },

    /// S004: Another live process holds the migration lock
    #[error("[S004] Migration already running (PID {pid}, lock file {path})")]
    MigrationAlreadyRunning { pid: u32, path: String },

    /// S005: Lock acquisition kept racing with other processes
    #[error("[S005] Could not acquire migration lock at {path} after {attempts} attempts")]
    LockRetriesExhausted { path: String, attempts: u32 },

    /// S006: Metadata file exists but could not be parsed
    #[error("[S006] Corrupt migration metadata in {path}: {source}")]
    MetadataCorrupt {
        path: String,
        source: serde_json::Error,
    },

    /// S007: Migration record missing from metadata
    #[error("[S007] No migration record for {timestamp}_{name}")]
    MigrationNotFound { timestamp: String, name: String },

    /// S008: IO error
    #[error("[S008] IO error: {0}")]
    Io(#[from] std::io::Error),

    /// S009: IO error with file path context
    #[error("[S009] Failed to access '{path}': {source}")]
    IoWithPath {
        path: String,
        source: std::io::Error,
    },

    /// S010: A record for this attempt already exists
    #[error("[S010] Migration record {timestamp}_{name} already exists")]
    DuplicateMigration { timestamp: String, name: String },

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    /// Wrap an IO error with the path it concerns.
    pub fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        CoreError::IoWithPath {
            path: path.display().to_string(),
            source,
        }
    }
}

/// Result type alias for CoreError
pub type CoreResult<T> = Result<T, CoreError>;
