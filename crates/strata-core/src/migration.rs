//! Migration records and the metadata document that tracks them.
//!
//! The JSON shape (camelCase keys, `lastApplied` at the top level) is shared
//! with any other tool reading `metadata.json`, so field names must not drift.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CoreError, CoreResult};

/// `strftime` format of migration timestamps (`20240206-153045`)
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

/// Format an instant as a sortable migration timestamp.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Directory name of one migration attempt: `<timestamp>_<name>`.
pub fn migration_dir_name(timestamp: &str, name: &str) -> String {
    format!("{}_{}", timestamp, name)
}

/// Lifecycle status of a migration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MigrationStatus {
    /// Attempt recorded, phases not finished
    Pending,
    /// All phases succeeded
    Applied,
    /// A phase failed
    Failed,
    /// A phase failed and the rollback script was executed
    #[serde(rename = "rolledback")]
    RolledBack,
}

impl fmt::Display for MigrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MigrationStatus::Pending => write!(f, "pending"),
            MigrationStatus::Applied => write!(f, "applied"),
            MigrationStatus::Failed => write!(f, "failed"),
            MigrationStatus::RolledBack => write!(f, "rolledback"),
        }
    }
}

/// One attempted system change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Migration {
    /// Creation time, `YYYYMMDD-HHMMSS`
    pub timestamp: String,

    /// Operator-supplied label
    pub name: String,

    pub status: MigrationStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applied_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rolled_back_at: Option<DateTime<Utc>>,

    /// Phase-qualified failure description including captured output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rollback_reason: Option<String>,
}

impl Migration {
    /// A freshly attempted migration
    pub fn pending(timestamp: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            timestamp: timestamp.into(),
            name: name.into(),
            status: MigrationStatus::Pending,
            applied_at: None,
            failed_at: None,
            rolled_back_at: None,
            error: None,
            rollback_reason: None,
        }
    }

    /// Directory name of this attempt
    pub fn dir_name(&self) -> String {
        migration_dir_name(&self.timestamp, &self.name)
    }

    fn matches(&self, timestamp: &str, name: &str) -> bool {
        self.timestamp == timestamp && self.name == name
    }
}

/// The full collection of migration records
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationMetadata {
    /// Records in insertion (chronological) order
    #[serde(default)]
    pub migrations: Vec<Migration>,

    /// Timestamp of the most recently applied migration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_applied: Option<String>,
}

impl MigrationMetadata {
    /// Whether a migration with this name has been successfully applied
    pub fn is_applied(&self, name: &str) -> bool {
        self.migrations
            .iter()
            .any(|m| m.name == name && m.status == MigrationStatus::Applied)
    }

    /// Most recent attempt of a migration name
    pub fn latest(&self, name: &str) -> Option<&Migration> {
        self.migrations.iter().rev().find(|m| m.name == name)
    }

    /// Look up the record for one attempt
    pub fn find(&self, timestamp: &str, name: &str) -> Option<&Migration> {
        self.migrations.iter().find(|m| m.matches(timestamp, name))
    }

    fn find_mut(&mut self, timestamp: &str, name: &str) -> CoreResult<&mut Migration> {
        self.migrations
            .iter_mut()
            .find(|m| m.matches(timestamp, name))
            .ok_or_else(|| CoreError::MigrationNotFound {
                timestamp: timestamp.to_string(),
                name: name.to_string(),
            })
    }

    /// Append a new `pending` record.
    ///
    /// Fails if the `{timestamp, name}` pair is already recorded; earlier
    /// attempts are never reused.
    pub fn push_pending(&mut self, timestamp: &str, name: &str) -> CoreResult<&Migration> {
        if self.find(timestamp, name).is_some() {
            return Err(CoreError::DuplicateMigration {
                timestamp: timestamp.to_string(),
                name: name.to_string(),
            });
        }
        self.migrations.push(Migration::pending(timestamp, name));
        Ok(&self.migrations[self.migrations.len() - 1])
    }

    /// Record a successful application and advance `lastApplied`.
    pub fn mark_applied(
        &mut self,
        timestamp: &str,
        name: &str,
        at: DateTime<Utc>,
    ) -> CoreResult<()> {
        let migration = self.find_mut(timestamp, name)?;
        migration.status = MigrationStatus::Applied;
        migration.applied_at = Some(at);
        self.last_applied = Some(timestamp.to_string());
        Ok(())
    }

    /// Record a phase failure.
    pub fn mark_failed(
        &mut self,
        timestamp: &str,
        name: &str,
        error: &str,
        at: DateTime<Utc>,
    ) -> CoreResult<()> {
        let migration = self.find_mut(timestamp, name)?;
        migration.status = MigrationStatus::Failed;
        migration.failed_at = Some(at);
        migration.error = Some(error.to_string());
        Ok(())
    }

    /// Record that the rollback script was executed for a failed attempt.
    pub fn mark_rolled_back(
        &mut self,
        timestamp: &str,
        name: &str,
        reason: &str,
        at: DateTime<Utc>,
    ) -> CoreResult<()> {
        let migration = self.find_mut(timestamp, name)?;
        migration.status = MigrationStatus::RolledBack;
        migration.rolled_back_at = Some(at);
        migration.rollback_reason = Some(reason.to_string());
        Ok(())
    }

    /// Per-status record counts
    pub fn summary(&self) -> MetadataSummary {
        let count = |status| {
            self.migrations
                .iter()
                .filter(|m| m.status == status)
                .count()
        };
        MetadataSummary {
            pending: count(MigrationStatus::Pending),
            applied: count(MigrationStatus::Applied),
            failed: count(MigrationStatus::Failed),
            rolled_back: count(MigrationStatus::RolledBack),
        }
    }
}

/// Summary statistics for the metadata document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetadataSummary {
    pub pending: usize,
    pub applied: usize,
    pub failed: usize,
    pub rolled_back: usize,
}

#[cfg(test)]
#[path = "migration_test.rs"]
mod tests;
