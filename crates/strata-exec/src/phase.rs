//! The four sequential steps of a migration.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One step of a migration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Install,
    Run,
    Ready,
    Rollback,
}

impl Phase {
    /// All phases in execution order (rollback last)
    pub const ALL: [Phase; 4] = [Phase::Install, Phase::Run, Phase::Ready, Phase::Rollback];

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Install => "install",
            Phase::Run => "run",
            Phase::Ready => "ready",
            Phase::Rollback => "rollback",
        }
    }

    /// Name of the provenance copy of this phase's script
    pub fn script_file_name(self) -> String {
        format!("{}.sh", self.as_str())
    }

    /// Name of the captured output log
    pub fn log_file_name(self) -> String {
        format!("{}_output.log", self.as_str())
    }

    /// Operator-facing failure reason, also stored as `rollbackReason`
    pub fn failure_reason(self) -> &'static str {
        match self {
            Phase::Install => "Install script failed",
            Phase::Run => "Run script failed",
            Phase::Ready => "Ready check failed",
            Phase::Rollback => "Rollback script failed",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
