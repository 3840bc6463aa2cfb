//! Configuration types and parsing for strata.yml

use crate::error::{CoreError, CoreResult};
use crate::lock::LOCK_FILE;
use crate::metadata::METADATA_FILE;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming the config file
pub const CONFIG_ENV: &str = "STRATA_CONFIG";

/// System-wide config location, used when present
pub const SYSTEM_CONFIG_PATH: &str = "/etc/strata/strata.yml";

/// Name of the quarantine directory under the migrations root
pub const ROLLBACKS_DIR: &str = "rollbacks";

/// Main configuration from strata.yml
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Directory holding `metadata.json` and one directory per attempt
    #[serde(default = "default_migrations_dir")]
    pub migrations_dir: PathBuf,

    /// Quarantine for rolled-back attempts (default: `<migrations_dir>/rollbacks`)
    #[serde(default)]
    pub rollback_dir: Option<PathBuf>,

    /// Directory holding `migrate.lock`
    #[serde(default = "default_lock_dir")]
    pub lock_dir: PathBuf,

    /// Program used to run phase scripts; `null` executes them directly
    #[serde(default = "default_interpreter")]
    pub interpreter: Option<String>,

    /// Overlay-backed system root, exported to scripts
    #[serde(default)]
    pub system_root: Option<PathBuf>,

    /// Persistent state root, exported to scripts
    #[serde(default)]
    pub state_root: Option<PathBuf>,

    /// Mount table read by `strata mounts`
    #[serde(default = "default_mount_table")]
    pub mount_table: PathBuf,
}

fn default_migrations_dir() -> PathBuf {
    PathBuf::from("/var/lib/strata/migrations")
}

fn default_lock_dir() -> PathBuf {
    PathBuf::from("/var/lib/strata/lock")
}

fn default_interpreter() -> Option<String> {
    Some("sh".to_string())
}

fn default_mount_table() -> PathBuf {
    PathBuf::from("/proc/self/mounts")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            migrations_dir: default_migrations_dir(),
            rollback_dir: None,
            lock_dir: default_lock_dir(),
            interpreter: default_interpreter(),
            system_root: None,
            state_root: None,
            mount_table: default_mount_table(),
        }
    }
}

/// Resolved on-disk locations used by a migration run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationPaths {
    pub migrations_dir: PathBuf,
    pub rollback_dir: PathBuf,
    pub lock_file: PathBuf,
    pub metadata_file: PathBuf,
}

impl Config {
    /// Load configuration from a YAML file
    pub fn load(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            return Err(CoreError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| CoreError::io(path, e))?;
        Self::from_yaml(&content).map_err(|e| CoreError::ConfigParseError {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Parse configuration from YAML text. An empty document yields defaults.
    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }

    /// Pick the config file to load.
    ///
    /// Priority: CLI flag > `STRATA_CONFIG` > `/etc/strata/strata.yml` if it exists.
    pub fn resolve_path(cli_config: Option<&Path>) -> Option<PathBuf> {
        cli_config
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from))
            .or_else(|| {
                let system = PathBuf::from(SYSTEM_CONFIG_PATH);
                system.exists().then_some(system)
            })
    }

    /// Load the resolved config file, or defaults when none applies.
    pub fn discover(cli_config: Option<&Path>) -> CoreResult<Self> {
        match Self::resolve_path(cli_config) {
            Some(path) => {
                log::debug!("Loading config from {}", path.display());
                Self::load(&path)
            }
            None => Ok(Self::default()),
        }
    }

    /// Quarantine directory, defaulting under the migrations root
    pub fn rollback_dir(&self) -> PathBuf {
        self.rollback_dir
            .clone()
            .unwrap_or_else(|| self.migrations_dir.join(ROLLBACKS_DIR))
    }

    /// Resolve every path a migration run touches
    pub fn paths(&self) -> MigrationPaths {
        MigrationPaths {
            migrations_dir: self.migrations_dir.clone(),
            rollback_dir: self.rollback_dir(),
            lock_file: self.lock_dir.join(LOCK_FILE),
            metadata_file: self.migrations_dir.join(METADATA_FILE),
        }
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
