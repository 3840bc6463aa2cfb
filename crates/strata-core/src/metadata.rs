//! Durable storage for [`MigrationMetadata`].
//!
//! Every write replaces the whole document. The file-backed store writes to a
//! temporary sibling and renames it over the target, so readers only ever see
//! a fully written snapshot.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::{CoreError, CoreResult};
use crate::migration::MigrationMetadata;

/// File name of the metadata document inside the migrations root
pub const METADATA_FILE: &str = "metadata.json";

/// Load/save interface for the migration metadata document
pub trait MetadataStore: Send + Sync {
    /// Load the current document; an absent store yields an empty collection.
    fn load(&self) -> CoreResult<MigrationMetadata>;

    /// Replace the stored document.
    fn save(&self, metadata: &MigrationMetadata) -> CoreResult<()>;
}

/// `metadata.json` on disk
#[derive(Debug, Clone)]
pub struct JsonMetadataStore {
    path: PathBuf,
}

impl JsonMetadataStore {
    /// Store backed by the given file path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `<migrations_dir>/metadata.json`
    pub fn in_dir(migrations_dir: &Path) -> Self {
        Self::new(migrations_dir.join(METADATA_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MetadataStore for JsonMetadataStore {
    fn load(&self) -> CoreResult<MigrationMetadata> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(MigrationMetadata::default());
            }
            Err(e) => return Err(CoreError::io(&self.path, e)),
        };

        serde_json::from_str(&content).map_err(|source| CoreError::MetadataCorrupt {
            path: self.path.display().to_string(),
            source,
        })
    }

    /// Uses write-to-temp-then-rename pattern to prevent corruption
    fn save(&self, metadata: &MigrationMetadata) -> CoreResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| CoreError::io(parent, e))?;
        }

        let temp_path = self.path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(metadata)?;
        let mut file = File::create(&temp_path).map_err(|e| CoreError::io(&temp_path, e))?;
        file.write_all(json.as_bytes())
            .and_then(|_| file.sync_all())
            .map_err(|e| CoreError::io(&temp_path, e))?;
        drop(file);
        fs::rename(&temp_path, &self.path).map_err(|e| CoreError::io(&self.path, e))?;

        log::debug!(
            "Saved {} migration record(s) to {}",
            metadata.migrations.len(),
            self.path.display()
        );
        Ok(())
    }
}

/// In-memory store for tests and dry runs
#[derive(Debug, Default)]
pub struct MemoryMetadataStore {
    inner: Mutex<MigrationMetadata>,
    saves: Mutex<usize>,
}

impl MemoryMetadataStore {
    pub fn new(initial: MigrationMetadata) -> Self {
        Self {
            inner: Mutex::new(initial),
            saves: Mutex::new(0),
        }
    }

    /// Snapshot of the stored document
    pub fn snapshot(&self) -> MigrationMetadata {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Number of `save` calls so far
    pub fn save_count(&self) -> usize {
        *self
            .saves
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl MetadataStore for MemoryMetadataStore {
    fn load(&self) -> CoreResult<MigrationMetadata> {
        Ok(self.snapshot())
    }

    fn save(&self, metadata: &MigrationMetadata) -> CoreResult<()> {
        *self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = metadata.clone();
        *self
            .saves
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) += 1;
        Ok(())
    }
}

#[cfg(test)]
#[path = "metadata_test.rs"]
mod tests;
