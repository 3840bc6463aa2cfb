//! strata-core - Core library for strata
//!
//! This crate provides the migration data model, the metadata store, the
//! PID-stamped migration lock, configuration loading and mount table parsing
//! used by the execution layer and the CLI.

pub mod config;
pub mod error;
pub mod lock;
pub mod metadata;
pub mod migration;
pub mod migration_name;
pub mod mounts;
pub mod process;

pub use config::{Config, MigrationPaths};
pub use error::{CoreError, CoreResult};
pub use lock::{LockGuard, LockManager, LockRecord};
pub use metadata::{JsonMetadataStore, MemoryMetadataStore, MetadataStore};
pub use migration::{Migration, MigrationMetadata, MigrationStatus};
pub use migration_name::MigrationName;
pub use process::{ProcProbe, ProcessProbe};
