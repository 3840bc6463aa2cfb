//! Logs command implementation

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::PathBuf;
use strata_core::{JsonMetadataStore, MetadataStore, MigrationPaths};
use strata_exec::Phase;

use crate::cli::{GlobalArgs, LogsArgs};
use crate::commands::common::load_config;

/// Execute the logs command
pub async fn execute(args: &LogsArgs, global: &GlobalArgs) -> Result<()> {
    let config = load_config(global)?;
    let paths = config.paths();
    let metadata = JsonMetadataStore::new(paths.metadata_file.clone())
        .load()
        .context("Failed to load migration metadata")?;

    let Some(migration) = metadata.latest(&args.name) else {
        bail!("No migration named '{}' has been recorded", args.name);
    };

    let Some(dir) = locate_attempt(&paths, &migration.dir_name()) else {
        bail!(
            "Directory for {} not found in {} or {}",
            migration.dir_name(),
            paths.migrations_dir.display(),
            paths.rollback_dir.display()
        );
    };

    println!(
        "{} {} [{}] in {}",
        migration.timestamp,
        migration.name,
        migration.status,
        dir.display()
    );

    let phases: Vec<Phase> = match args.phase {
        Some(phase) => vec![phase.into()],
        None => Phase::ALL.to_vec(),
    };

    let mut shown = 0;
    for phase in phases {
        let log_path = dir.join(phase.log_file_name());
        if !log_path.exists() {
            continue;
        }
        let content = fs::read_to_string(&log_path)
            .with_context(|| format!("Failed to read {}", log_path.display()))?;
        println!();
        println!("==> {} <==", phase.log_file_name());
        print!("{}", content);
        if !content.is_empty() && !content.ends_with('\n') {
            println!();
        }
        shown += 1;
    }

    if shown == 0 {
        println!("No phase output captured");
    }
    Ok(())
}

/// Find an attempt directory in the active area, then in quarantine.
pub(crate) fn locate_attempt(paths: &MigrationPaths, dir_name: &str) -> Option<PathBuf> {
    [&paths.migrations_dir, &paths.rollback_dir]
        .into_iter()
        .map(|root| root.join(dir_name))
        .find(|dir| dir.is_dir())
}
