//! List command implementation

use anyhow::{Context, Result};
use strata_core::{JsonMetadataStore, MetadataStore, Migration, MigrationStatus};

use crate::cli::{GlobalArgs, LsArgs, OutputFormat};
use crate::commands::common::{first_line, load_config, print_json, print_table};

/// Execute the ls command
pub async fn execute(args: &LsArgs, global: &GlobalArgs) -> Result<()> {
    let config = load_config(global)?;
    let store = JsonMetadataStore::new(config.paths().metadata_file);
    let metadata = store.load().context("Failed to load migration metadata")?;

    let status = args.status.map(MigrationStatus::from);
    let selected: Vec<&Migration> = metadata
        .migrations
        .iter()
        .filter(|m| status.map_or(true, |s| m.status == s))
        .collect();

    match args.output {
        OutputFormat::Json => print_json(&selected)?,
        OutputFormat::Table => {
            if selected.is_empty() {
                println!("No migrations recorded in {}", store.path().display());
                return Ok(());
            }
            print_table(&["TIMESTAMP", "NAME", "STATUS", "AT", "DETAIL"], &rows(&selected));

            let summary = metadata.summary();
            println!();
            println!(
                "{} applied, {} failed, {} rolled back, {} pending; last applied: {}",
                summary.applied,
                summary.failed,
                summary.rolled_back,
                summary.pending,
                metadata.last_applied.as_deref().unwrap_or("-")
            );
        }
    }

    Ok(())
}

/// One table row per migration
fn rows(migrations: &[&Migration]) -> Vec<Vec<String>> {
    migrations
        .iter()
        .map(|m| {
            let at = match m.status {
                MigrationStatus::Applied => m.applied_at,
                MigrationStatus::Failed => m.failed_at,
                MigrationStatus::RolledBack => m.rolled_back_at,
                MigrationStatus::Pending => None,
            };
            let detail = match m.status {
                MigrationStatus::RolledBack => first_line(m.rollback_reason.as_deref()),
                _ => first_line(m.error.as_deref()),
            };
            vec![
                m.timestamp.clone(),
                m.name.clone(),
                m.status.to_string(),
                at.map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_else(|| "-".to_string()),
                detail,
            ]
        })
        .collect()
}
