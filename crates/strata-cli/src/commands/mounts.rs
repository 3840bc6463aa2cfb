//! Mounts command implementation

use anyhow::{Context, Result};
use strata_core::mounts::{read_mount_table, MountEntry};

use crate::cli::{GlobalArgs, MountsArgs, OutputFormat};
use crate::commands::common::{load_config, print_json, print_table};

/// Execute the mounts command
pub async fn execute(args: &MountsArgs, global: &GlobalArgs) -> Result<()> {
    let config = load_config(global)?;
    let entries = read_mount_table(&config.mount_table).with_context(|| {
        format!(
            "Failed to read mount table {}",
            config.mount_table.display()
        )
    })?;

    let selected: Vec<&MountEntry> = entries
        .iter()
        .filter(|e| args.fstype.as_deref().map_or(true, |t| e.fs_type == t))
        .collect();

    match args.output {
        OutputFormat::Json => print_json(&selected)?,
        OutputFormat::Table => {
            print_table(&["MOUNT_POINT", "TYPE", "DEVICE", "OPTIONS"], &rows(&selected));
            let overlays = selected.iter().filter(|e| e.is_overlay()).count();
            println!();
            println!("{} mount(s), {} overlay", selected.len(), overlays);
        }
    }
    Ok(())
}

fn rows(entries: &[&MountEntry]) -> Vec<Vec<String>> {
    entries
        .iter()
        .map(|e| {
            vec![
                e.mount_point.clone(),
                e.fs_type.clone(),
                e.device.clone(),
                options(e),
            ]
        })
        .collect()
}

/// Overlay layers summary, or the raw options for plain mounts
fn options(entry: &MountEntry) -> String {
    if !entry.is_overlay() {
        return entry.options.join(",");
    }
    format!(
        "{} upper={} lower={}",
        if entry.has_flag("ro") { "ro" } else { "rw" },
        entry.upper_dir().unwrap_or("-"),
        entry.lower_dirs().join(":")
    )
}
