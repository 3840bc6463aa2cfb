//! Shared helpers for CLI commands

use anyhow::{Context, Result};
use strata_core::Config;

use crate::cli::GlobalArgs;

/// Load the configuration and apply directory overrides from the command line.
pub(crate) fn load_config(global: &GlobalArgs) -> Result<Config> {
    let mut config =
        Config::discover(global.config.as_deref()).context("Failed to load configuration")?;

    if let Some(dir) = &global.migrations_dir {
        log::debug!("Migrations directory overridden: {}", dir.display());
        config.migrations_dir = dir.clone();
    }
    if let Some(dir) = &global.rollback_dir {
        config.rollback_dir = Some(dir.clone());
    }
    if let Some(dir) = &global.lock_dir {
        config.lock_dir = dir.clone();
    }

    if global.verbose {
        let paths = config.paths();
        eprintln!(
            "[verbose] migrations: {}, rollbacks: {}, lock: {}",
            paths.migrations_dir.display(),
            paths.rollback_dir.display(),
            paths.lock_file.display()
        );
    }

    Ok(config)
}

/// Print `value` as pretty JSON on stdout.
pub(crate) fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}

// ---------------------------------------------------------------------------
// Table-printing utilities
// ---------------------------------------------------------------------------

/// Calculate column widths for a table given headers and row data.
pub(crate) fn calculate_column_widths(headers: &[&str], rows: &[Vec<String>]) -> Vec<usize> {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (w, cell) in widths.iter_mut().zip(row.iter()) {
            *w = (*w).max(cell.chars().count());
        }
    }
    widths
}

/// Render a left-aligned table: header row, dashed separator, data rows.
///
/// Columns are separated by two spaces; trailing padding is trimmed.
pub(crate) fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let widths = calculate_column_widths(headers, rows);
    let render_row = |cells: Vec<String>| -> String {
        let parts: Vec<String> = cells
            .iter()
            .zip(&widths)
            .map(|(cell, &w)| format!("{:<width$}", cell, width = w))
            .collect();
        parts.join("  ").trim_end().to_string()
    };

    let mut out = Vec::with_capacity(rows.len() + 2);
    out.push(render_row(headers.iter().map(|h| h.to_string()).collect()));
    out.push(render_row(widths.iter().map(|&w| "-".repeat(w)).collect()));
    for row in rows {
        out.push(render_row(row.clone()));
    }
    out.join("\n")
}

/// Print a formatted table to stdout.
pub(crate) fn print_table(headers: &[&str], rows: &[Vec<String>]) {
    println!("{}", render_table(headers, rows));
}

/// First line of a possibly multi-line message, or `-`
pub(crate) fn first_line(text: Option<&str>) -> String {
    text.and_then(|t| t.lines().next())
        .filter(|line| !line.is_empty())
        .unwrap_or("-")
        .to_string()
}

#[cfg(test)]
#[path = "common_test.rs"]
mod tests;
