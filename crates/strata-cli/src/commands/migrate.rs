//! Migrate command implementation

use anyhow::{Context, Result};
use strata_exec::{Invocation, MigrationError, MigrationRequest, Orchestrator};

use crate::cli::{GlobalArgs, MigrateArgs};
use crate::commands::common::load_config;

/// Execute the migrate command
pub async fn execute(args: &MigrateArgs, global: &GlobalArgs) -> Result<()> {
    let config = load_config(global)?;
    let raw_args = std::env::args_os()
        .skip(1)
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect();
    let request = build_request(args, raw_args);
    let orchestrator = Orchestrator::from_config(&config);

    match orchestrator.migrate(&request).await {
        Ok(outcome) => {
            println!(
                "Migration '{}' applied ({})",
                outcome.name, outcome.timestamp
            );
            if global.verbose {
                println!("  Logs: {}", outcome.dir.display());
            }
            Ok(())
        }
        Err(MigrationError::PhaseFailed { phase, output }) => {
            let tail: Vec<&str> = output.lines().rev().take(20).collect();
            if !tail.is_empty() {
                eprintln!("--- last {} line(s) of {} output ---", tail.len(), phase);
                for line in tail.iter().rev() {
                    eprintln!("{}", line);
                }
                eprintln!("---");
            }
            Err(MigrationError::PhaseFailed { phase, output })
                .with_context(|| format!("Migration '{}' failed", args.name))
        }
        Err(e) => Err(e).with_context(|| format!("Migration '{}' failed", args.name)),
    }
}

/// Translate parsed arguments into a request carrying the raw invocation.
pub(crate) fn build_request(args: &MigrateArgs, raw_args: Vec<String>) -> MigrationRequest {
    let mut request = MigrationRequest::new(args.name.clone(), &args.install, &args.run);
    request.ready = args.ready.clone();
    request.rollback = args.rollback.clone();
    let flags = request.flags();
    request.with_invocation(Invocation::new(raw_args, flags))
}
