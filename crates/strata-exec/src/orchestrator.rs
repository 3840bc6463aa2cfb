//! Migration orchestrator: the state machine tying lock, metadata, provenance
//! and script execution together.
//!
//! A run goes `pending -> applied`, `pending -> failed`, or
//! `pending -> failed -> rolledback`. Metadata is saved after every
//! transition, and the lock is released whichever way the run ends.

use serde_json::{Map, Value};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use strata_core::migration::{format_timestamp, migration_dir_name};
use strata_core::{
    Config, JsonMetadataStore, LockManager, MetadataStore, MigrationMetadata, MigrationName,
    MigrationPaths, MigrationStatus,
};

use crate::clock::{Clock, SystemClock};
use crate::error::{MigrationError, MigrationResult};
use crate::executor::{describe_exit, PhaseOutcome, ScriptExecutor, ScriptInvocation, ShellExecutor};
use crate::phase::Phase;
use crate::provenance::{self, Invocation};
use crate::quarantine;

/// What the operator asked for
#[derive(Debug, Clone, PartialEq)]
pub struct MigrationRequest {
    pub name: String,
    pub install: PathBuf,
    pub run: PathBuf,
    pub ready: Option<PathBuf>,
    pub rollback: Option<PathBuf>,
    /// Raw invocation to record; derived from the flags when absent
    pub invocation: Option<Invocation>,
}

impl MigrationRequest {
    pub fn new(name: impl Into<String>, install: impl Into<PathBuf>, run: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            install: install.into(),
            run: run.into(),
            ready: None,
            rollback: None,
            invocation: None,
        }
    }

    pub fn with_ready(mut self, ready: impl Into<PathBuf>) -> Self {
        self.ready = Some(ready.into());
        self
    }

    pub fn with_rollback(mut self, rollback: impl Into<PathBuf>) -> Self {
        self.rollback = Some(rollback.into());
        self
    }

    pub fn with_invocation(mut self, invocation: Invocation) -> Self {
        self.invocation = Some(invocation);
        self
    }

    /// Supplied options as a JSON object, absent optionals omitted
    pub fn flags(&self) -> Map<String, Value> {
        let mut flags = Map::new();
        flags.insert("name".into(), Value::from(self.name.clone()));
        for (phase, path) in self.scripts() {
            flags.insert(phase.as_str().into(), Value::from(path.display().to_string()));
        }
        flags
    }

    fn scripts(&self) -> Vec<(Phase, &Path)> {
        let mut scripts = vec![
            (Phase::Install, self.install.as_path()),
            (Phase::Run, self.run.as_path()),
        ];
        if let Some(ready) = &self.ready {
            scripts.push((Phase::Ready, ready.as_path()));
        }
        if let Some(rollback) = &self.rollback {
            scripts.push((Phase::Rollback, rollback.as_path()));
        }
        scripts
    }

    fn invocation(&self) -> Invocation {
        if let Some(invocation) = &self.invocation {
            return invocation.clone();
        }
        let mut args = vec!["migrate".to_string(), "--name".to_string(), self.name.clone()];
        for (phase, path) in self.scripts() {
            args.push(format!("--{}", phase));
            args.push(path.display().to_string());
        }
        Invocation::new(args, self.flags())
    }
}

/// Result of a successful migration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationOutcome {
    pub timestamp: String,
    pub name: String,
    pub status: MigrationStatus,
    pub dir: PathBuf,
}

/// Request after validation, before the lock is taken
struct ValidatedRequest<'a> {
    name: MigrationName,
    request: &'a MigrationRequest,
}

impl ValidatedRequest<'_> {
    /// Forward phases in execution order
    fn forward_phases(&self) -> Vec<(Phase, &Path)> {
        self.request
            .scripts()
            .into_iter()
            .filter(|(phase, _)| *phase != Phase::Rollback)
            .collect()
    }
}

/// In-memory state of one invocation
struct MigrationContext {
    timestamp: String,
    name: MigrationName,
    dir: PathBuf,
    metadata: MigrationMetadata,
}

/// Runs migrations against one set of roots
pub struct Orchestrator {
    paths: MigrationPaths,
    store: Arc<dyn MetadataStore>,
    lock: LockManager,
    executor: Arc<dyn ScriptExecutor>,
    clock: Arc<dyn Clock>,
    env: Vec<(String, String)>,
}

impl Orchestrator {
    pub fn new(
        paths: MigrationPaths,
        store: Arc<dyn MetadataStore>,
        lock: LockManager,
        executor: Arc<dyn ScriptExecutor>,
    ) -> Self {
        Self {
            paths,
            store,
            lock,
            executor,
            clock: Arc::new(SystemClock),
            env: Vec::new(),
        }
    }

    /// Orchestrator using the on-disk store, lock and shell executor from `config`
    pub fn from_config(config: &Config) -> Self {
        let paths = config.paths();
        let store = Arc::new(JsonMetadataStore::new(paths.metadata_file.clone()));
        let lock = LockManager::new(paths.lock_file.clone());
        let executor = Arc::new(ShellExecutor::new(config.interpreter.clone()));

        let mut orchestrator = Self::new(paths, store, lock, executor);
        if let Some(root) = &config.system_root {
            orchestrator = orchestrator.with_env("STRATA_SYSTEM_ROOT", root.display().to_string());
        }
        if let Some(root) = &config.state_root {
            orchestrator = orchestrator.with_env("STRATA_STATE_ROOT", root.display().to_string());
        }
        orchestrator
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Export an extra environment variable to every phase script
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn paths(&self) -> &MigrationPaths {
        &self.paths
    }

    /// Apply one migration.
    ///
    /// Validation happens before the lock is taken; nothing is mutated when
    /// it fails. Any phase failure is returned as
    /// [`MigrationError::PhaseFailed`] after metadata and rollback handling.
    pub async fn migrate(&self, request: &MigrationRequest) -> MigrationResult<MigrationOutcome> {
        let validated = validate(request)?;

        // acquire() may sleep while another process finishes writing its lock.
        let lock = self.lock.clone();
        let guard = tokio::task::spawn_blocking(move || lock.acquire()).await??;
        let result = self.migrate_locked(&validated).await;

        match guard.release() {
            Ok(()) => result,
            Err(e) if result.is_ok() => Err(e.into()),
            Err(e) => {
                log::warn!("Failed to release migration lock: {}", e);
                result
            }
        }
    }

    async fn migrate_locked(&self, validated: &ValidatedRequest<'_>) -> MigrationResult<MigrationOutcome> {
        let mut ctx = self.setup_context(&validated.name)?;
        log::info!(
            "Starting migration {} in {}",
            ctx.name,
            ctx.dir.display()
        );

        provenance::persist(
            &ctx.dir,
            &validated.request.invocation(),
            &validated.request.scripts(),
        )?;

        for (phase, script) in validated.forward_phases() {
            let outcome = self.run_phase(&ctx, phase, script).await?;
            if !outcome.success {
                return Err(self.handle_failure(&mut ctx, validated, outcome).await);
            }
        }

        ctx.metadata
            .mark_applied(&ctx.timestamp, &ctx.name, self.clock.now())?;
        self.store.save(&ctx.metadata)?;
        log::info!("Migration {} applied", ctx.name);

        Ok(MigrationOutcome {
            timestamp: ctx.timestamp,
            name: ctx.name.into_inner(),
            status: MigrationStatus::Applied,
            dir: ctx.dir,
        })
    }

    /// Guard against reapplication, create the attempt directory and record
    /// the `pending` entry.
    fn setup_context(&self, name: &MigrationName) -> MigrationResult<MigrationContext> {
        let mut metadata = self.store.load()?;
        if metadata.is_applied(name) {
            return Err(MigrationError::AlreadyApplied {
                name: name.to_string(),
            });
        }

        let timestamp = format_timestamp(self.clock.now());
        let dir_name = migration_dir_name(&timestamp, name);
        let root = &self.paths.migrations_dir;
        let dir = root.join(&dir_name);

        // An earlier attempt from the same second may already be quarantined.
        let quarantined = self.paths.rollback_dir.join(&dir_name);
        if metadata.find(&timestamp, name).is_some() || quarantined.exists() {
            let taken = if quarantined.exists() { &quarantined } else { &dir };
            return Err(MigrationError::MigrationDirExists {
                path: taken.display().to_string(),
            });
        }

        fs::create_dir_all(root).map_err(|e| MigrationError::io("create", root, e))?;
        match fs::create_dir(&dir) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(MigrationError::MigrationDirExists {
                    path: dir.display().to_string(),
                });
            }
            Err(e) => return Err(MigrationError::io("create", &dir, e)),
        }

        metadata.push_pending(&timestamp, name)?;
        self.store.save(&metadata)?;

        Ok(MigrationContext {
            timestamp,
            name: name.clone(),
            dir,
            metadata,
        })
    }

    async fn run_phase(
        &self,
        ctx: &MigrationContext,
        phase: Phase,
        script: &Path,
    ) -> MigrationResult<PhaseOutcome> {
        let mut env = self.env.clone();
        env.extend([
            ("STRATA_MIGRATION_NAME".to_string(), ctx.name.to_string()),
            ("STRATA_MIGRATION_TIMESTAMP".to_string(), ctx.timestamp.clone()),
            ("STRATA_MIGRATION_DIR".to_string(), ctx.dir.display().to_string()),
            ("STRATA_PHASE".to_string(), phase.to_string()),
        ]);

        self.executor
            .execute(ScriptInvocation {
                phase,
                script,
                migration_dir: &ctx.dir,
                env: &env,
            })
            .await
    }

    /// Shared failure path for install, run and ready.
    ///
    /// Returns the error to report: the phase failure, or whatever went wrong
    /// while recording it.
    async fn handle_failure(
        &self,
        ctx: &mut MigrationContext,
        validated: &ValidatedRequest<'_>,
        failed: PhaseOutcome,
    ) -> MigrationError {
        if let Err(e) = self.record_failure(ctx, validated, &failed).await {
            return e;
        }
        MigrationError::PhaseFailed {
            phase: failed.phase,
            output: failed.output,
        }
    }

    async fn record_failure(
        &self,
        ctx: &mut MigrationContext,
        validated: &ValidatedRequest<'_>,
        failed: &PhaseOutcome,
    ) -> MigrationResult<()> {
        let reason = failed.phase.failure_reason();
        let error = format!(
            "{} ({})\n{}",
            reason,
            describe_exit(failed.exit_code),
            failed.output.trim_end()
        );
        ctx.metadata
            .mark_failed(&ctx.timestamp, &ctx.name, &error, self.clock.now())?;
        self.store.save(&ctx.metadata)?;

        let Some(rollback) = validated.request.rollback.as_deref() else {
            log::warn!("{} for {}; no rollback script supplied", reason, ctx.name);
            return Ok(());
        };

        log::info!("{} for {}; rolling back", reason, ctx.name);
        let outcome = self.run_phase(ctx, Phase::Rollback, rollback).await?;
        if !outcome.success {
            log::warn!(
                "Rollback script for {} failed ({}); output in {}",
                ctx.name,
                describe_exit(outcome.exit_code),
                outcome.log_path.display()
            );
        }

        if let Some(dest) = quarantine::relocate(&ctx.dir, &self.paths.rollback_dir) {
            ctx.dir = dest;
        }

        ctx.metadata
            .mark_rolled_back(&ctx.timestamp, &ctx.name, reason, self.clock.now())?;
        self.store.save(&ctx.metadata)?;
        Ok(())
    }
}

/// Check mandatory inputs and that every supplied script exists.
fn validate(request: &MigrationRequest) -> MigrationResult<ValidatedRequest<'_>> {
    let name = MigrationName::parse(request.name.as_str())
        .map_err(|e| MigrationError::Validation(e.to_string()))?;

    for (phase, path) in request.scripts() {
        if path.as_os_str().is_empty() {
            return Err(MigrationError::Validation(format!(
                "{} script path is required",
                phase
            )));
        }
        if !path.is_file() {
            return Err(MigrationError::ScriptNotFound {
                phase,
                path: path.display().to_string(),
            });
        }
    }

    Ok(ValidatedRequest { name, request })
}

#[cfg(test)]
#[path = "orchestrator_test.rs"]
mod tests;
