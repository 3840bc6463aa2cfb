//! strata-exec - Execution layer for strata
//!
//! This crate runs migrations: the script executor, provenance capture,
//! quarantine relocation and the orchestrator state machine that sequences
//! install, run, ready and rollback phases under the migration lock.

pub mod clock;
pub mod error;
pub mod executor;
pub mod orchestrator;
pub mod phase;
pub mod provenance;
pub mod quarantine;

pub use clock::{Clock, SystemClock};
pub use error::{MigrationError, MigrationResult};
pub use executor::{PhaseOutcome, ScriptExecutor, ScriptInvocation, ShellExecutor};
pub use orchestrator::{MigrationOutcome, MigrationRequest, Orchestrator};
pub use phase::Phase;
pub use provenance::Invocation;
