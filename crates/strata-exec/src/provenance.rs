//! Forensic record of what a migration attempt was asked to do.
//!
//! Written into the attempt directory before any script runs: the raw
//! invocation as `command.json`, plus a byte-for-byte copy of every supplied
//! script as `<phase>.sh`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

use crate::error::{MigrationError, MigrationResult};
use crate::phase::Phase;

/// File name of the recorded invocation
pub const COMMAND_FILE: &str = "command.json";

/// Raw arguments and parsed flags of one invocation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Invocation {
    pub args: Vec<String>,
    pub flags: Map<String, Value>,
}

impl Invocation {
    pub fn new(args: Vec<String>, flags: Map<String, Value>) -> Self {
        Self { args, flags }
    }
}

/// Write `command.json` and the script copies into `dir`.
pub fn persist(dir: &Path, invocation: &Invocation, scripts: &[(Phase, &Path)]) -> MigrationResult<()> {
    let command_path = dir.join(COMMAND_FILE);
    let json = serde_json::to_string_pretty(invocation)?;
    fs::write(&command_path, json).map_err(|e| MigrationError::io("write", &command_path, e))?;

    for (phase, source) in scripts {
        let dest = dir.join(phase.script_file_name());
        fs::copy(source, &dest).map_err(|e| MigrationError::io("copy script to", &dest, e))?;
    }

    log::debug!(
        "Recorded invocation and {} script(s) in {}",
        scripts.len(),
        dir.display()
    );
    Ok(())
}

/// Read back the recorded invocation of an attempt
pub fn load_invocation(dir: &Path) -> MigrationResult<Invocation> {
    let command_path = dir.join(COMMAND_FILE);
    let content =
        fs::read_to_string(&command_path).map_err(|e| MigrationError::io("read", &command_path, e))?;
    Ok(serde_json::from_str(&content)?)
}
