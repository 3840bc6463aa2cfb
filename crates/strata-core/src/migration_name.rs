//! Strongly-typed migration label.
//!
//! The name becomes part of an on-disk directory (`<timestamp>_<name>`), so
//! it must be non-empty and must not be able to escape the migrations root.

use crate::error::{CoreError, CoreResult};

/// Operator-supplied migration label
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MigrationName(String);

impl MigrationName {
    /// Validate and wrap a name.
    pub fn parse(name: impl Into<String>) -> CoreResult<Self> {
        let name = name.into();
        let invalid = |reason: &str| CoreError::InvalidMigrationName {
            name: name.clone(),
            reason: reason.to_string(),
        };

        if name.trim().is_empty() {
            return Err(invalid("name must not be empty"));
        }
        if name == "." || name == ".." {
            return Err(invalid("name must not be a relative path component"));
        }
        if name.contains(['/', '\\', '\0']) {
            return Err(invalid("name must not contain path separators or NUL"));
        }
        Ok(Self(name))
    }

    /// Return the underlying name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the wrapper and return the inner `String`.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Display for MigrationName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for MigrationName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::ops::Deref for MigrationName {
    type Target = str;
    fn deref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for MigrationName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

#[cfg(test)]
#[path = "migration_name_test.rs"]
mod tests;
