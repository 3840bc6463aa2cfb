//! Mount table parsing for operator diagnostics.
//!
//! Reads the `/proc/self/mounts` format: one mount per line, six
//! whitespace-separated fields, with spaces, tabs, newlines and backslashes in
//! paths encoded as three-digit octal escapes (`\040`).

use serde::Serialize;
use std::path::Path;

use crate::error::{CoreError, CoreResult};

/// One line of the mount table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MountEntry {
    pub device: String,
    pub mount_point: String,
    pub fs_type: String,
    pub options: Vec<String>,
}

impl MountEntry {
    /// Value of a `key=value` mount option
    pub fn option(&self, key: &str) -> Option<&str> {
        self.options.iter().find_map(|opt| {
            opt.split_once('=')
                .filter(|(k, _)| *k == key)
                .map(|(_, v)| v)
        })
    }

    /// Whether a bare flag option (e.g. `ro`) is set
    pub fn has_flag(&self, flag: &str) -> bool {
        self.options.iter().any(|opt| opt == flag)
    }

    pub fn is_overlay(&self) -> bool {
        self.fs_type == "overlay"
    }

    /// Overlay upper (writable) directory
    pub fn upper_dir(&self) -> Option<&str> {
        self.option("upperdir")
    }

    /// Overlay lower directories, highest priority first
    pub fn lower_dirs(&self) -> Vec<&str> {
        self.option("lowerdir")
            .map(|v| v.split(':').filter(|s| !s.is_empty()).collect())
            .unwrap_or_default()
    }
}

/// Parse mount table text. Malformed lines are skipped.
pub fn parse_mount_table(content: &str) -> Vec<MountEntry> {
    content
        .lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let device = fields.next()?;
            let mount_point = fields.next()?;
            let fs_type = fields.next()?;
            let options = fields.next()?;
            Some(MountEntry {
                device: unescape_octal(device),
                mount_point: unescape_octal(mount_point),
                fs_type: fs_type.to_string(),
                options: options.split(',').map(unescape_octal).collect(),
            })
        })
        .collect()
}

/// Read and parse a mount table file
pub fn read_mount_table(path: &Path) -> CoreResult<Vec<MountEntry>> {
    let content = std::fs::read_to_string(path).map_err(|e| CoreError::io(path, e))?;
    Ok(parse_mount_table(&content))
}

fn unescape_octal(field: &str) -> String {
    let bytes = field.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 3 < bytes.len() && is_octal_escape(&bytes[i + 1..i + 4]) {
            let value =
                (bytes[i + 1] - b'0') * 64 + (bytes[i + 2] - b'0') * 8 + (bytes[i + 3] - b'0');
            out.push(value);
            i += 4;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn is_octal_escape(digits: &[u8]) -> bool {
    digits.len() == 3 && digits[0] <= b'3' && digits.iter().all(|d| (b'0'..=b'7').contains(d))
}

#[cfg(test)]
#[path = "mounts_test.rs"]
mod tests;
