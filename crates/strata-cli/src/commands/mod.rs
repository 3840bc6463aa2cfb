//! CLI command implementations

pub(crate) mod common;
pub(crate) mod lock;
pub(crate) mod logs;
pub(crate) mod ls;
pub(crate) mod migrate;
pub(crate) mod mounts;
