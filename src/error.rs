//! Recoverable errors. Broken chain invariants are not represented here:
//! they panic, because a node with a corrupted ancestor chain cannot keep
//! validating.

use std::path::PathBuf;

use thiserror::Error;

use crate::core::spork::SporkId;

#[derive(Error, Debug)]
pub enum SporkError {
    #[error("unknown spork: {0}")]
    UnknownSpork(String),

    #[error("malformed spork override '{0}', expected NAME=VALUE")]
    MalformedOverride(String),

    #[error("invalid value {value} for {spork}")]
    InvalidValue { spork: SporkId, value: i64 },

    #[error("{spork} already active since height {active_since}, cannot move it")]
    AlreadyActive { spork: SporkId, active_since: i64 },

    #[error("{spork} cannot activate at {value}, chain is already at height {tip_height}")]
    RetroactiveActivation { spork: SporkId, value: i64, tip_height: u32 },

    #[error("spork file: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failures of the diagnostic command line.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("invalid hex value '{0}'")]
    Hex(String),

    #[error("invalid hash '{0}', expected at most 64 hex digits")]
    Hash(String),

    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("chain file {}: {source}", .path.display())]
    ChainFile {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("chain file {} holds no blocks", .0.display())]
    EmptyChain(PathBuf),

    #[error(transparent)]
    Spork(#[from] SporkError),
}
