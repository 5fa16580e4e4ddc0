//! Recoverable error types.
//!
//! Caller bugs (out-of-range positions, reentrant mutation, folding a folded
//! node) are assertions, not errors. Only configuration and script input can
//! fail at runtime.

use crate::validate::InvariantViolation;
use std::path::PathBuf;
use thiserror::Error;

/// Failure to read an [`EngineConfig`](crate::config::EngineConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Failure to load, save or replay an operation [`Script`](crate::script::Script).
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("step {step}: {op} position {position} out of range (length {len})")]
    OutOfRange {
        step: usize,
        op: &'static str,
        position: usize,
        len: usize,
    },

    #[error("step {step}: node {node} does not exist")]
    UnknownNode { step: usize, node: usize },

    #[error("step {step}: {op} rejected: {reason}")]
    Rejected {
        step: usize,
        op: &'static str,
        reason: &'static str,
    },

    #[error("step {step}: {op} is not supported on a {target} script")]
    Unsupported {
        step: usize,
        op: &'static str,
        target: &'static str,
    },

    #[error("step {step}: {violation}")]
    Invariant {
        step: usize,
        #[source]
        violation: InvariantViolation,
    },

    #[error("script I/O on {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed script: {0}")]
    Json(#[from] serde_json::Error),
}
