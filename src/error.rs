//! Error taxonomy
//!
//! Setup errors are fatal and abort the run before any worker starts.
//! Tick errors are recoverable: the worker logs them and tries again next tick.

use thiserror::Error;

/// Failures loading or validating a [`SimConfig`](crate::SimConfig)
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// A fault inside one worker tick. The tick is skipped, the worker keeps running.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TickError {
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("worker panicked: {0}")]
    WorkerPanic(String),

    #[error("event bus disconnected")]
    Disconnected,
}

/// Fatal startup errors
#[derive(Debug, Error)]
pub enum SetupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to spawn worker `{name}`: {source}")]
    Spawn {
        name: &'static str,
        #[source]
        source: std::io::Error,
    },
}
