use std::path::PathBuf;

use thiserror::Error;

/// Crate-wide result alias. Most call sites only need to propagate and eventually print
/// an error, so fallible helpers that aren't part of the public error taxonomy below
/// return `anyhow::Error` through this alias, matching the convention used throughout
/// the codebase this tournament runner grew out of.
pub type Res<T> = anyhow::Result<T>;

/// The taxonomy from the design doc: every fallible operation in the tournament core
/// eventually collapses into one of these. `IllegalMove`, `TimeLoss` and `Disconnect`
/// are game-level terminations and never abort the tournament; `Spawn` and `Config`
/// are fatal.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to spawn engine '{name}' ({cmd}): {source}")]
    Spawn {
        name: String,
        cmd: String,
        #[source]
        source: std::io::Error,
    },

    #[error("engine '{name}' did not respond with '{expected}' within {timeout_ms}ms")]
    ProtocolTimeout {
        name: String,
        expected: String,
        timeout_ms: u64,
    },

    #[error("engine '{name}' disconnected (process exited or closed its pipes)")]
    Disconnect { name: String },

    #[error("engine '{name}' sent a malformed UCI line: '{line}'")]
    MalformedUci { name: String, line: String },

    #[error("engine '{name}' played the illegal move '{uci}' in position '{fen}'")]
    IllegalMove {
        name: String,
        uci: String,
        fen: String,
    },

    #[error("engine '{name}' lost on time")]
    TimeLoss { name: String },

    #[error("I/O error touching '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("interrupted")]
    Interrupt,
}

impl AppError {
    /// 1 for configuration errors, 2 for I/O, 130 for interruption, 1 for anything else
    /// that escaped to `main` (spawn failures are the only other fatal kind).
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::Config(_) | AppError::Spawn { .. } => 1,
            AppError::Io { .. } => 2,
            AppError::Interrupt => 130,
            AppError::ProtocolTimeout { .. }
            | AppError::Disconnect { .. }
            | AppError::MalformedUci { .. }
            | AppError::IllegalMove { .. }
            | AppError::TimeLoss { .. } => 1,
        }
    }
}
