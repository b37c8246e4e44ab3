//! Error types for tuning-ledger
//!
//! Toyota Way: Clear error messages with actionable guidance (Respect for People)

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// tuning-ledger error types
#[derive(Error, Debug)]
pub enum Error {
    /// Algorithm name not present in the registry (configuration error)
    #[error("unknown algorithm '{name}'\nKnown algorithms: {known}")]
    UnknownAlgorithm {
        /// Requested name
        name: String,
        /// Comma-separated registered names
        known: String,
    },

    /// Strategy name not present in the registry (configuration error)
    #[error("unknown strategy '{name}'\nKnown strategies: {known}")]
    UnknownStrategy {
        /// Requested name
        name: String,
        /// Comma-separated registered names
        known: String,
    },

    /// Registry configuration is invalid (configuration error)
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The tuning engine failed while producing a trial attempt
    #[error("trial {path} failed: {source}\nThe file was not written; re-run the same command to retry it")]
    Engine {
        /// Output file that was being produced
        path: PathBuf,
        /// Underlying engine failure
        #[source]
        source: EngineError,
    },

    /// The engine returned no record with a usable `time`
    #[error("trial {path} produced no record with a valid time\nThe file was not written; re-run the same command to retry it")]
    NoValidRecords {
        /// Output file that was being produced
        path: PathBuf,
    },

    /// The device context is held by another process
    #[error("device context busy: {path} is locked by another run\nWait for that run to finish; the lock is released when it exits")]
    DeviceBusy {
        /// Lock file path
        path: PathBuf,
    },

    /// JSON encode/decode failure for a specific file
    #[error("JSON error in {path}: {source}")]
    Serialization {
        /// File being read or written
        path: PathBuf,
        /// Underlying serde error
        #[source]
        source: serde_json::Error,
    },

    /// IO failure for a specific file
    #[error("IO error on {path}: {source}")]
    File {
        /// File being read or written
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for errors raised while resolving names or configuration, before
    /// any trial runs. These are fatal and leave no state behind.
    #[must_use]
    pub const fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownAlgorithm { .. } | Self::UnknownStrategy { .. } | Self::Config(_)
        )
    }

    pub(crate) fn file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::File {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Serialization {
            path: path.into(),
            source,
        }
    }
}

/// Failure reported by a tuning engine.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Engine-reported failure
    #[error("{0}")]
    Failed(String),

    /// No engine command configured for the algorithm
    #[error("no engine command configured for algorithm '{0}'\nAdd a \"command\" entry to the registry config")]
    NotConfigured(String),

    /// Engine process could not be started
    #[error("failed to launch `{command}`: {source}")]
    Launch {
        /// Program that was launched
        command: String,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// Engine process exited unsuccessfully
    #[error("`{command}` exited with {status}; see its output above")]
    Exit {
        /// Program that was launched
        command: String,
        /// Exit status description
        status: String,
    },

    /// Engine output could not be decoded
    #[error("engine output is not a valid tuning result: {0}")]
    Output(#[from] serde_json::Error),
}
