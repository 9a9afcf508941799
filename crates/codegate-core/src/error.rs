//! Error types for the commit gate
//!
//! Rejections of producer output are not errors: they are ordinary
//! [`GateOutcome`](crate::GateOutcome)s. The enums here cover collaborator
//! failures, session misuse and internal faults.

use crate::record::AttemptId;
use crate::state::CommitState;
use std::path::PathBuf;

/// Durable snapshot storage failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Storage could not be reached
    #[error("snapshot store unavailable: {0}")]
    Unavailable(String),

    /// Storage refused the write
    #[error("snapshot write failed: {0}")]
    WriteFailed(String),

    /// Stored snapshot could not be decoded
    #[error("stored snapshot is corrupt: {0}")]
    Corrupt(String),
}

/// Refund collaborator failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RefundError {
    /// Refund service could not be reached
    #[error("refund service unavailable: {0}")]
    Unavailable(String),

    /// Refund service refused the request
    #[error("refund rejected: {0}")]
    Rejected(String),
}

/// Session lifecycle misuse
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// A new attempt cannot start while one is outstanding
    #[error("attempt {active} is still in flight")]
    AttemptInFlight {
        /// The outstanding attempt
        active: AttemptId,
    },
}

/// Internal gate faults
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GateError {
    /// Commit state machine was driven along an edge it does not have
    #[error("illegal commit transition: {from:?} -> {to:?}")]
    IllegalTransition {
        /// Current state
        from: CommitState,
        /// Requested state
        to: CommitState,
    },

    /// Session rejected an operation
    #[error("session error: {0}")]
    Session(#[from] SessionError),
}

/// Configuration loading and validation failures
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("failed to read config {path}: {source}")]
    Io {
        /// File that failed
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Config text is not valid TOML for [`GateConfig`](crate::GateConfig)
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config parsed but breaks an invariant
    #[error("invalid config value: {0}")]
    Invalid(String),
}
