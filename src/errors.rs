//! Error types for the crash round operator
//!
//! Errors are layered the same way the system is: the chain facade reports
//! `ChainError`, the coordinator wraps it in `ControlError` together with its own
//! precondition and validation failures, and configuration loading has its own
//! `ConfigurationError`.

use thiserror::Error;

/// Failures reported by the chain client facade
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChainError {
    /// Transport failure: the RPC node could not be reached or did not confirm
    #[error("RPC request failed: {0}")]
    Rpc(String),

    /// Submission or read did not complete within the configured bound
    #[error("{operation} timed out after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    /// The program's global config account already exists
    #[error("Game config is already initialized")]
    AlreadyInitialized,

    /// The program rejected the instruction (bad bounds, duplicate round, ...)
    #[error("Transaction rejected by program: {0}")]
    Rejected(String),

    /// Account data could not be decoded
    #[error("Failed to decode account data: {0}")]
    Decode(String),

    /// Admin key material could not be loaded or used
    #[error("Key error: {0}")]
    Key(String),
}

impl ChainError {
    /// Timeout for the named facade operation
    pub fn timeout(operation: &str, timeout_ms: u64) -> Self {
        ChainError::Timeout {
            operation: operation.to_string(),
            timeout_ms,
        }
    }
}

/// Errors surfaced by the round lifecycle coordinator
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ControlError {
    #[error(transparent)]
    Chain(#[from] ChainError),

    /// A round is already pending or active
    #[error("Round {0} is still in progress")]
    RoundInProgress(u64),

    /// Finish requested while no round is pending or active
    #[error("No active round to end")]
    NoActiveRound,

    /// Manual end for a round other than the one in flight
    #[error("Round {requested} is not the active round (active: {expected})")]
    RoundMismatch { expected: u64, requested: u64 },

    /// Another round transition holds the gate
    #[error("Another round transition is in progress, retry shortly")]
    Busy,

    /// Malformed input rejected before any submission
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Bootstrap failed: {0}")]
    Bootstrap(String),
}

impl ControlError {
    /// Whether the autonomous loop should back off and retry this failure
    pub fn is_retryable(&self) -> bool {
        matches!(self, ControlError::Chain(_) | ControlError::Busy)
    }
}

/// Configuration loading and validation errors
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("Missing required field: {0}")]
    MissingRequired(String),

    #[error("Invalid value for {field}: '{value}' ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

pub type ChainResult<T> = Result<T, ChainError>;
pub type ControlResult<T> = Result<T, ControlError>;
pub type ConfigResult<T> = Result<T, ConfigurationError>;
