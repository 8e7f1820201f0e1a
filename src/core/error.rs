//! Error types for bridge operations.

use thiserror::Error;

/// Errors produced while submitting work through the bridge.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// A wake pointer was supplied but no wake callback has been installed.
    #[error("wake pointer supplied but no wake callback is installed")]
    WakeCallbackMissing,
    /// The dispatch loop is no longer accepting envelopes.
    #[error("dispatch loop is not running")]
    DispatchClosed,
    /// The interactive pool was requested but not configured.
    #[error("interactive pool is disabled")]
    InteractivePoolDisabled,
    /// The single-threaded local pool was requested but not configured.
    #[error("local pool is disabled")]
    LocalPoolDisabled,
    /// Configuration validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// The async runtime could not be built or reached.
    #[error("runtime error: {0}")]
    Runtime(String),
}

/// Outcome of a task that did not produce a value.
#[derive(Debug, Error)]
pub enum TaskError {
    /// The callable returned an error.
    #[error("task failed: {0:#}")]
    Failed(anyhow::Error),
    /// The callable panicked.
    #[error("task panicked: {0}")]
    Panicked(String),
    /// The runtime dropped the task before it finished.
    #[error("task cancelled by runtime shutdown")]
    Cancelled,
}

impl TaskError {
    /// The underlying failure when the callable returned an error.
    #[must_use]
    pub const fn failure(&self) -> Option<&anyhow::Error> {
        match self {
            Self::Failed(err) => Some(err),
            _ => None,
        }
    }
}

/// Application-facing result using anyhow for callable bodies.
pub type AppResult<T> = Result<T, anyhow::Error>;
