//! Error types shared by the host runtime and driver plugins.

use crate::state::State;
use thiserror::Error;

/// Failure reported by a virtualization driver.
///
/// Closed set so that the kind survives a trip over the plugin boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DriverError {
    /// The driver does not support the requested capability.
    #[error("{0}")]
    Unsupported(String),

    /// Generic failure of a remote call. Only the message is known.
    #[error("{0}")]
    Rpc(String),

    /// Failure raised by the backend itself.
    #[error("{0}")]
    Backend(String),
}

pub type DriverResult<T> = Result<T, DriverError>;

#[derive(Debug, Error)]
pub enum DevhostError {
    /// The machine already is in the state an operation targets.
    #[error("Machine \"{name}\" is already {state}.")]
    AlreadyInState { name: String, state: State },

    /// The driver does not implement the requested operation.
    #[error("Not Implemented")]
    NotImplemented,

    #[error("{0}")]
    Timeout(String),

    #[error("wait cancelled: {0}")]
    Cancelled(String),

    #[error(transparent)]
    Driver(#[from] DriverError),

    #[error("{command} failed: {message}")]
    Command { command: String, message: String },

    #[error("{0}")]
    Preflight(String),

    /// A preflight check failed and has no automatic remediation.
    #[error("{failure}: {hint}")]
    FixUnavailable { failure: String, hint: String },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl DevhostError {
    pub fn is_already_in_state(&self) -> bool {
        matches!(self, DevhostError::AlreadyInState { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, DevhostError::Timeout(_))
    }
}

pub type DevhostResult<T> = Result<T, DevhostError>;
