//! Error Types
//!
//! Remote failures never reach the caller of a store operation as an `Err`;
//! they travel inside the outcome as the reason a change stayed local.

use thiserror::Error;

pub type RemoteResult<T> = Result<T, RemoteError>;

/// Any failed remote call. The store handles every variant the same way.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RemoteError {
    /// Connection refused, timeout, DNS and the like
    #[error("network error: {0}")]
    Transport(String),

    /// Server answered with a non-2xx status
    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },

    /// Response body did not match the expected shape
    #[error("unexpected response: {0}")]
    Decode(String),

    /// Remote deliberately offline (in-memory service)
    #[error("service unavailable: {0}")]
    Unavailable(String),
}

impl RemoteError {
    /// Human-readable message for display
    pub fn message(&self) -> &str {
        match self {
            RemoteError::Transport(msg)
            | RemoteError::Decode(msg)
            | RemoteError::Unavailable(msg) => msg,
            RemoteError::Status { message, .. } => message,
        }
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            RemoteError::Decode(e.to_string())
        } else if let Some(status) = e.status() {
            RemoteError::Status {
                status: status.as_u16(),
                message: e.to_string(),
            }
        } else {
            RemoteError::Transport(e.to_string())
        }
    }
}

/// Caller-visible store failures
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("invalid input: {0}")]
    Validation(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to access config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config value: {0}")]
    Invalid(String),
}
