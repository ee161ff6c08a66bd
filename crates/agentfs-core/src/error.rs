//! Error types for AgentFS Core

use crate::types::Operation;
use thiserror::Error;

/// Main error type for AgentFS operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Filesystem error: {0}")]
    Fs(#[from] FsError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Logical filesystem errors
///
/// Every failure the handle, the backends and the domain service can report
/// maps onto exactly one of these variants.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FsError {
    #[error("Invalid path {path:?}: {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("Access denied: {operation} on {path}")]
    AccessDenied { path: String, operation: Operation },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    Conflict(String),

    #[error("Invalid argument {argument}{}", .value.as_ref().map(|v| format!(": {v}")).unwrap_or_default())]
    InvalidArgument {
        argument: String,
        value: Option<String>,
    },
}

impl Error {
    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Fs(FsError::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        })
    }

    pub fn access_denied(path: impl Into<String>, operation: Operation) -> Self {
        Error::Fs(FsError::AccessDenied {
            path: path.into(),
            operation,
        })
    }

    pub fn not_found(path: impl Into<String>) -> Self {
        Error::Fs(FsError::NotFound(path.into()))
    }

    pub fn conflict(path: impl Into<String>) -> Self {
        Error::Fs(FsError::Conflict(path.into()))
    }

    pub fn invalid_argument(argument: impl Into<String>, value: Option<String>) -> Self {
        Error::Fs(FsError::InvalidArgument {
            argument: argument.into(),
            value,
        })
    }

    /// The filesystem-level error, if this is one
    pub fn as_fs(&self) -> Option<&FsError> {
        match self {
            Error::Fs(e) => Some(e),
            _ => None,
        }
    }
}

impl From<regex::Error> for Error {
    fn from(err: regex::Error) -> Self {
        Error::invalid_argument("pattern", Some(err.to_string()))
    }
}

impl serde::Serialize for Error {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;
