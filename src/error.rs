//! Error types for VeraTasks
//!
//! Exit codes:
//! - 0: Success
//! - 2: User error (validation, unknown id, bad config, not signed in)
//! - 3: Import payload rejected (malformed export file)
//! - 4: Operation failed (storage/transport failure)

use std::path::PathBuf;
use thiserror::Error;

/// Exit codes for the vt CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const USER_ERROR: i32 = 2;
    pub const FORMAT_REJECTED: i32 = 3;
    pub const OPERATION_FAILED: i32 = 4;
}

/// Coarse classification used by the CLI and by callers that only care
/// about which family an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    Config,
    Format,
    Transport,
}

/// Main error type for VeraTasks operations
#[derive(Error, Debug)]
pub enum Error {
    // User errors (exit code 2)
    #[error("{field}: {message}")]
    Validation { field: String, message: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Project not found: {0}")]
    ProjectNotFound(String),

    #[error("Not signed in")]
    NotSignedIn,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    // Import rejected (exit code 3)
    #[error("Invalid import format: {0}")]
    Format(String),

    // Operation failures (exit code 4)
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Lock acquisition failed: {0}")]
    LockFailed(PathBuf),
}

impl Error {
    /// Shorthand for a field-level validation failure.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation { .. } | Error::InvalidArgument(_) => ErrorKind::Validation,
            Error::TaskNotFound(_) | Error::ProjectNotFound(_) | Error::NotSignedIn => {
                ErrorKind::NotFound
            }
            Error::InvalidConfig(_) | Error::TomlParse(_) => {
                ErrorKind::Config
            }
            Error::Format(_) => ErrorKind::Format,
            Error::Transport(_) | Error::Io(_) | Error::Json(_) | Error::LockFailed(_) => {
                ErrorKind::Transport
            }
        }
    }

    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self.kind() {
            ErrorKind::Validation | ErrorKind::NotFound | ErrorKind::Config => {
                exit_codes::USER_ERROR
            }
            ErrorKind::Format => exit_codes::FORMAT_REJECTED,
            ErrorKind::Transport => exit_codes::OPERATION_FAILED,
        }
    }

    /// Structured details for the JSON error envelope, when the variant has any.
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Error::Validation { field, .. } => Some(serde_json::json!({ "field": field })),
            Error::TaskNotFound(id) => Some(serde_json::json!({ "task_id": id })),
            Error::ProjectNotFound(id) => Some(serde_json::json!({ "project_id": id })),
            Error::LockFailed(path) => Some(serde_json::json!({ "path": path })),
            _ => None,
        }
    }
}

/// Result type alias for VeraTasks operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_kind() {
        assert_eq!(
            Error::validation("title", "required").exit_code(),
            exit_codes::USER_ERROR
        );
        assert_eq!(
            Error::TaskNotFound("t1".to_string()).exit_code(),
            exit_codes::USER_ERROR
        );
        assert_eq!(
            Error::Format("missing tasks".to_string()).exit_code(),
            exit_codes::FORMAT_REJECTED
        );
        assert_eq!(
            Error::Transport("offline".to_string()).exit_code(),
            exit_codes::OPERATION_FAILED
        );
    }

    #[test]
    fn io_errors_are_transport() {
        let err: Error = std::io::Error::new(std::io::ErrorKind::Other, "disk").into();
        assert_eq!(err.kind(), ErrorKind::Transport);
    }

    #[test]
    fn validation_message_names_field() {
        let err = Error::validation("title", "must be at most 100 characters");
        assert_eq!(err.to_string(), "title: must be at most 100 characters");
        assert_eq!(
            err.details(),
            Some(serde_json::json!({ "field": "title" }))
        );
    }
}
