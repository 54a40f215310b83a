//! Error handling module for the UniDB client.
//!
//! One error type for transport, decoding and repository failures, each
//! carrying a stable code the presentation layer can switch on.

use crate::models::Table;

/// Error codes as constants to avoid stringly-typed errors.
pub mod codes {
    pub const TRANSPORT_ERROR: &str = "TRANSPORT_ERROR";
    pub const TIMEOUT: &str = "TIMEOUT";
    pub const HTTP_STATUS: &str = "HTTP_STATUS";
    pub const DECODE_ERROR: &str = "DECODE_ERROR";
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
    pub const CONFLICT: &str = "CONFLICT";
    pub const CONFIG_ERROR: &str = "CONFIG_ERROR";
    pub const LOAD_FAILED: &str = "LOAD_FAILED";
    pub const CLOSED: &str = "CLOSED";
}

/// Client error type.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ClientError {
    /// Backend unreachable or the connection broke mid-request
    #[error("request to {table} failed: {message}")]
    Transport { table: Table, message: String },
    /// Request exceeded the configured timeout
    #[error("request to {table} timed out")]
    Timeout { table: Table },
    /// Backend answered with a non-2xx status
    #[error("{table} returned HTTP {status}: {body}")]
    Status {
        table: Table,
        status: u16,
        body: String,
    },
    /// A row did not match the expected schema
    #[error("invalid {table} row: {message}")]
    Decode { table: Table, message: String },
    /// Entity not found
    #[error("{0}")]
    NotFound(String),
    /// Rejected input
    #[error("{0}")]
    Validation(String),
    /// Write refused because of the current entity state
    #[error("{0}")]
    Conflict(String),
    /// Missing or malformed configuration
    #[error("{0}")]
    Config(String),
    /// Every table fetch of a refresh cycle failed
    #[error("failed to load data: {0}")]
    LoadFailed(String),
    /// The view-model owner was torn down
    #[error("view-model closed")]
    Closed,
}

impl ClientError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            ClientError::Transport { .. } => codes::TRANSPORT_ERROR,
            ClientError::Timeout { .. } => codes::TIMEOUT,
            ClientError::Status { .. } => codes::HTTP_STATUS,
            ClientError::Decode { .. } => codes::DECODE_ERROR,
            ClientError::NotFound(_) => codes::NOT_FOUND,
            ClientError::Validation(_) => codes::VALIDATION_ERROR,
            ClientError::Conflict(_) => codes::CONFLICT,
            ClientError::Config(_) => codes::CONFIG_ERROR,
            ClientError::LoadFailed(_) => codes::LOAD_FAILED,
            ClientError::Closed => codes::CLOSED,
        }
    }

    /// Map a reqwest failure for `table` onto the taxonomy.
    pub fn from_reqwest(table: Table, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClientError::Timeout { table }
        } else if let Some(status) = err.status() {
            ClientError::Status {
                table,
                status: status.as_u16(),
                body: String::new(),
            }
        } else {
            ClientError::Transport {
                table,
                message: err.to_string(),
            }
        }
    }
}
