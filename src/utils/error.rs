//! The `error` module defines the error type used across `sensorhub`.
//!
//! None of these errors is fatal to the process. Most are logged and
//! swallowed at the point they occur (queue overflow, pull failures);
//! rule-management errors are handed back to the caller.

use crate::client::Permission;

/// Result type alias
pub type Result<T> = std::result::Result<T, HubError>;

#[derive(Debug, thiserror::Error)]
pub enum HubError {
    /// A frame or payload could not be parsed into a `Message`.
    #[error("malformed message: {0}")]
    MalformedMessage(String),

    /// Publish/subscribe without the required permission. Returned by
    /// `Client::require`; the websocket adapter logs it and stays silent.
    #[error("permission denied: {kind:?} on scope '{scope}'")]
    PermissionDenied { scope: String, kind: Permission },

    #[error("queue overflow: {0}")]
    QueueOverflow(String),

    #[error("queue closed: {0}")]
    QueueClosed(String),

    #[error("rule '{0}' already exists")]
    DuplicateRuleName(String),

    #[error("rule '{0}' not found")]
    RuleNotFound(String),

    #[error("invalid rule: {0}")]
    InvalidRule(String),

    #[error("pull from {endpoint} failed: {reason}")]
    PullFailure { endpoint: String, reason: String },

    #[error("storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("database error: {0}")]
    Database(#[from] sled::Error),
}
