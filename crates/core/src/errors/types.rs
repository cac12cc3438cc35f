//! Core error type definitions

use std::path::PathBuf;

/// Result type alias for nodecache operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for nodecache operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No cached entry exists for the resource and task type
    #[error("no '{task_type}' entry cached for '{resource}'")]
    NotFound { resource: String, task_type: String },

    /// The node refused dispatch, disconnected, or never answered
    #[error("node '{node}' is unreachable: {reason}")]
    NodeUnreachable { node: String, reason: String },

    /// The node ran the task and reported that it failed
    #[error("remote task failed on node '{node}': {detail}")]
    RemoteTask { node: String, detail: String },

    /// No live node can serve the resource
    #[error("no node available for '{resource}' after {attempts} attempt(s)")]
    NoAvailableNode { resource: String, attempts: u32 },

    /// Configuration errors
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// File system operations
    #[error("file system {operation} operation failed for '{}': {source}", path.display())]
    FileSystem {
        path: PathBuf,
        operation: String,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: serde_json::Error,
    },

    /// A component was used after shutdown
    #[error("{component} is shutting down")]
    ShuttingDown { component: String },
}

impl Error {
    /// Only node loss is worth another attempt on a different node
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::NodeUnreachable { .. })
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Errors that end a `get_or_compute` call as soon as they are seen
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !matches!(self, Self::NodeUnreachable { .. } | Self::NotFound { .. })
    }
}
