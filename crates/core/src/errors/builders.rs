//! Builder methods for creating errors with context

use super::types::Error;
use std::path::PathBuf;

impl Error {
    /// Create a not-found error for a resource/task-type slot
    #[must_use]
    pub fn not_found(resource: impl Into<String>, task_type: impl Into<String>) -> Self {
        Error::NotFound {
            resource: resource.into(),
            task_type: task_type.into(),
        }
    }

    /// Create a node unreachable error
    #[must_use]
    pub fn node_unreachable(node: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::NodeUnreachable {
            node: node.into(),
            reason: reason.into(),
        }
    }

    /// Create a remote task error
    #[must_use]
    pub fn remote_task(node: impl Into<String>, detail: impl Into<String>) -> Self {
        Error::RemoteTask {
            node: node.into(),
            detail: detail.into(),
        }
    }

    /// Create a no-available-node error
    #[must_use]
    pub fn no_available_node(resource: impl Into<String>, attempts: u32) -> Self {
        Error::NoAvailableNode {
            resource: resource.into(),
            attempts,
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration {
            message: message.into(),
        }
    }

    /// Create a file system error
    #[must_use]
    pub fn file_system(
        path: impl Into<PathBuf>,
        operation: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        Error::FileSystem {
            path: path.into(),
            operation: operation.into(),
            source,
        }
    }

    /// Create a JSON error with a custom message
    #[must_use]
    pub fn json(message: impl Into<String>, source: serde_json::Error) -> Self {
        Error::Json {
            message: message.into(),
            source,
        }
    }

    #[must_use]
    pub fn shutting_down(component: impl Into<String>) -> Self {
        Error::ShuttingDown {
            component: component.into(),
        }
    }
}
