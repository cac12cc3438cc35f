//! Context for errors that keeps their classification

use super::types::{Error, Result};
use std::fmt::Display;

impl Error {
    /// Prefix the error's own description with `context`.
    ///
    /// The variant, and with it `is_retryable`/`is_not_found`, is preserved.
    /// Variants whose message is fully determined by their fields
    /// (`NotFound`, `NoAvailableNode`, `ShuttingDown`) are returned unchanged.
    #[must_use]
    pub fn context(self, context: impl Display) -> Self {
        match self {
            Error::NodeUnreachable { node, reason } => Error::NodeUnreachable {
                node,
                reason: format!("{context}: {reason}"),
            },
            Error::RemoteTask { node, detail } => Error::RemoteTask {
                node,
                detail: format!("{context}: {detail}"),
            },
            Error::Configuration { message } => Error::Configuration {
                message: format!("{context}: {message}"),
            },
            Error::FileSystem {
                path,
                operation,
                source,
            } => Error::FileSystem {
                path,
                operation: format!("{context} ({operation})"),
                source,
            },
            Error::Json { message, source } => Error::Json {
                message: format!("{context}: {message}"),
                source,
            },
            other => other,
        }
    }
}

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    fn context(self, context: impl Display) -> Result<T>;

    /// Like `context`, building the message only on error
    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Display,
        F: FnOnce() -> C;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<Error>,
{
    fn context(self, context: impl Display) -> Result<T> {
        self.map_err(|e| e.into().context(context))
    }

    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Display,
        F: FnOnce() -> C,
    {
        self.map_err(|e| e.into().context(f()))
    }
}
