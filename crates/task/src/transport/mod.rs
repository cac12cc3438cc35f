//! In-process node transport
//!
//! The coordinator holds one `NodeConnection` per worker. Dispatch is
//! non-blocking and returns a node-scoped correlation token; answers arrive on
//! the reply channel and are routed back to whoever awaits that token. Node loss
//! (dropped endpoint, explicit disconnect, or an expired wait) surfaces as
//! `NodeUnreachable`; a task that ran and failed surfaces as `RemoteTask`.

mod connection;
mod directory;

#[cfg(test)]
mod tests;

pub use connection::{
    classify_response, NodeConnection, TaskReply, TaskRequest, WorkerEndpoint,
    UNCLAIMED_REPLY_RETENTION,
};
pub use directory::NodeDirectory;
