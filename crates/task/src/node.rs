//! Contracts between the orchestrator and the node pool / node transport
//!
//! Implementations classify every transport failure into one of the core
//! error variants before returning:
//!
//! - `NodeSelector::select_node`: `NoAvailableNode`
//! - `TaskIssuer::dispatch`: `NodeUnreachable`
//! - `ResponseChannel::await_result`: `NodeUnreachable` or `RemoteTask`

use async_trait::async_trait;
use nodecache_core::{CorrelationToken, FingerprintedResource, NodeId, RemoteTask, Result, TaskPayload};

/// Picks a worker node that currently hosts a resource.
///
/// Successive calls may return different nodes; callers must not assume
/// determinism.
#[async_trait]
pub trait NodeSelector: Send + Sync {
    async fn select_node(&self, resource: &FingerprintedResource) -> Result<NodeId>;
}

/// Sends a task to a node without waiting for it to complete
#[async_trait]
pub trait TaskIssuer: Send + Sync {
    /// Returns a fresh token scoped to `node`
    async fn dispatch(&self, node: &NodeId, task: RemoteTask) -> Result<CorrelationToken>;
}

/// Redeems a correlation token for the task's result
#[async_trait]
pub trait ResponseChannel: Send + Sync {
    /// Suspends until `node` answers for `token` or is known to be gone.
    /// An empty payload is reported as a remote task error.
    async fn await_result(&self, node: &NodeId, token: CorrelationToken) -> Result<TaskPayload>;
}
