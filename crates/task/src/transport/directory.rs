//! Routes dispatches and awaits to the live connection for each node

use super::connection::{NodeConnection, WorkerEndpoint};
use crate::node::{ResponseChannel, TaskIssuer};
use async_trait::async_trait;
use dashmap::DashMap;
use nodecache_config::DispatchConfig;
use nodecache_core::{CorrelationToken, Error, NodeId, RemoteTask, Result, TaskPayload};
use std::sync::Arc;
use std::time::Duration;

/// The coordinator's set of node connections
#[derive(Debug)]
pub struct NodeDirectory {
    connections: DashMap<NodeId, Arc<NodeConnection>>,
    await_timeout: Option<Duration>,
}

impl NodeDirectory {
    pub fn new(config: &DispatchConfig) -> Self {
        Self {
            connections: DashMap::new(),
            await_timeout: config.await_timeout(),
        }
    }

    /// Register a node, replacing (and disconnecting) any previous connection
    /// under the same id. Returns the endpoint the worker serves.
    pub fn connect(&self, node: NodeId) -> WorkerEndpoint {
        let (connection, endpoint) = NodeConnection::open(node.clone(), self.await_timeout);
        if let Some(previous) = self.connections.insert(node.clone(), connection) {
            previous.disconnect("replaced by a new connection");
        }
        tracing::info!(node = %node, "node connected");
        endpoint
    }

    /// Disconnect a node and forget it
    pub fn disconnect(&self, node: &NodeId) -> bool {
        match self.connections.remove(node) {
            Some((_, connection)) => {
                connection.disconnect("disconnected by coordinator");
                true
            }
            None => false,
        }
    }

    pub fn connection(&self, node: &NodeId) -> Option<Arc<NodeConnection>> {
        self.connections.get(node).map(|entry| entry.value().clone())
    }

    /// Ids of connected nodes that are still online, sorted
    pub fn online_nodes(&self) -> Vec<NodeId> {
        let mut nodes: Vec<_> = self
            .connections
            .iter()
            .filter(|entry| entry.value().is_online())
            .map(|entry| entry.key().clone())
            .collect();
        nodes.sort();
        nodes
    }

    /// Disconnect every node
    pub fn shutdown(&self) {
        let nodes: Vec<NodeId> = self.connections.iter().map(|e| e.key().clone()).collect();
        for node in nodes {
            self.disconnect(&node);
        }
        tracing::info!("node directory shut down");
    }

    fn live_connection(&self, node: &NodeId) -> Result<Arc<NodeConnection>> {
        self.connection(node)
            .ok_or_else(|| Error::node_unreachable(node.as_str(), "node is not connected"))
    }
}

#[async_trait]
impl TaskIssuer for NodeDirectory {
    async fn dispatch(&self, node: &NodeId, task: RemoteTask) -> Result<CorrelationToken> {
        self.live_connection(node)?.dispatch(task)
    }
}

#[async_trait]
impl ResponseChannel for NodeDirectory {
    async fn await_result(&self, node: &NodeId, token: CorrelationToken) -> Result<TaskPayload> {
        let connection = self.live_connection(node)?;
        connection.await_result(&token).await
    }
}
