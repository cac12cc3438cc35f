//! Worker-side runtime
//!
//! A `Worker` serves one `WorkerEndpoint`: it runs the handler registered for
//! each request's task type and sends the outcome back under the request's
//! token. Requests are handled concurrently.

use crate::transport::{TaskReply, TaskRequest, WorkerEndpoint};
use async_trait::async_trait;
use nodecache_core::{NodeId, ResourceId, TaskPayload, TaskResponse, TaskType};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle, JoinSet};

/// Computation a worker runs against a file it hosts
#[async_trait]
pub trait TaskHandler: Send + Sync {
    async fn handle(&self, target: &ResourceId) -> anyhow::Result<TaskPayload>;
}

/// Node-side task executor
#[derive(Clone)]
pub struct Worker {
    node: NodeId,
    handlers: HashMap<TaskType, Arc<dyn TaskHandler>>,
}

impl Worker {
    pub fn new(node: NodeId) -> Self {
        Self {
            node,
            handlers: HashMap::new(),
        }
    }

    /// Register the handler for a task type
    pub fn handler(mut self, task_type: TaskType, handler: Arc<dyn TaskHandler>) -> Self {
        self.handlers.insert(task_type, handler);
        self
    }

    pub fn node(&self) -> &NodeId {
        &self.node
    }

    /// Serve requests until the coordinator closes the request channel.
    /// Returns the number of requests answered.
    pub async fn run(self, endpoint: WorkerEndpoint) -> u64 {
        let WorkerEndpoint {
            node,
            mut requests,
            replies,
        } = endpoint;
        if node != self.node {
            tracing::warn!(worker = %self.node, endpoint = %node, "worker serving another node's endpoint");
        }

        let worker = Arc::new(self);
        let mut in_flight = JoinSet::new();
        let mut answered = 0u64;

        while let Some(request) = requests.recv().await {
            let worker = worker.clone();
            let replies = replies.clone();
            in_flight.spawn(async move { worker.answer(request, &replies).await });

            while let Some(done) = in_flight.try_join_next() {
                answered += u64::from(done.unwrap_or(false));
            }
        }

        while let Some(done) = in_flight.join_next().await {
            answered += u64::from(done.unwrap_or(false));
        }

        tracing::debug!(node = %worker.node, answered, "worker stopped");
        answered
    }

    /// Run on a background task
    pub fn spawn(self, endpoint: WorkerEndpoint) -> JoinHandle<u64> {
        tokio::spawn(self.run(endpoint))
    }

    async fn answer(&self, request: TaskRequest, replies: &mpsc::UnboundedSender<TaskReply>) -> bool {
        let TaskRequest { token, task } = request;
        let response = match self.handlers.get(&task.task_type) {
            Some(handler) => {
                // own task, so a panicking handler still gets an answer sent
                let handler = handler.clone();
                let target = task.target.clone();
                match tokio::spawn(async move { handler.handle(&target).await }).await {
                    Ok(Ok(payload)) => TaskResponse::Completed(payload),
                    Ok(Err(e)) => {
                        tracing::debug!(node = %self.node, target = %task.target, error = %e, "task failed");
                        TaskResponse::Failed(format!("{e:#}"))
                    }
                    Err(e) => {
                        tracing::error!(node = %self.node, target = %task.target, "task handler aborted");
                        TaskResponse::Failed(aborted_detail(&task.task_type, e))
                    }
                }
            }
            None => TaskResponse::Failed(format!(
                "no handler for task type '{}'",
                task.task_type
            )),
        };

        replies.send(TaskReply { token, response }).is_ok()
    }
}

fn aborted_detail(task_type: &TaskType, error: JoinError) -> String {
    if !error.is_panic() {
        return format!("handler for '{task_type}' was cancelled");
    }
    let panic = error.into_panic();
    let message = panic
        .downcast_ref::<&str>()
        .map(|m| (*m).to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown cause".to_string());
    format!("handler for '{task_type}' panicked: {message}")
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut task_types: Vec<_> = self.handlers.keys().collect();
        task_types.sort();
        f.debug_struct("Worker")
            .field("node", &self.node)
            .field("task_types", &task_types)
            .finish()
    }
}
