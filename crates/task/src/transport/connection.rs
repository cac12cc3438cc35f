//! Coordinator-side handle to one worker node

use dashmap::DashMap;
use nodecache_core::{
    CorrelationToken, Error, NodeId, RemoteTask, Result, TaskPayload, TaskResponse,
    EMPTY_RESULT_DETAIL,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, Notify};
use tokio::time::Instant;

/// How long an answer nobody has redeemed yet is kept for a late `await_result`
pub const UNCLAIMED_REPLY_RETENTION: Duration = Duration::from_secs(60);

/// Distinguishes successive connections to the same node within this process
static NEXT_EPOCH: AtomicU64 = AtomicU64::new(1);

/// A task sent to a worker under a correlation token
#[derive(Debug, Clone)]
pub struct TaskRequest {
    pub token: String,
    pub task: RemoteTask,
}

/// A worker's answer for a correlation token
#[derive(Debug, Clone)]
pub struct TaskReply {
    pub token: String,
    pub response: TaskResponse,
}

/// The worker's side of a connection.
///
/// Dropping it (or just its reply sender) is how a worker goes away; the
/// coordinator then fails every call still waiting on that node.
#[derive(Debug)]
pub struct WorkerEndpoint {
    pub node: NodeId,
    pub requests: mpsc::UnboundedReceiver<TaskRequest>,
    pub replies: mpsc::UnboundedSender<TaskReply>,
}

/// Connection from the coordinator to a single worker node.
///
/// Every dispatch registers a single-use completion slot keyed by a fresh
/// token; the reply reader routes each answer to its slot. Tokens have the
/// form `<node>-<epoch>-<sequence>`, so a token from an earlier connection to
/// the same node never matches a slot on a later one.
#[derive(Debug)]
pub struct NodeConnection {
    node: NodeId,
    /// `<node>-<epoch>-`, the prefix of every token this connection issues
    token_prefix: String,
    /// Dropped on disconnect so the worker's request loop ends
    requests: Mutex<Option<mpsc::UnboundedSender<TaskRequest>>>,
    /// Completion side of each outstanding slot, taken by the reply reader
    completions: DashMap<String, oneshot::Sender<TaskResponse>>,
    /// Waiting side of each outstanding slot, taken by `await_result`
    waiters: DashMap<String, oneshot::Receiver<TaskResponse>>,
    /// Answered tokens whose waiter has not been taken, with the answer time
    unclaimed: DashMap<String, Instant>,
    next_sequence: AtomicU64,
    online: AtomicBool,
    offline: Notify,
    await_timeout: Option<Duration>,
}

impl NodeConnection {
    /// Open a connection and start its reply reader.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn open(node: NodeId, await_timeout: Option<Duration>) -> (Arc<Self>, WorkerEndpoint) {
        let (request_tx, request_rx) = mpsc::unbounded_channel();
        let (reply_tx, reply_rx) = mpsc::unbounded_channel();

        let epoch = NEXT_EPOCH.fetch_add(1, Ordering::Relaxed);
        let connection = Arc::new(Self {
            token_prefix: format!("{node}-{epoch}-"),
            node: node.clone(),
            requests: Mutex::new(Some(request_tx)),
            completions: DashMap::new(),
            waiters: DashMap::new(),
            unclaimed: DashMap::new(),
            next_sequence: AtomicU64::new(1),
            online: AtomicBool::new(true),
            offline: Notify::new(),
            await_timeout,
        });

        tokio::spawn(Self::read_replies(connection.clone(), reply_rx));

        let endpoint = WorkerEndpoint {
            node,
            requests: request_rx,
            replies: reply_tx,
        };
        (connection, endpoint)
    }

    async fn read_replies(connection: Arc<Self>, mut replies: mpsc::UnboundedReceiver<TaskReply>) {
        while let Some(reply) = replies.recv().await {
            connection.complete(&reply.token, reply.response);
        }
        connection.disconnect("worker closed the connection");
    }

    pub fn node(&self) -> &NodeId {
        &self.node
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Number of dispatched tasks the worker has not answered yet
    pub fn pending(&self) -> usize {
        self.completions.len()
    }

    /// Number of answers still waiting for their token to be redeemed
    pub fn unclaimed(&self) -> usize {
        self.unclaimed.len()
    }

    /// Whether `token` was issued by this connection
    pub fn issued(&self, token: &CorrelationToken) -> bool {
        token.belongs_to(&self.node) && token.value().starts_with(&self.token_prefix)
    }

    /// Send a task and return its token without waiting for the result
    pub fn dispatch(&self, task: RemoteTask) -> Result<CorrelationToken> {
        if !self.is_online() {
            return Err(Error::node_unreachable(self.node.as_str(), "node is offline"));
        }

        self.release_unclaimed();

        let sequence = self.next_sequence.fetch_add(1, Ordering::SeqCst);
        let token = format!("{}{}", self.token_prefix, sequence);

        // slot first, so an instant reply always finds it
        let (tx, rx) = oneshot::channel();
        self.completions.insert(token.clone(), tx);
        self.waiters.insert(token.clone(), rx);

        let request = TaskRequest {
            token: token.clone(),
            task,
        };
        let sent = match self.requests.lock().as_ref() {
            Some(requests) => requests.send(request).is_ok(),
            None => false,
        };
        if !sent {
            self.forget(&token);
            self.disconnect("worker stopped accepting requests");
            return Err(Error::node_unreachable(
                self.node.as_str(),
                "connection refused",
            ));
        }

        tracing::trace!(node = %self.node, token = %token, "task dispatched");
        Ok(CorrelationToken::new(self.node.clone(), token))
    }

    /// Wait for the answer to a token issued by this connection
    pub async fn await_result(&self, token: &CorrelationToken) -> Result<TaskPayload> {
        if !token.belongs_to(&self.node) {
            return Err(Error::node_unreachable(
                self.node.as_str(),
                format!("token {token} was issued by another node"),
            ));
        }

        // registered before the online check so a concurrent disconnect is never missed
        let offline = self.offline.notified();
        tokio::pin!(offline);

        if !token.value().starts_with(&self.token_prefix) {
            return Err(Error::node_unreachable(
                self.node.as_str(),
                format!("token {token} was issued by an earlier connection"),
            ));
        }

        self.unclaimed.remove(token.value());
        let Some((_, waiter)) = self.waiters.remove(token.value()) else {
            return Err(Error::node_unreachable(
                self.node.as_str(),
                format!("no outstanding task for token {token}"),
            ));
        };
        if !self.is_online() {
            return Err(Error::node_unreachable(self.node.as_str(), "node went offline"));
        }

        let answer = async {
            tokio::select! {
                biased;
                response = waiter => response.map_err(|_| {
                    Error::node_unreachable(
                        self.node.as_str(),
                        "connection closed before the task completed",
                    )
                }),
                _ = &mut offline => Err(Error::node_unreachable(
                    self.node.as_str(),
                    "node went offline",
                )),
            }
        };

        let response = match self.await_timeout {
            Some(limit) => match tokio::time::timeout(limit, answer).await {
                Ok(response) => response,
                Err(_) => {
                    self.completions.remove(token.value());
                    return Err(Error::node_unreachable(
                        self.node.as_str(),
                        format!("no answer within {limit:?}"),
                    ));
                }
            },
            None => answer.await,
        }?;

        classify_response(&self.node, response)
    }

    /// Route a worker's answer to the caller waiting on `token`
    pub fn complete(&self, token: &str, response: TaskResponse) {
        match self.completions.remove(token) {
            Some((_, slot)) => {
                if slot.send(response).is_err() {
                    tracing::debug!(node = %self.node, token = %token, "caller stopped waiting");
                } else if self.waiters.contains_key(token) {
                    self.unclaimed.insert(token.to_string(), Instant::now());
                }
            }
            None => {
                tracing::warn!(node = %self.node, token = %token, "dropping reply for unknown token");
            }
        }
        self.release_unclaimed();
    }

    /// Drop answers whose token was not redeemed within the retention window
    fn release_unclaimed(&self) {
        let now = Instant::now();
        self.unclaimed.retain(|token, answered_at| {
            if now.duration_since(*answered_at) < UNCLAIMED_REPLY_RETENTION {
                return true;
            }
            self.waiters.remove(token);
            tracing::debug!(node = %self.node, token = %token, "released unclaimed reply");
            false
        });
    }

    /// Mark the node offline and fail every outstanding call
    pub fn disconnect(&self, reason: &str) {
        if self.online.swap(false, Ordering::SeqCst) {
            tracing::warn!(
                node = %self.node,
                pending = self.completions.len(),
                reason = %reason,
                "node disconnected"
            );
        }
        self.offline.notify_waiters();
        self.requests.lock().take();
        self.completions.clear();
        self.waiters.clear();
        self.unclaimed.clear();
    }

    fn forget(&self, token: &str) {
        self.completions.remove(token);
        self.waiters.remove(token);
    }
}

/// Classify a worker response; empty payloads are task failures
pub fn classify_response(node: &NodeId, response: TaskResponse) -> Result<TaskPayload> {
    match response {
        TaskResponse::Completed(payload) if payload.is_empty() => {
            Err(Error::remote_task(node.as_str(), EMPTY_RESULT_DETAIL))
        }
        TaskResponse::Completed(payload) => Ok(payload),
        TaskResponse::Failed(detail) => Err(Error::remote_task(node.as_str(), detail)),
    }
}
