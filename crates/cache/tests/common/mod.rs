//! Recording test doubles for the node pool and node transport

#![allow(dead_code)]

use async_trait::async_trait;
use nodecache_cache::CacheOrchestrator;
use nodecache_config::DispatchConfig;
use nodecache_core::{
    CorrelationToken, Error, Fingerprint, FingerprintedResource, NodeId, RemoteTask, ResourceId,
    Result, TaskPayload, TaskResponse, TaskType,
};
use nodecache_task::{classify_response, NodeSelector, ResponseChannel, TaskIssuer};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub fn node(name: &str) -> NodeId {
    NodeId::new(name).unwrap()
}

pub fn mediainfo() -> TaskType {
    TaskType::new("mediainfo").unwrap()
}

pub fn resource(fingerprint: &str) -> FingerprintedResource {
    FingerprintedResource::new(
        ResourceId::new("/x264/Some.Movie.2009.720p/some.movie.mkv").unwrap(),
        Fingerprint::new(fingerprint).unwrap(),
        734_003_200,
    )
}

/// Hands out the scripted nodes in order, repeating the last one
pub struct ScriptedSelector {
    nodes: Vec<NodeId>,
    calls: AtomicUsize,
}

impl ScriptedSelector {
    pub fn new(nodes: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            nodes: nodes.iter().map(|n| node(n)).collect(),
            calls: AtomicUsize::new(0),
        })
    }

    /// A selector with no candidate nodes
    pub fn empty() -> Arc<Self> {
        Self::new(&[])
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NodeSelector for ScriptedSelector {
    async fn select_node(&self, resource: &FingerprintedResource) -> Result<NodeId> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        match self.nodes.get(call).or_else(|| self.nodes.last()) {
            Some(node) => Ok(node.clone()),
            None => Err(Error::no_available_node(resource.identity().as_str(), 0)),
        }
    }
}

/// Records every dispatch; nodes listed as refusing fail with `NodeUnreachable`
#[derive(Default)]
pub struct RecordingIssuer {
    refusing: Vec<NodeId>,
    dispatched: Mutex<Vec<(NodeId, RemoteTask)>>,
}

impl RecordingIssuer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn refusing(nodes: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            refusing: nodes.iter().map(|n| node(n)).collect(),
            dispatched: Mutex::new(Vec::new()),
        })
    }

    pub fn dispatches(&self) -> usize {
        self.dispatched.lock().len()
    }

    pub fn dispatched_nodes(&self) -> Vec<NodeId> {
        self.dispatched.lock().iter().map(|(n, _)| n.clone()).collect()
    }

    pub fn dispatched_tasks(&self) -> Vec<RemoteTask> {
        self.dispatched.lock().iter().map(|(_, t)| t.clone()).collect()
    }
}

#[async_trait]
impl TaskIssuer for RecordingIssuer {
    async fn dispatch(&self, node: &NodeId, task: RemoteTask) -> Result<CorrelationToken> {
        let sequence = {
            let mut dispatched = self.dispatched.lock();
            dispatched.push((node.clone(), task));
            dispatched.len()
        };
        if self.refusing.contains(node) {
            return Err(Error::node_unreachable(node.as_str(), "connection refused"));
        }
        Ok(CorrelationToken::new(node.clone(), format!("{node}-{sequence}")))
    }
}

/// What a node answers when its result is awaited
#[derive(Debug, Clone)]
pub enum Answer {
    Payload(Value),
    Failed(&'static str),
    Unreachable,
}

/// Answers per node, by default with the number of answers given so far
pub struct ScriptedResponses {
    answers: HashMap<NodeId, Answer>,
    delay: Option<Duration>,
    awaited: Mutex<Vec<CorrelationToken>>,
}

impl ScriptedResponses {
    pub fn counting() -> Arc<Self> {
        Self::build(HashMap::new(), None)
    }

    pub fn answering(answers: &[(&str, Answer)]) -> Arc<Self> {
        Self::build(
            answers.iter().map(|(n, a)| (node(n), a.clone())).collect(),
            None,
        )
    }

    /// Counting answers that each take `delay`
    pub fn slow(delay: Duration) -> Arc<Self> {
        Self::build(HashMap::new(), Some(delay))
    }

    fn build(answers: HashMap<NodeId, Answer>, delay: Option<Duration>) -> Arc<Self> {
        Arc::new(Self {
            answers,
            delay,
            awaited: Mutex::new(Vec::new()),
        })
    }

    pub fn awaits(&self) -> usize {
        self.awaited.lock().len()
    }

    pub fn awaited_tokens(&self) -> Vec<CorrelationToken> {
        self.awaited.lock().clone()
    }
}

#[async_trait]
impl ResponseChannel for ScriptedResponses {
    async fn await_result(&self, node: &NodeId, token: CorrelationToken) -> Result<TaskPayload> {
        let count = {
            let mut awaited = self.awaited.lock();
            awaited.push(token);
            awaited.len()
        };
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let response = match self.answers.get(node) {
            None => TaskResponse::Completed(TaskPayload::new(Value::from(count))),
            Some(Answer::Payload(value)) => TaskResponse::Completed(TaskPayload::new(value.clone())),
            Some(Answer::Failed(detail)) => TaskResponse::Failed((*detail).to_string()),
            Some(Answer::Unreachable) => {
                return Err(Error::node_unreachable(node.as_str(), "disconnected"));
            }
        };
        classify_response(node, response)
    }
}

pub fn orchestrator(
    config: DispatchConfig,
    selector: Arc<ScriptedSelector>,
    issuer: Arc<RecordingIssuer>,
    responses: Arc<ScriptedResponses>,
) -> CacheOrchestrator {
    CacheOrchestrator::builder()
        .config(config)
        .selector(selector)
        .issuer(mediainfo(), issuer)
        .responses(responses)
        .build()
        .unwrap()
}
