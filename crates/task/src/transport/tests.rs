//! Tests for the node transport

use super::*;
use crate::node::{ResponseChannel, TaskIssuer};
use crate::worker::{TaskHandler, Worker};
use async_trait::async_trait;
use nodecache_config::{DispatchConfig, DispatchConfigBuilder};
use nodecache_core::{
    CorrelationToken, Error, NodeId, RemoteTask, ResourceId, TaskPayload, TaskResponse, TaskType,
};
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

struct EchoPath;

#[async_trait]
impl TaskHandler for EchoPath {
    async fn handle(&self, target: &ResourceId) -> anyhow::Result<TaskPayload> {
        Ok(TaskPayload::new(json!({ "path": target.as_str() })))
    }
}

struct Empty;

#[async_trait]
impl TaskHandler for Empty {
    async fn handle(&self, _target: &ResourceId) -> anyhow::Result<TaskPayload> {
        Ok(TaskPayload::new(json!(null)))
    }
}

struct Broken;

#[async_trait]
impl TaskHandler for Broken {
    async fn handle(&self, _target: &ResourceId) -> anyhow::Result<TaskPayload> {
        anyhow::bail!("unsupported container")
    }
}

struct Crash;

#[async_trait]
impl TaskHandler for Crash {
    async fn handle(&self, _target: &ResourceId) -> anyhow::Result<TaskPayload> {
        panic!("decoder bug")
    }
}

fn mediainfo() -> TaskType {
    TaskType::new("mediainfo").unwrap()
}

fn node(name: &str) -> NodeId {
    NodeId::new(name).unwrap()
}

fn task(path: &str) -> RemoteTask {
    RemoteTask::new(mediainfo(), ResourceId::new(path).unwrap())
}

fn directory() -> NodeDirectory {
    NodeDirectory::new(&DispatchConfig::default())
}

#[tokio::test]
async fn test_dispatch_and_await_round_trip() {
    let directory = directory();
    let n1 = node("n1");
    let endpoint = directory.connect(n1.clone());
    let worker = Worker::new(n1.clone()).handler(mediainfo(), Arc::new(EchoPath));
    worker.spawn(endpoint);

    let token = directory.dispatch(&n1, task("/mp3/a.mp3")).await.unwrap();
    assert!(token.belongs_to(&n1));

    let payload = directory.await_result(&n1, token).await.unwrap();
    assert_eq!(payload.as_value(), &json!({ "path": "/mp3/a.mp3" }));
    assert_eq!(directory.connection(&n1).unwrap().pending(), 0);
}

#[tokio::test]
async fn test_tokens_are_unique_and_results_are_correlated() {
    let directory = directory();
    let n1 = node("n1");
    let endpoint = directory.connect(n1.clone());
    Worker::new(n1.clone())
        .handler(mediainfo(), Arc::new(EchoPath))
        .spawn(endpoint);

    let mut tokens = Vec::new();
    for i in 0..20 {
        let path = format!("/mp3/track-{i:02}.mp3");
        let token = directory.dispatch(&n1, task(&path)).await.unwrap();
        tokens.push((path, token));
    }

    let unique: HashSet<_> = tokens.iter().map(|(_, t)| t.value().to_string()).collect();
    assert_eq!(unique.len(), 20);

    // redeem in reverse order; each token yields its own task's result
    for (path, token) in tokens.into_iter().rev() {
        let payload = directory.await_result(&n1, token).await.unwrap();
        assert_eq!(payload.as_value()["path"], json!(path));
    }
}

#[tokio::test]
async fn test_empty_payload_is_remote_task_error() {
    let directory = directory();
    let n1 = node("n1");
    let endpoint = directory.connect(n1.clone());
    Worker::new(n1.clone())
        .handler(mediainfo(), Arc::new(Empty))
        .spawn(endpoint);

    let token = directory.dispatch(&n1, task("/mp3/a.mp3")).await.unwrap();
    let err = directory.await_result(&n1, token).await.unwrap_err();
    match err {
        Error::RemoteTask { node, detail } => {
            assert_eq!(node, "n1");
            assert_eq!(detail, "empty result");
        }
        other => panic!("expected remote task error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_handler_failure_is_remote_task_error() {
    let directory = directory();
    let n1 = node("n1");
    let endpoint = directory.connect(n1.clone());
    Worker::new(n1.clone())
        .handler(mediainfo(), Arc::new(Broken))
        .spawn(endpoint);

    let token = directory.dispatch(&n1, task("/mp3/a.mp3")).await.unwrap();
    let err = directory.await_result(&n1, token).await.unwrap_err();
    assert!(matches!(err, Error::RemoteTask { ref detail, .. } if detail.contains("unsupported container")));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_unknown_task_type_is_remote_task_error() {
    let directory = directory();
    let n1 = node("n1");
    let endpoint = directory.connect(n1.clone());
    Worker::new(n1.clone()).spawn(endpoint);

    let token = directory.dispatch(&n1, task("/mp3/a.mp3")).await.unwrap();
    let err = directory.await_result(&n1, token).await.unwrap_err();
    assert!(matches!(err, Error::RemoteTask { ref detail, .. } if detail.contains("no handler")));
}

#[tokio::test]
async fn test_dropped_worker_makes_node_unreachable() {
    let directory = directory();
    let n1 = node("n1");
    let endpoint = directory.connect(n1.clone());

    let token = directory.dispatch(&n1, task("/mp3/a.mp3")).await.unwrap();
    drop(endpoint);

    let err = directory.await_result(&n1, token).await.unwrap_err();
    assert!(err.is_retryable(), "{err}");

    let err = directory.dispatch(&n1, task("/mp3/b.mp3")).await.unwrap_err();
    assert!(matches!(err, Error::NodeUnreachable { .. }));
    assert!(directory.online_nodes().is_empty());
}

#[tokio::test]
async fn test_disconnect_fails_waiting_callers() {
    let directory = Arc::new(directory());
    let n1 = node("n1");
    let _endpoint = directory.connect(n1.clone());

    let token = directory.dispatch(&n1, task("/mp3/a.mp3")).await.unwrap();
    let waiting = {
        let directory = directory.clone();
        let n1 = n1.clone();
        tokio::spawn(async move { directory.await_result(&n1, token).await })
    };

    tokio::task::yield_now().await;
    assert!(directory.disconnect(&n1));

    let err = waiting.await.unwrap().unwrap_err();
    assert!(matches!(err, Error::NodeUnreachable { .. }));

    let err = directory.dispatch(&n1, task("/mp3/b.mp3")).await.unwrap_err();
    assert!(err.to_string().contains("not connected"));
}

#[tokio::test]
async fn test_reply_before_await_is_kept() {
    let (connection, mut endpoint) = NodeConnection::open(node("n1"), None);

    let token = connection.dispatch(task("/mp3/a.mp3")).unwrap();
    let request = endpoint.requests.recv().await.unwrap();
    assert_eq!(request.token, token.value());

    endpoint
        .replies
        .send(TaskReply {
            token: request.token,
            response: TaskResponse::Completed(TaskPayload::new(json!({"ok": true}))),
        })
        .unwrap();

    let payload = connection.await_result(&token).await.unwrap();
    assert_eq!(payload.as_value(), &json!({"ok": true}));
}

#[tokio::test]
async fn test_tokens_are_single_use_and_node_scoped() {
    let (connection, mut endpoint) = NodeConnection::open(node("n1"), None);

    let token = connection.dispatch(task("/mp3/a.mp3")).unwrap();
    let request = endpoint.requests.recv().await.unwrap();
    connection.complete(
        &request.token,
        TaskResponse::Completed(TaskPayload::new(json!(1))),
    );
    assert!(connection.await_result(&token).await.is_ok());

    let err = connection.await_result(&token).await.unwrap_err();
    assert!(err.to_string().contains("no outstanding task"));

    let foreign = CorrelationToken::new(node("n2"), token.value());
    let err = connection.await_result(&foreign).await.unwrap_err();
    assert!(err.to_string().contains("another node"));

    // late or unknown replies are dropped without effect
    connection.complete("n1-999", TaskResponse::Failed("late".to_string()));
    assert_eq!(connection.pending(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_await_timeout_counts_as_unreachable() {
    let config = DispatchConfigBuilder::new()
        .await_timeout(Duration::from_millis(500))
        .build()
        .unwrap();
    let directory = NodeDirectory::new(&config);
    let n1 = node("n1");
    // endpoint kept alive but never served
    let _endpoint = directory.connect(n1.clone());

    let token = directory.dispatch(&n1, task("/mp3/a.mp3")).await.unwrap();
    let err = directory.await_result(&n1, token).await.unwrap_err();
    assert!(matches!(err, Error::NodeUnreachable { ref reason, .. } if reason.contains("no answer")));
    assert_eq!(directory.connection(&n1).unwrap().pending(), 0);
    // a slow node is not marked offline
    assert_eq!(directory.online_nodes(), vec![n1]);
}

#[tokio::test]
async fn test_shutdown_disconnects_every_node() {
    let directory = directory();
    let _e1 = directory.connect(node("n1"));
    let _e2 = directory.connect(node("n2"));
    assert_eq!(directory.online_nodes(), vec![node("n1"), node("n2")]);

    directory.shutdown();
    assert!(directory.online_nodes().is_empty());
    assert!(directory.dispatch(&node("n1"), task("/a")).await.is_err());
}

#[test]
fn test_classify_response() {
    let n = node("n1");
    assert!(classify_response(&n, TaskResponse::Completed(TaskPayload::new(json!([1])))).is_ok());
    assert!(matches!(
        classify_response(&n, TaskResponse::Completed(TaskPayload::new(json!({})))),
        Err(Error::RemoteTask { .. })
    ));
    assert!(matches!(
        classify_response(&n, TaskResponse::Failed("x".into())),
        Err(Error::RemoteTask { .. })
    ));
}

#[tokio::test]
async fn test_reconnect_never_reuses_tokens() {
    let directory = directory();
    let n1 = node("n1");
    let _first = directory.connect(n1.clone());

    let token_a = directory.dispatch(&n1, task("/mp3/a.mp3")).await.unwrap();

    let endpoint = directory.connect(n1.clone());
    Worker::new(n1.clone())
        .handler(mediainfo(), Arc::new(EchoPath))
        .spawn(endpoint);

    let token_b = directory.dispatch(&n1, task("/mp3/b.mp3")).await.unwrap();
    assert_ne!(token_a, token_b);
    assert!(token_a.belongs_to(&n1) && token_b.belongs_to(&n1));

    let connection = directory.connection(&n1).unwrap();
    assert!(connection.issued(&token_b));
    assert!(!connection.issued(&token_a));

    // the old token cannot collect the new connection's answer
    let err = directory.await_result(&n1, token_a).await.unwrap_err();
    assert!(matches!(err, Error::NodeUnreachable { ref reason, .. } if reason.contains("earlier connection")));

    let payload = directory.await_result(&n1, token_b).await.unwrap();
    assert_eq!(payload.as_value(), &json!({ "path": "/mp3/b.mp3" }));
}

#[tokio::test(start_paused = true)]
async fn test_unredeemed_answers_are_released() {
    let (connection, mut endpoint) = NodeConnection::open(node("n1"), None);

    let mut abandoned = Vec::new();
    for i in 0..3 {
        let token = connection.dispatch(task(&format!("/mp3/{i}.mp3"))).unwrap();
        let request = endpoint.requests.recv().await.unwrap();
        connection.complete(
            &request.token,
            TaskResponse::Completed(TaskPayload::new(json!(i))),
        );
        abandoned.push(token);
    }
    assert_eq!(connection.pending(), 0);
    assert_eq!(connection.unclaimed(), 3);

    // still redeemable inside the retention window
    let early = abandoned.remove(0);
    assert_eq!(
        connection.await_result(&early).await.unwrap().as_value(),
        &json!(0)
    );
    assert_eq!(connection.unclaimed(), 2);

    tokio::time::advance(UNCLAIMED_REPLY_RETENTION + Duration::from_secs(1)).await;
    let _next = connection.dispatch(task("/mp3/next.mp3")).unwrap();
    assert_eq!(connection.unclaimed(), 0);

    for token in abandoned {
        let err = connection.await_result(&token).await.unwrap_err();
        assert!(err.to_string().contains("no outstanding task"));
    }
}

#[tokio::test]
async fn test_panicking_handler_is_answered_as_failure() {
    let directory = directory();
    let n1 = node("n1");
    let endpoint = directory.connect(n1.clone());
    let worker = Worker::new(n1.clone())
        .handler(mediainfo(), Arc::new(Crash))
        .spawn(endpoint);

    let token = directory.dispatch(&n1, task("/mp3/a.mp3")).await.unwrap();
    let err = directory.await_result(&n1, token).await.unwrap_err();
    match err {
        Error::RemoteTask { node, detail } => {
            assert_eq!(node, "n1");
            assert!(detail.contains("panicked"), "{detail}");
            assert!(detail.contains("decoder bug"), "{detail}");
        }
        other => panic!("expected remote task error, got {other:?}"),
    }

    // the worker keeps serving after a handler panic
    let token = directory.dispatch(&n1, task("/mp3/b.mp3")).await.unwrap();
    assert!(directory.await_result(&n1, token).await.is_err());
    assert_eq!(directory.online_nodes(), vec![n1.clone()]);

    directory.disconnect(&n1);
    assert_eq!(worker.await.unwrap(), 2);
}
