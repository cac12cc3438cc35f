//! Remote task requests and the responses workers send back

use super::newtypes::{ResourceId, TaskType};
use serde::{Deserialize, Serialize};

/// A computation to run on a worker against one of the files it hosts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteTask {
    pub task_type: TaskType,
    pub target: ResourceId,
}

impl RemoteTask {
    pub fn new(task_type: TaskType, target: ResourceId) -> Self {
        Self { task_type, target }
    }
}

/// Opaque, task-type-specific result of a remote computation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskPayload(serde_json::Value);

impl TaskPayload {
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    /// `null`, `""`, `[]` and `{}` carry no result
    pub fn is_empty(&self) -> bool {
        match &self.0 {
            serde_json::Value::Null => true,
            serde_json::Value::String(s) => s.is_empty(),
            serde_json::Value::Array(items) => items.is_empty(),
            serde_json::Value::Object(fields) => fields.is_empty(),
            _ => false,
        }
    }

    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }

    pub fn into_value(self) -> serde_json::Value {
        self.0
    }
}

impl From<serde_json::Value> for TaskPayload {
    fn from(value: serde_json::Value) -> Self {
        Self(value)
    }
}

/// What a worker reports for one correlation token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "body", rename_all = "snake_case")]
pub enum TaskResponse {
    /// The task ran; the payload may still be empty
    Completed(TaskPayload),
    /// The task itself failed on the worker
    Failed(String),
}
