use crate::node::TaskIssuer;
use nodecache_core::{Error, Result, TaskType};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Registry of the issuer responsible for each task type
#[derive(Default, Clone)]
pub struct IssuerRegistry {
    issuers: HashMap<TaskType, Arc<dyn TaskIssuer>>,
}

impl IssuerRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the issuer for a task type, replacing any previous one
    pub fn register(&mut self, task_type: TaskType, issuer: Arc<dyn TaskIssuer>) -> &mut Self {
        if self.issuers.insert(task_type.clone(), issuer).is_some() {
            tracing::debug!(task_type = %task_type, "replaced registered issuer");
        }
        self
    }

    /// Look up the issuer for a task type
    pub fn issuer_for(&self, task_type: &TaskType) -> Result<Arc<dyn TaskIssuer>> {
        self.issuers.get(task_type).cloned().ok_or_else(|| {
            Error::configuration(format!("no issuer registered for task type '{task_type}'"))
        })
    }

    pub fn contains(&self, task_type: &TaskType) -> bool {
        self.issuers.contains_key(task_type)
    }

    /// Registered task types, sorted
    pub fn task_types(&self) -> Vec<TaskType> {
        let mut types: Vec<_> = self.issuers.keys().cloned().collect();
        types.sort();
        types
    }
}

impl fmt::Debug for IssuerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuerRegistry")
            .field("task_types", &self.task_types())
            .finish()
    }
}
