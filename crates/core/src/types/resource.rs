//! Catalog-side view of a file and the results cached against it

use super::newtypes::{Fingerprint, ResourceId, TaskType};
use super::task::TaskPayload;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Cached entries attached to a resource, one per task type
pub type MetadataMap = HashMap<TaskType, CachedEntry>;

/// Result of a remote computation, stamped with the content it was computed from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedEntry {
    /// Task-type-specific payload
    pub value: TaskPayload,
    /// Resource fingerprint at the time the value was produced
    pub fingerprint_at_computation: Fingerprint,
    /// Display name of the resource when the value was produced
    pub source_name: String,
    /// When the value was stored
    pub computed_at: DateTime<Utc>,
}

impl CachedEntry {
    pub fn new(value: TaskPayload, fingerprint: Fingerprint, source_name: impl Into<String>) -> Self {
        Self {
            value,
            fingerprint_at_computation: fingerprint,
            source_name: source_name.into(),
            computed_at: Utc::now(),
        }
    }

    /// Stamp a fresh value with the resource's current fingerprint and name
    pub fn stamp(value: TaskPayload, resource: &FingerprintedResource) -> Self {
        Self::new(value, resource.fingerprint(), resource.display_name())
    }

    /// Entries are only valid for the exact fingerprint they were computed at
    pub fn is_valid_for(&self, fingerprint: &Fingerprint) -> bool {
        &self.fingerprint_at_computation == fingerprint
    }
}

#[derive(Debug, Clone)]
struct ContentState {
    fingerprint: Fingerprint,
    size: u64,
}

/// A file tracked by the catalog.
///
/// The catalog owns the resource and updates its content state when the file
/// changes; the dispatch layer only reads the fingerprint and reads/writes the
/// metadata map. Both are behind locks so a shared `Arc<FingerprintedResource>`
/// can be used from many concurrent calls.
#[derive(Debug)]
pub struct FingerprintedResource {
    identity: ResourceId,
    display_name: String,
    content: RwLock<ContentState>,
    metadata: RwLock<MetadataMap>,
}

impl FingerprintedResource {
    pub fn new(identity: ResourceId, fingerprint: Fingerprint, size: u64) -> Self {
        let display_name = identity.file_name().to_string();
        Self {
            identity,
            display_name,
            content: RwLock::new(ContentState { fingerprint, size }),
            metadata: RwLock::new(MetadataMap::new()),
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }

    pub fn identity(&self) -> &ResourceId {
        &self.identity
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn fingerprint(&self) -> Fingerprint {
        self.content.read().fingerprint.clone()
    }

    pub fn size(&self) -> u64 {
        self.content.read().size
    }

    /// Record new content; cached entries are left in place and are
    /// invalidated lazily on the next lookup
    pub fn update_content(&self, fingerprint: Fingerprint, size: u64) {
        let mut content = self.content.write();
        content.fingerprint = fingerprint;
        content.size = size;
    }

    pub fn cached_entry(&self, task_type: &TaskType) -> Option<CachedEntry> {
        self.metadata.read().get(task_type).cloned()
    }

    pub fn set_cached_entry(&self, task_type: TaskType, entry: CachedEntry) {
        self.metadata.write().insert(task_type, entry);
    }

    pub fn clear_cached_entry(&self, task_type: &TaskType) -> Option<CachedEntry> {
        self.metadata.write().remove(task_type)
    }

    pub fn cached_task_types(&self) -> Vec<TaskType> {
        let mut types: Vec<_> = self.metadata.read().keys().cloned().collect();
        types.sort();
        types
    }
}
