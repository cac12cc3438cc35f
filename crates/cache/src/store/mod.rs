//! Cache slots attached to resources
//!
//! Each resource has at most one entry per task type. `get` fails with
//! `NotFound` when the slot is empty, `put` overwrites, and `remove` is a no-op
//! on an empty slot. Implementations must give the calling flow
//! read-your-writes.

mod file;
mod resource;

pub use file::FileMetadataStore;
pub use resource::ResourceMetadataStore;

use async_trait::async_trait;
use nodecache_core::{CachedEntry, FingerprintedResource, Result, TaskType};

#[async_trait]
pub trait MetadataStore: Send + Sync {
    async fn get(&self, resource: &FingerprintedResource, task_type: &TaskType)
        -> Result<CachedEntry>;

    async fn put(
        &self,
        resource: &FingerprintedResource,
        task_type: &TaskType,
        entry: CachedEntry,
    ) -> Result<()>;

    async fn remove(&self, resource: &FingerprintedResource, task_type: &TaskType) -> Result<()>;
}
