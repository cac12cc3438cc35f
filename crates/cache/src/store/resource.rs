use super::MetadataStore;
use async_trait::async_trait;
use nodecache_core::{CachedEntry, Error, FingerprintedResource, Result, TaskType};

/// Keeps entries in the resource's own metadata map
#[derive(Debug, Default, Clone, Copy)]
pub struct ResourceMetadataStore;

impl ResourceMetadataStore {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MetadataStore for ResourceMetadataStore {
    async fn get(
        &self,
        resource: &FingerprintedResource,
        task_type: &TaskType,
    ) -> Result<CachedEntry> {
        resource
            .cached_entry(task_type)
            .ok_or_else(|| Error::not_found(resource.identity().as_str(), task_type.as_str()))
    }

    async fn put(
        &self,
        resource: &FingerprintedResource,
        task_type: &TaskType,
        entry: CachedEntry,
    ) -> Result<()> {
        resource.set_cached_entry(task_type.clone(), entry);
        Ok(())
    }

    async fn remove(&self, resource: &FingerprintedResource, task_type: &TaskType) -> Result<()> {
        resource.clear_cached_entry(task_type);
        Ok(())
    }
}
