//! Durable metadata store: one JSON document per resource bucket
//!
//! Documents live at `<root>/<crc32c of the resource path>.json` and map each
//! resource path in the bucket to its entries, so two paths that share a
//! bucket never clobber each other. Writes go through an atomic rename and are
//! serialised by a store-wide lock, which gives read-your-writes.

use super::MetadataStore;
use async_trait::async_trait;
use nodecache_core::{
    CachedEntry, Error, Fingerprint, FingerprintedResource, ResourceId, Result, TaskType,
};
use nodecache_utils::{remove_if_exists, write_atomic};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

type Document = BTreeMap<String, BTreeMap<TaskType, CachedEntry>>;

#[derive(Debug, Clone)]
pub struct FileMetadataStore {
    root: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl FileMetadataStore {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)
            .map_err(|e| Error::file_system(root.clone(), "create metadata directory", e))?;
        Ok(Self {
            root,
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn document_path(&self, resource: &ResourceId) -> PathBuf {
        let bucket = Fingerprint::of_content(resource.as_str().as_bytes());
        self.root.join(format!("{bucket}.json"))
    }

    fn load(path: &Path) -> Result<Document> {
        match std::fs::read(path) {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                Error::json(format!("corrupt metadata document '{}'", path.display()), e)
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Document::new()),
            Err(e) => Err(Error::file_system(path, "read metadata document", e)),
        }
    }

    fn save(path: &Path, document: &Document) -> Result<()> {
        if document.is_empty() {
            remove_if_exists(path)?;
            return Ok(());
        }
        let bytes = serde_json::to_vec_pretty(document)?;
        write_atomic(path, &bytes)
    }

    async fn blocking<T, F>(&self, operation: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Mutex<()>) -> Result<T> + Send + 'static,
    {
        let lock = self.write_lock.clone();
        tokio::task::spawn_blocking(move || operation(&lock))
            .await
            .map_err(|e| {
                Error::file_system(
                    self.root.clone(),
                    "run metadata store task",
                    std::io::Error::other(e),
                )
            })?
    }
}

#[async_trait]
impl MetadataStore for FileMetadataStore {
    async fn get(
        &self,
        resource: &FingerprintedResource,
        task_type: &TaskType,
    ) -> Result<CachedEntry> {
        let path = self.document_path(resource.identity());
        let identity = resource.identity().to_string();
        let slot = task_type.clone();

        let entry = self
            .blocking(move |_| {
                let mut document = Self::load(&path)?;
                Ok(document
                    .get_mut(&identity)
                    .and_then(|entries| entries.remove(&slot)))
            })
            .await?;

        entry.ok_or_else(|| Error::not_found(resource.identity().as_str(), task_type.as_str()))
    }

    async fn put(
        &self,
        resource: &FingerprintedResource,
        task_type: &TaskType,
        entry: CachedEntry,
    ) -> Result<()> {
        let path = self.document_path(resource.identity());
        let identity = resource.identity().to_string();
        let slot = task_type.clone();

        self.blocking(move |lock| {
            let _guard = lock.lock();
            let mut document = Self::load(&path)?;
            document.entry(identity).or_default().insert(slot, entry);
            Self::save(&path, &document)
        })
        .await
    }

    async fn remove(&self, resource: &FingerprintedResource, task_type: &TaskType) -> Result<()> {
        let path = self.document_path(resource.identity());
        let identity = resource.identity().to_string();
        let slot = task_type.clone();

        self.blocking(move |lock| {
            let _guard = lock.lock();
            let mut document = Self::load(&path)?;
            let Some(entries) = document.get_mut(&identity) else {
                return Ok(());
            };
            if entries.remove(&slot).is_none() {
                return Ok(());
            }
            if entries.is_empty() {
                document.remove(&identity);
            }
            Self::save(&path, &document)
        })
        .await
    }
}
