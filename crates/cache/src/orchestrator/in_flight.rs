//! Per-key serialisation of colliding `get_or_compute` calls

use dashmap::DashMap;
use nodecache_core::{ResourceId, TaskType};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

type Key = (ResourceId, TaskType);

/// Async locks for the `(resource, task type)` pairs currently being computed
#[derive(Debug, Default)]
pub(crate) struct InFlight {
    locks: Arc<DashMap<Key, Arc<Mutex<()>>>>,
}

impl InFlight {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Wait until no other call holds this key, then hold it
    pub(crate) async fn acquire(&self, resource: &ResourceId, task_type: &TaskType) -> InFlightGuard {
        let key = (resource.clone(), task_type.clone());
        let lock = self
            .locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone();
        let guard = lock.clone().lock_owned().await;

        InFlightGuard {
            key,
            locks: self.locks.clone(),
            lock,
            guard: Some(guard),
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.locks.len()
    }
}

/// Held for the duration of one computation; the map entry goes away with the
/// last holder
pub(crate) struct InFlightGuard {
    key: Key,
    locks: Arc<DashMap<Key, Arc<Mutex<()>>>>,
    lock: Arc<Mutex<()>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        // map + `self.lock` + the owned guard: nobody else is queued
        self.locks.remove_if(&self.key, |_, lock| {
            Arc::ptr_eq(lock, &self.lock) && Arc::strong_count(lock) == 3
        });
        self.guard.take();
    }
}
