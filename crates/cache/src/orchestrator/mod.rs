//! Fingerprint-validated lookup with remote computation on miss
//!
//! `get_or_compute` serves a stored entry while it was computed from the
//! resource's current content. Otherwise it drops the stale entry, asks the
//! node selector for a host, dispatches the task and waits for the answer,
//! trying again on another node when the chosen one turns out to be
//! unreachable. A task-level failure ends the call at once.

mod in_flight;

use crate::statistics::{OrchestratorStats, OrchestratorStatsSnapshot};
use crate::store::{FileMetadataStore, MetadataStore, ResourceMetadataStore};
use in_flight::InFlight;
use nodecache_config::DispatchConfig;
use nodecache_core::{
    CachedEntry, Error, Fingerprint, FingerprintedResource, RemoteTask, Result, ResultExt,
    TaskPayload, TaskType,
};
use nodecache_task::{IssuerRegistry, NodeSelector, ResponseChannel, TaskIssuer};
use nodecache_utils::tracing::attempt_span;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn, Instrument};

pub struct CacheOrchestrator {
    store: Arc<dyn MetadataStore>,
    selector: Arc<dyn NodeSelector>,
    issuers: IssuerRegistry,
    responses: Arc<dyn ResponseChannel>,
    max_attempts: u32,
    in_flight: Option<InFlight>,
    stats: Arc<OrchestratorStats>,
    closed: AtomicBool,
}

impl CacheOrchestrator {
    pub fn builder() -> CacheOrchestratorBuilder {
        CacheOrchestratorBuilder::default()
    }

    /// Return the cached result for `task_type` on `resource`, computing it on
    /// a worker node when there is no entry for the current fingerprint.
    ///
    /// # Errors
    ///
    /// - `RemoteTask` when the node reports the task failed or answered with
    ///   nothing. No other node is tried.
    /// - `NoAvailableNode` when the selector has no candidate or every attempt
    ///   met an unreachable node.
    /// - `Configuration` when no issuer is registered for `task_type`.
    /// - `ShuttingDown` after [`CacheOrchestrator::shutdown`].
    #[instrument(
        name = "get_or_compute",
        skip_all,
        fields(resource = %resource.identity(), task_type = %task_type)
    )]
    pub async fn get_or_compute(
        &self,
        resource: &FingerprintedResource,
        task_type: &TaskType,
    ) -> Result<TaskPayload> {
        self.ensure_open()?;

        // the entry written on success records this snapshot, not whatever
        // the catalog reports once the remote call has returned
        let fingerprint = resource.fingerprint();

        if let Some(value) = self.lookup(resource, task_type, &fingerprint).await? {
            self.stats.record_hit();
            return Ok(value);
        }

        let _guard = match &self.in_flight {
            Some(in_flight) => {
                let guard = in_flight.acquire(resource.identity(), task_type).await;
                if let Some(value) = self.lookup(resource, task_type, &fingerprint).await? {
                    debug!("answered by a colliding call");
                    self.stats.record_coalesced();
                    return Ok(value);
                }
                Some(guard)
            }
            None => None,
        };

        self.stats.record_miss();
        let issuer = self.issuers.issuer_for(task_type)?;
        let value = self.compute(resource, task_type, issuer.as_ref()).await?;

        let entry = CachedEntry::new(value.clone(), fingerprint.clone(), resource.display_name());
        match self.store.put(resource, task_type, entry).await {
            Ok(()) => {
                self.stats.record_store();
                info!(fingerprint = %fingerprint, "stored computed entry");
            }
            Err(e) => {
                self.stats.record_store_failure();
                warn!(error = %e, "failed to store computed entry");
            }
        }

        Ok(value)
    }

    /// Valid cached value, if any. A stale entry is removed on sight.
    async fn lookup(
        &self,
        resource: &FingerprintedResource,
        task_type: &TaskType,
        fingerprint: &Fingerprint,
    ) -> Result<Option<TaskPayload>> {
        let entry = match self.store.get(resource, task_type).await {
            Ok(entry) => entry,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e),
        };

        if entry.is_valid_for(fingerprint) {
            debug!("cache hit");
            return Ok(Some(entry.value));
        }

        info!(
            cached = %entry.fingerprint_at_computation,
            current = %fingerprint,
            "invalidating stale entry"
        );
        self.store.remove(resource, task_type).await?;
        self.stats.record_invalidation();
        Ok(None)
    }

    async fn compute(
        &self,
        resource: &FingerprintedResource,
        task_type: &TaskType,
        issuer: &dyn TaskIssuer,
    ) -> Result<TaskPayload> {
        for attempt in 1..=self.max_attempts {
            let node = self.selector.select_node(resource).await?;
            let task = RemoteTask::new(task_type.clone(), resource.identity().clone());

            let outcome = async {
                debug!("dispatching");
                self.stats.record_dispatch();
                let token = issuer.dispatch(&node, task).await?;
                self.responses.await_result(&node, token).await
            }
            .instrument(attempt_span(attempt, self.max_attempts, node.as_str()))
            .await;

            match outcome {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() => {
                    self.stats.record_unreachable();
                    warn!(
                        node = %node,
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %e,
                        "node unreachable"
                    );
                }
                Err(e) => {
                    if matches!(e, Error::RemoteTask { .. }) {
                        self.stats.record_remote_error();
                    }
                    error!(node = %node, error = %e, "remote task failed");
                    return Err(e);
                }
            }
        }

        self.stats.record_exhausted();
        error!(attempts = self.max_attempts, "no node answered");
        Err(Error::no_available_node(
            resource.identity().as_str(),
            self.max_attempts,
        ))
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn stats(&self) -> OrchestratorStatsSnapshot {
        self.stats.snapshot()
    }

    /// Refuse new calls. Calls already running finish normally.
    pub fn shutdown(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            info!("cache orchestrator shutting down");
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_shut_down() {
            return Err(Error::shutting_down("cache orchestrator"));
        }
        Ok(())
    }
}

impl std::fmt::Debug for CacheOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheOrchestrator")
            .field("issuers", &self.issuers)
            .field("max_attempts", &self.max_attempts)
            .field("coalesce_in_flight", &self.in_flight.is_some())
            .field("closed", &self.is_shut_down())
            .finish_non_exhaustive()
    }
}

/// Builder for `CacheOrchestrator`
#[derive(Default)]
pub struct CacheOrchestratorBuilder {
    config: DispatchConfig,
    store: Option<Arc<dyn MetadataStore>>,
    selector: Option<Arc<dyn NodeSelector>>,
    issuers: IssuerRegistry,
    responses: Option<Arc<dyn ResponseChannel>>,
}

impl CacheOrchestratorBuilder {
    pub fn config(mut self, config: DispatchConfig) -> Self {
        self.config = config;
        self
    }

    /// Defaults to a `FileMetadataStore` under `metadata_dir` when configured,
    /// else to the resources' own metadata maps
    pub fn store(mut self, store: Arc<dyn MetadataStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn selector(mut self, selector: Arc<dyn NodeSelector>) -> Self {
        self.selector = Some(selector);
        self
    }

    pub fn issuers(mut self, issuers: IssuerRegistry) -> Self {
        self.issuers = issuers;
        self
    }

    pub fn issuer(mut self, task_type: TaskType, issuer: Arc<dyn TaskIssuer>) -> Self {
        self.issuers.register(task_type, issuer);
        self
    }

    pub fn responses(mut self, responses: Arc<dyn ResponseChannel>) -> Self {
        self.responses = Some(responses);
        self
    }

    pub fn build(self) -> Result<CacheOrchestrator> {
        self.config.validate()?;

        let selector = self
            .selector
            .ok_or_else(|| Error::configuration("cache orchestrator requires a node selector"))?;
        let responses = self.responses.ok_or_else(|| {
            Error::configuration("cache orchestrator requires a response channel")
        })?;
        if self.issuers.task_types().is_empty() {
            return Err(Error::configuration(
                "cache orchestrator requires at least one task issuer",
            ));
        }

        let store: Arc<dyn MetadataStore> = match (self.store, &self.config.metadata_dir) {
            (Some(store), _) => store,
            (None, Some(dir)) => Arc::new(
                FileMetadataStore::new(dir)
                    .with_context(|| format!("open metadata store at '{}'", dir.display()))?,
            ),
            (None, None) => Arc::new(ResourceMetadataStore::new()),
        };

        debug!(
            max_attempts = self.config.max_attempts,
            coalesce_in_flight = self.config.coalesce_in_flight,
            task_types = ?self.issuers.task_types(),
            "built cache orchestrator"
        );

        Ok(CacheOrchestrator {
            store,
            selector,
            issuers: self.issuers,
            responses,
            max_attempts: self.config.max_attempts,
            in_flight: self.config.coalesce_in_flight.then(InFlight::new),
            stats: Arc::new(OrchestratorStats::new()),
            closed: AtomicBool::new(false),
        })
    }
}
