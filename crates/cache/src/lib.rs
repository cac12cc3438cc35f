//! Fingerprint-keyed result cache for remote tasks
//!
//! This crate provides:
//! - `MetadataStore`, the per-resource cache slot contract, with an in-resource
//!   and a file-backed implementation
//! - `CacheOrchestrator`, which serves cached results while they match the
//!   resource's current fingerprint and otherwise dispatches the task to a
//!   worker node, failing over between nodes on node loss
//! - `OrchestratorStats` counters

pub mod orchestrator;
pub mod statistics;
pub mod store;

pub use orchestrator::{CacheOrchestrator, CacheOrchestratorBuilder};
pub use statistics::{OrchestratorStats, OrchestratorStatsSnapshot};
pub use store::{FileMetadataStore, MetadataStore, ResourceMetadataStore};
