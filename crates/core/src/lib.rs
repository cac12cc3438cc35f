//! Core domain types, errors, and constants for `nodecache`.
//!
//! This crate establishes the building blocks shared by the coordinator-side
//! dispatch layer and the worker-side runtime.
//!
//! ## Key Components
//!
//! - **`errors`**: The `Error` enum and `Result` alias. Every node-transport
//!   failure is classified into one of these variants before it reaches the
//!   orchestrator.
//! - **`types`**: Newtype wrappers (`ResourceId`, `Fingerprint`, `TaskType`,
//!   `NodeId`, `CorrelationToken`) and the resource/cache data model.
//! - **`constants`**: Shared defaults and environment variable names.

pub mod constants;
pub mod errors;
pub mod types;

pub use self::{
    constants::*,
    errors::{Error, Result, ResultExt, Validate},
    types::*,
};
