//! Remote task dispatch for nodecache
//!
//! This crate defines the collaborators the cache orchestrator talks to
//! (`NodeSelector`, `TaskIssuer`, `ResponseChannel`), the per-task-type issuer
//! registry, an in-process node transport that correlates answers to dispatches,
//! and the worker-side runtime that executes tasks.

pub mod node;
pub mod registry;
pub mod transport;
pub mod worker;

pub use node::*;
pub use registry::*;
pub use transport::*;
pub use worker::*;
