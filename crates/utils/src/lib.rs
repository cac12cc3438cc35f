//! Shared utilities for nodecache
//!
//! Logging setup and filesystem helpers used by the other workspace crates.

pub mod atomic_file;
pub mod tracing;

pub use atomic_file::*;
