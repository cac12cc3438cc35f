//! Configuration for nodecache
//!
//! This crate holds the dispatch settings and the loader that assembles them
//! from a JSON file and environment overrides at startup.

pub mod config;
pub mod loader;


pub use config::*;
pub use loader::*;
