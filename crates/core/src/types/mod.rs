//! Domain types for nodecache

pub mod newtypes;
pub mod resource;
pub mod task;

pub use newtypes::*;
pub use resource::*;
pub use task::*;
