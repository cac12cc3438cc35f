//! Error types and result extensions for nodecache operations

mod builders;
mod conversions;
mod extensions;
mod transformations;
mod types;

pub use extensions::*;
pub use transformations::*;
pub use types::{Error, Result};
