//! Newtype wrappers for enhanced type safety

use crate::errors::{Error, Result, Validate};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::ops::Deref;
use std::str::FromStr;

/// Stable path of a file tracked by the catalog
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceId(String);

impl ResourceId {
    /// Create a new ResourceId with validation
    pub fn new(path: impl Into<String>) -> Result<Self> {
        let path = path.into();
        Validate::not_empty(&path, "resource_id")?;
        Ok(ResourceId(path))
    }

    /// Create an unsafe ResourceId without validation (use only when input is already validated)
    pub fn new_unchecked(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last path segment, used as the default display name
    pub fn file_name(&self) -> &str {
        self.0
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .filter(|name| !name.is_empty())
            .unwrap_or(&self.0)
    }
}

impl Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Deref for ResourceId {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromStr for ResourceId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

/// Checksum over a file's content; changes iff the content changes
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Create a new Fingerprint with validation
    pub fn new(checksum: impl Into<String>) -> Result<Self> {
        let checksum = checksum.into();
        Validate::not_empty(&checksum, "fingerprint")?;
        Ok(Fingerprint(checksum))
    }

    pub fn new_unchecked(checksum: impl Into<String>) -> Self {
        Self(checksum.into())
    }

    /// Fingerprint from a CRC-32C checksum, rendered as 8 lowercase hex digits
    pub fn from_checksum(checksum: u32) -> Self {
        Self(format!("{checksum:08x}"))
    }

    /// Compute the fingerprint of a byte slice
    pub fn of_content(content: &[u8]) -> Self {
        Self::from_checksum(crc32c::crc32c(content))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Fingerprint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

/// Selects which remote computation to run and which cache slot it fills
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskType(String);

impl TaskType {
    /// Create a new TaskType with validation
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        Validate::not_empty(&name, "task_type")?;
        Validate::with_predicate(
            name.clone(),
            |n| {
                n.chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
            },
            "Task type must contain only ASCII alphanumeric characters, underscores, hyphens, and dots",
        )?;
        Ok(TaskType(name))
    }

    pub fn new_unchecked(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TaskType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<&str> for TaskType {
    type Error = Error;

    fn try_from(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

/// Identity of a worker node
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        Validate::not_empty(&name, "node_id")?;
        Ok(NodeId(name))
    }

    pub fn new_unchecked(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for NodeId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

/// Opaque handle linking one dispatch to its eventual result.
///
/// A token is only meaningful on the node that issued it; the issuing node is
/// carried alongside the opaque value so a token can never be redeemed against
/// another node by accident.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CorrelationToken {
    node: NodeId,
    value: String,
}

impl CorrelationToken {
    pub fn new(node: NodeId, value: impl Into<String>) -> Self {
        Self {
            node,
            value: value.into(),
        }
    }

    pub fn node(&self) -> &NodeId {
        &self.node
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn belongs_to(&self, node: &NodeId) -> bool {
        &self.node == node
    }
}

impl Display for CorrelationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.value, self.node)
    }
}
