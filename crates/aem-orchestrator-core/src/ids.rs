//! Instance and agent identifiers.
//!
//! A replication agent has no identity of its own: its name is always
//! recomputed from the identifier of the publish instance it serves. Nothing
//! maps instances to agents in storage.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Prefix shared by every replication agent name.
pub const AGENT_NAME_PREFIX: &str = "replicationAgent-";

/// Identifier of a fleet instance (for example an EC2 instance id).
///
/// The identifier ends up as a path segment of the management API, so it must
/// be non-empty and free of whitespace, `/`, `?` and `#`.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct InstanceId(String);

impl InstanceId {
    /// Create an `InstanceId` after validating it.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidInstanceId` if the identifier is empty or
    /// contains a character that cannot be used in a URL path segment.
    pub fn new(id: impl Into<String>) -> Result<Self, CoreError> {
        let id = id.into();
        let valid = !id.is_empty()
            && !id
                .chars()
                .any(|c| c.is_whitespace() || c.is_control() || matches!(c, '/' | '?' | '#'));
        if valid {
            Ok(Self(id))
        } else {
            Err(CoreError::InvalidInstanceId(id))
        }
    }

    /// Return the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InstanceId({})", self.0)
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for InstanceId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for InstanceId {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<InstanceId> for String {
    fn from(id: InstanceId) -> Self {
        id.0
    }
}

/// Name of the replication agent serving one publish instance.
///
/// Always `"replicationAgent-" + instance_id`. The prefix is constant, so two
/// distinct instance ids can never produce the same name.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct AgentName(String);

impl AgentName {
    /// Derive the agent name for a publish instance.
    #[must_use]
    pub fn for_instance(instance_id: &InstanceId) -> Self {
        Self(format!("{AGENT_NAME_PREFIX}{}", instance_id.as_str()))
    }

    /// Return the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AgentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AgentName({})", self.0)
    }
}

impl fmt::Display for AgentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for AgentName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
