//! Replication agent vocabulary shared across crates.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Deployment role selector threaded through every management request.
///
/// The management API keeps agents for each role under a separate
/// `agents.{run_mode}` node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Author instance configuration context.
    #[default]
    Author,
    /// Publish instance configuration context.
    Publish,
}

impl RunMode {
    /// Return the value used in management API paths.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Author => "author",
            Self::Publish => "publish",
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "author" => Ok(Self::Author),
            "publish" => Ok(Self::Publish),
            _ => Err(CoreError::InvalidRunMode(s.to_string())),
        }
    }
}

/// The closed set of lifecycle actions on a replication agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentAction {
    /// Create the agent and point it at a publish instance.
    Create,
    /// Disable the agent without removing it.
    Pause,
    /// Re-enable a paused agent.
    Resume,
    /// Remove the agent.
    Delete,
}

impl AgentAction {
    /// All actions, in lifecycle order.
    pub const ALL: [Self; 4] = [Self::Create, Self::Pause, Self::Resume, Self::Delete];

    /// Return the lowercase action name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for AgentAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentAction {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|action| action.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CoreError::InvalidAction(s.to_string()))
    }
}

/// Username and password used to authenticate a replication transport.
///
/// The password is never printed by `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct AgentCredentials {
    username: String,
    password: String,
}

impl AgentCredentials {
    /// Create a credential pair.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// The transport username.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// The transport password.
    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for AgentCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}
