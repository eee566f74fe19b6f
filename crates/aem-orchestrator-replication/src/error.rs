//! Error types for replication agent management.
//!
//! The gateway reports *how* a call failed ([`GatewayError`]); the lifecycle
//! manager adds *what* was being attempted ([`ReplicationError`]) so every
//! failure that reaches the event ingestor names the instance and action.

use aem_orchestrator_core::{AgentAction, InstanceId};
use thiserror::Error;

/// A result type using `ReplicationError`.
pub type Result<T> = std::result::Result<T, ReplicationError>;

/// A result type using `GatewayError`.
pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

/// Failures reported by a management API gateway.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// The request never produced a response (connect failure, timeout),
    /// even after transport retries.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The management API answered with a non-2xx status.
    #[error("management API returned {status}: {body}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Response body, possibly empty.
        body: String,
    },
}

impl GatewayError {
    /// The remote status code, if a response was received.
    #[must_use]
    pub const fn status_code(&self) -> Option<u16> {
        match self {
            Self::Rejected { status, .. } => Some(*status),
            Self::Transport(_) => None,
        }
    }
}

/// Errors surfaced by the replication agent lifecycle manager.
#[derive(Debug, Error)]
pub enum ReplicationError {
    /// The management API rejected the request.
    #[error("{action} of replication agent for {instance_id} rejected with status {status}: {body}")]
    Api {
        /// The lifecycle action attempted.
        action: AgentAction,
        /// The publish instance the agent serves.
        instance_id: InstanceId,
        /// HTTP status code returned by the management API.
        status: u16,
        /// Response body, possibly empty.
        body: String,
    },

    /// The management API could not be reached.
    #[error("{action} of replication agent for {instance_id} failed: {message}")]
    Transport {
        /// The lifecycle action attempted.
        action: AgentAction,
        /// The publish instance the agent serves.
        instance_id: InstanceId,
        /// Description of the transport failure.
        message: String,
    },
}

impl ReplicationError {
    /// Attach the action and instance to a gateway failure.
    #[must_use]
    pub fn from_gateway(action: AgentAction, instance_id: &InstanceId, error: GatewayError) -> Self {
        match error {
            GatewayError::Rejected { status, body } => Self::Api {
                action,
                instance_id: instance_id.clone(),
                status,
                body,
            },
            GatewayError::Transport(message) => Self::Transport {
                action,
                instance_id: instance_id.clone(),
                message,
            },
        }
    }

    /// The action that failed.
    #[must_use]
    pub const fn action(&self) -> AgentAction {
        match self {
            Self::Api { action, .. } | Self::Transport { action, .. } => *action,
        }
    }

    /// The instance whose agent was being managed.
    #[must_use]
    pub const fn instance_id(&self) -> &InstanceId {
        match self {
            Self::Api { instance_id, .. } | Self::Transport { instance_id, .. } => instance_id,
        }
    }

    /// The remote status code, if the management API answered.
    #[must_use]
    pub const fn status_code(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Transport { .. } => None,
        }
    }

    /// Returns true if the remote reported the agent as absent.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::Api { status: 404, .. })
    }

    /// Returns true for a delete of an agent the remote reports as absent,
    /// which counts as success.
    #[must_use]
    pub const fn is_absent_on_delete(&self) -> bool {
        matches!(
            self,
            Self::Api {
                action: AgentAction::Delete,
                status: 404,
                ..
            }
        )
    }

    /// Returns true if redelivering the same event might succeed.
    #[must_use]
    pub const fn is_retriable(&self) -> bool {
        match self {
            Self::Transport { .. } => true,
            Self::Api { status, .. } => *status == 429 || *status >= 500,
        }
    }
}
