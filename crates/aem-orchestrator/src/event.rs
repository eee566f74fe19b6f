//! Fleet lifecycle events.

use aem_orchestrator_core::{AgentAction, InstanceId, RunMode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reasons a payload cannot be turned into a [`FleetEvent`].
#[derive(Debug, Error)]
pub enum EventError {
    /// The payload is not a valid event document.
    #[error("invalid event payload: {0}")]
    Decode(#[from] serde_json::Error),

    /// A create event does not say where the publish instance listens.
    #[error("create event for {0} has no publish_base_url")]
    MissingPublishBaseUrl(InstanceId),
}

/// A lifecycle change to one instance of a fleet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FleetEvent {
    /// Physical id of the fleet the instance belongs to.
    pub fleet: String,
    /// The instance that changed.
    pub instance_id: InstanceId,
    /// What to do with the instance's replication agent.
    pub action: AgentAction,
    /// Run mode to target; the configured one when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_mode: Option<RunMode>,
    /// Base URL of the publish instance. Required for `create`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish_base_url: Option<String>,
}

impl FleetEvent {
    /// Decode and validate an event payload.
    ///
    /// # Errors
    ///
    /// Returns `EventError::Decode` for payloads that are not event
    /// documents and `EventError::MissingPublishBaseUrl` for create events
    /// without a publish URL.
    pub fn parse(payload: &[u8]) -> Result<Self, EventError> {
        let event: Self = serde_json::from_slice(payload)?;

        if event.action == AgentAction::Create
            && event
                .publish_base_url
                .as_deref()
                .is_none_or(|url| url.trim().is_empty())
        {
            return Err(EventError::MissingPublishBaseUrl(event.instance_id));
        }
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_create_event() {
        let event = FleetEvent::parse(
            br#"{
                "fleet": "publish-asg-7F3",
                "instance_id": "i-0123abcd",
                "action": "create",
                "publish_base_url": "http://10.0.1.12:4503"
            }"#,
        )
        .unwrap();

        assert_eq!(event.fleet, "publish-asg-7F3");
        assert_eq!(event.instance_id.as_str(), "i-0123abcd");
        assert_eq!(event.action, AgentAction::Create);
        assert_eq!(event.run_mode, None);
        assert_eq!(event.publish_base_url.as_deref(), Some("http://10.0.1.12:4503"));
    }

    #[test]
    fn parses_run_mode() {
        let event = FleetEvent::parse(
            br#"{"fleet":"f","instance_id":"i-1","action":"pause","run_mode":"publish"}"#,
        )
        .unwrap();
        assert_eq!(event.run_mode, Some(RunMode::Publish));
    }

    #[test]
    fn create_requires_publish_url() {
        let err = FleetEvent::parse(br#"{"fleet":"f","instance_id":"i-1","action":"create"}"#)
            .unwrap_err();
        assert!(matches!(err, EventError::MissingPublishBaseUrl(_)));

        let err = FleetEvent::parse(
            br#"{"fleet":"f","instance_id":"i-1","action":"create","publish_base_url":" "}"#,
        )
        .unwrap_err();
        assert!(matches!(err, EventError::MissingPublishBaseUrl(_)));
    }

    #[test]
    fn rejects_bad_payloads() {
        for payload in [
            &b"not json"[..],
            &br#"{"fleet":"f","instance_id":"i-1","action":"reboot"}"#[..],
            &br#"{"fleet":"f","instance_id":"","action":"delete"}"#[..],
            &br#"{"fleet":"f","action":"delete"}"#[..],
        ] {
            assert!(
                matches!(FleetEvent::parse(payload), Err(EventError::Decode(_))),
                "payload should be rejected: {}",
                String::from_utf8_lossy(payload)
            );
        }
    }
}
