//! Agent request construction.
//!
//! Each lifecycle action has its own request type carrying exactly the fields
//! that action needs:
//!
//! | Action | Fields |
//! |--------|--------|
//! | Create | name, description, run mode, transport URI, credentials |
//! | Pause  | name, run mode |
//! | Resume | name, run mode, credentials |
//! | Delete | name, run mode |
//!
//! Construction is pure: the same inputs always produce an equal request.

use aem_orchestrator_core::{AgentAction, AgentCredentials, AgentName, InstanceId, RunMode};

/// Sling resource type of a replication agent page.
pub const AGENT_RESOURCE_TYPE: &str = "cq/replication/components/agent";

/// Page template used for replication agents.
pub const AGENT_TEMPLATE: &str = "/libs/cq/replication/templates/agent";

/// Path on the publish instance that receives replicated content.
pub const RECEIVE_PATH: &str = "/bin/receive?sling:authRequestLogin=1";

const LOG_LEVEL: &str = "info";
const SERIALIZATION_TYPE: &str = "durbo";
const RETRY_DELAY_MS: &str = "60000";

/// Common accessors for every agent request.
pub trait AgentRequest {
    /// The action this request performs.
    const ACTION: AgentAction;

    /// Name of the targeted agent.
    fn name(&self) -> &AgentName;

    /// Run mode the agent is configured under.
    fn run_mode(&self) -> RunMode;
}

/// Request creating an agent that replicates to one publish instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateAgentRequest {
    /// Derived agent name.
    pub name: AgentName,
    /// Run mode the agent lives under.
    pub run_mode: RunMode,
    /// Human-readable description.
    pub description: String,
    /// Receive endpoint of the publish instance.
    pub transport_uri: String,
    /// Credentials used by the replication transport.
    pub credentials: AgentCredentials,
}

/// Request disabling an agent without removing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PauseAgentRequest {
    /// Derived agent name.
    pub name: AgentName,
    /// Run mode the agent lives under.
    pub run_mode: RunMode,
}

/// Request re-enabling a paused agent.
///
/// Credentials are re-sent because re-enabling re-establishes the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumeAgentRequest {
    /// Derived agent name.
    pub name: AgentName,
    /// Run mode the agent lives under.
    pub run_mode: RunMode,
    /// Credentials used by the replication transport.
    pub credentials: AgentCredentials,
}

/// Request removing an agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteAgentRequest {
    /// Derived agent name.
    pub name: AgentName,
    /// Run mode the agent lives under.
    pub run_mode: RunMode,
}

impl AgentRequest for CreateAgentRequest {
    const ACTION: AgentAction = AgentAction::Create;

    fn name(&self) -> &AgentName {
        &self.name
    }

    fn run_mode(&self) -> RunMode {
        self.run_mode
    }
}

impl AgentRequest for PauseAgentRequest {
    const ACTION: AgentAction = AgentAction::Pause;

    fn name(&self) -> &AgentName {
        &self.name
    }

    fn run_mode(&self) -> RunMode {
        self.run_mode
    }
}

impl AgentRequest for ResumeAgentRequest {
    const ACTION: AgentAction = AgentAction::Resume;

    fn name(&self) -> &AgentName {
        &self.name
    }

    fn run_mode(&self) -> RunMode {
        self.run_mode
    }
}

impl AgentRequest for DeleteAgentRequest {
    const ACTION: AgentAction = AgentAction::Delete;

    fn name(&self) -> &AgentName {
        &self.name
    }

    fn run_mode(&self) -> RunMode {
        self.run_mode
    }
}

impl CreateAgentRequest {
    /// Form fields posted to the agent resource.
    #[must_use]
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("jcr:primaryType", "cq:Page".to_string()),
            ("jcr:content/cq:name", self.name.to_string()),
            ("jcr:content/jcr:title", self.name.to_string()),
            ("jcr:content/jcr:description", self.description.clone()),
            ("jcr:content/sling:resourceType", AGENT_RESOURCE_TYPE.to_string()),
            ("jcr:content/cq:template", AGENT_TEMPLATE.to_string()),
            ("jcr:content/enabled", "true".to_string()),
            ("jcr:content/transportUri", self.transport_uri.clone()),
            ("jcr:content/transportUser", self.credentials.username().to_string()),
            (
                "jcr:content/transportPassword",
                self.credentials.password().to_string(),
            ),
            ("jcr:content/logLevel", LOG_LEVEL.to_string()),
            ("jcr:content/serializationType", SERIALIZATION_TYPE.to_string()),
            ("jcr:content/retryDelay", RETRY_DELAY_MS.to_string()),
        ]
    }
}

impl PauseAgentRequest {
    /// Form fields posted to the agent resource.
    #[must_use]
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        vec![("jcr:content/enabled", "false".to_string())]
    }
}

impl ResumeAgentRequest {
    /// Form fields posted to the agent resource.
    #[must_use]
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("jcr:content/enabled", "true".to_string()),
            ("jcr:content/transportUser", self.credentials.username().to_string()),
            (
                "jcr:content/transportPassword",
                self.credentials.password().to_string(),
            ),
        ]
    }
}

/// Human-readable description for the agent serving `instance_id`.
#[must_use]
pub fn agent_description(instance_id: &InstanceId) -> String {
    format!("Replication agent for publish {instance_id}")
}

/// Receive endpoint of a publish instance.
#[must_use]
pub fn transport_uri(publish_base_url: &str) -> String {
    format!("{}{RECEIVE_PATH}", publish_base_url.trim_end_matches('/'))
}

/// Build the request creating the agent for `instance_id`.
#[must_use]
pub fn create_request(
    instance_id: &InstanceId,
    publish_base_url: &str,
    run_mode: RunMode,
    credentials: &AgentCredentials,
) -> CreateAgentRequest {
    CreateAgentRequest {
        name: AgentName::for_instance(instance_id),
        run_mode,
        description: agent_description(instance_id),
        transport_uri: transport_uri(publish_base_url),
        credentials: credentials.clone(),
    }
}

/// Build the request pausing the agent for `instance_id`.
#[must_use]
pub fn pause_request(instance_id: &InstanceId, run_mode: RunMode) -> PauseAgentRequest {
    PauseAgentRequest {
        name: AgentName::for_instance(instance_id),
        run_mode,
    }
}

/// Build the request resuming the agent for `instance_id`.
#[must_use]
pub fn resume_request(
    instance_id: &InstanceId,
    run_mode: RunMode,
    credentials: &AgentCredentials,
) -> ResumeAgentRequest {
    ResumeAgentRequest {
        name: AgentName::for_instance(instance_id),
        run_mode,
        credentials: credentials.clone(),
    }
}

/// Build the request deleting the agent for `instance_id`.
#[must_use]
pub fn delete_request(instance_id: &InstanceId, run_mode: RunMode) -> DeleteAgentRequest {
    DeleteAgentRequest {
        name: AgentName::for_instance(instance_id),
        run_mode,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instance() -> InstanceId {
        InstanceId::new("i-0123abcd").unwrap()
    }

    fn creds() -> AgentCredentials {
        AgentCredentials::new("replicator", "s3cret")
    }

    fn field<'a>(fields: &'a [(&'static str, String)], key: &str) -> Option<&'a str> {
        fields
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn create_request_embeds_name_and_transport() {
        let request = create_request(&instance(), "http://publish:4503", RunMode::Author, &creds());

        assert_eq!(request.name.as_str(), "replicationAgent-i-0123abcd");
        assert_eq!(request.run_mode, RunMode::Author);
        assert_eq!(request.description, "Replication agent for publish i-0123abcd");
        assert_eq!(
            request.transport_uri,
            "http://publish:4503/bin/receive?sling:authRequestLogin=1"
        );
        assert_eq!(request.credentials, creds());
    }

    #[test]
    fn transport_uri_trims_trailing_slash() {
        assert_eq!(
            transport_uri("http://publish:4503/"),
            "http://publish:4503/bin/receive?sling:authRequestLogin=1"
        );
    }

    #[test]
    fn requests_are_deterministic() {
        let id = instance();
        assert_eq!(
            create_request(&id, "http://publish:4503", RunMode::Author, &creds()),
            create_request(&id, "http://publish:4503", RunMode::Author, &creds())
        );
        assert_eq!(pause_request(&id, RunMode::Author), pause_request(&id, RunMode::Author));
        assert_eq!(
            resume_request(&id, RunMode::Publish, &creds()),
            resume_request(&id, RunMode::Publish, &creds())
        );
        assert_eq!(delete_request(&id, RunMode::Author), delete_request(&id, RunMode::Author));
    }

    #[test]
    fn create_form_carries_transport_settings() {
        let fields = create_request(&instance(), "http://publish:4503", RunMode::Author, &creds())
            .form_fields();

        assert_eq!(field(&fields, "jcr:content/enabled"), Some("true"));
        assert_eq!(
            field(&fields, "jcr:content/transportUri"),
            Some("http://publish:4503/bin/receive?sling:authRequestLogin=1")
        );
        assert_eq!(field(&fields, "jcr:content/transportUser"), Some("replicator"));
        assert_eq!(field(&fields, "jcr:content/transportPassword"), Some("s3cret"));
        assert_eq!(
            field(&fields, "jcr:content/jcr:title"),
            Some("replicationAgent-i-0123abcd")
        );
    }

    #[test]
    fn pause_form_only_disables() {
        let fields = pause_request(&instance(), RunMode::Author).form_fields();
        assert_eq!(fields, vec![("jcr:content/enabled", "false".to_string())]);
    }

    #[test]
    fn resume_form_resupplies_credentials() {
        let fields = resume_request(&instance(), RunMode::Author, &creds()).form_fields();
        assert_eq!(field(&fields, "jcr:content/enabled"), Some("true"));
        assert_eq!(field(&fields, "jcr:content/transportUser"), Some("replicator"));
        assert_eq!(field(&fields, "jcr:content/transportPassword"), Some("s3cret"));
        assert!(field(&fields, "jcr:content/transportUri").is_none());
    }

    #[test]
    fn request_actions() {
        assert_eq!(CreateAgentRequest::ACTION, AgentAction::Create);
        assert_eq!(PauseAgentRequest::ACTION, AgentAction::Pause);
        assert_eq!(ResumeAgentRequest::ACTION, AgentAction::Resume);
        assert_eq!(DeleteAgentRequest::ACTION, AgentAction::Delete);

        let request = delete_request(&instance(), RunMode::Publish);
        assert_eq!(request.run_mode(), RunMode::Publish);
        assert_eq!(request.name().as_str(), "replicationAgent-i-0123abcd");
    }
}
