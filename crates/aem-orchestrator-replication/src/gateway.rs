//! Management API gateway.
//!
//! [`AgentGateway`] exposes exactly one call per [`AgentAction`].
//! [`HttpAgentGateway`] implements it over the author instance's Sling
//! endpoints:
//!
//! - Create, pause and resume: `POST /etc/replication/agents.{run_mode}/{name}`
//!   with form fields (the payload distinguishes the action)
//! - Delete: `DELETE /etc/replication/agents.{run_mode}/{name}`
//!
//! The Sling POST servlet creates whatever resource it is posted to, so pause
//! and resume first read `{name}.json` and report a 404 instead of writing a
//! half-configured agent.

use aem_orchestrator_core::{AgentCredentials, AgentName, ClientConfig, CoreError, RunMode};
use async_trait::async_trait;

use crate::error::{GatewayError, GatewayResult};
use crate::request::{
    AgentRequest, CreateAgentRequest, DeleteAgentRequest, PauseAgentRequest, ResumeAgentRequest,
};

/// Successful answer from the management API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GatewayResponse {
    /// HTTP status code (always 2xx).
    pub status: u16,
}

/// Trait for management API communication.
///
/// This trait abstracts the author instance's management surface, allowing
/// mock implementations in tests.
#[async_trait]
pub trait AgentGateway: Send + Sync {
    /// Create (or overwrite) an agent.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Rejected` on a non-2xx answer and
    /// `GatewayError::Transport` if no answer was received.
    async fn create_agent(
        &self,
        author_base_url: &str,
        request: &CreateAgentRequest,
    ) -> GatewayResult<GatewayResponse>;

    /// Disable an agent.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Rejected` with status 404 if the agent does not
    /// exist, `GatewayError::Rejected` on any other non-2xx answer and
    /// `GatewayError::Transport` if no answer was received.
    async fn pause_agent(
        &self,
        author_base_url: &str,
        request: &PauseAgentRequest,
    ) -> GatewayResult<GatewayResponse>;

    /// Re-enable an agent.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Rejected` with status 404 if the agent does not
    /// exist, `GatewayError::Rejected` on any other non-2xx answer and
    /// `GatewayError::Transport` if no answer was received.
    async fn resume_agent(
        &self,
        author_base_url: &str,
        request: &ResumeAgentRequest,
    ) -> GatewayResult<GatewayResponse>;

    /// Remove an agent.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Rejected` on a non-2xx answer and
    /// `GatewayError::Transport` if no answer was received.
    async fn delete_agent(
        &self,
        author_base_url: &str,
        request: &DeleteAgentRequest,
    ) -> GatewayResult<GatewayResponse>;
}

/// Path of an agent resource relative to the author base URL.
#[must_use]
pub fn agent_path(run_mode: RunMode, name: &AgentName) -> String {
    format!("/etc/replication/agents.{run_mode}/{name}")
}

/// Full URL of an agent resource.
#[must_use]
pub fn agent_url(author_base_url: &str, run_mode: RunMode, name: &AgentName) -> String {
    format!(
        "{}{}",
        author_base_url.trim_end_matches('/'),
        agent_path(run_mode, name)
    )
}

/// HTTP gateway to the author instance's management API.
#[derive(Debug, Clone)]
pub struct HttpAgentGateway {
    client: reqwest::Client,
    client_config: ClientConfig,
    credentials: AgentCredentials,
}

impl HttpAgentGateway {
    /// Create a gateway authenticating with `credentials`.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::HttpClient` if the HTTP client cannot be built.
    pub fn new(client_config: &ClientConfig, credentials: AgentCredentials) -> Result<Self, CoreError> {
        Ok(Self {
            client: client_config.build_client()?,
            client_config: client_config.clone(),
            credentials,
        })
    }

    /// Create a gateway with a custom reqwest client.
    #[must_use]
    pub fn with_client(
        client: reqwest::Client,
        client_config: ClientConfig,
        credentials: AgentCredentials,
    ) -> Self {
        Self {
            client,
            client_config,
            credentials,
        }
    }

    async fn post_form<R: AgentRequest + Sync>(
        &self,
        author_base_url: &str,
        request: &R,
        form: &[(&'static str, String)],
    ) -> GatewayResult<GatewayResponse> {
        let url = agent_url(author_base_url, request.run_mode(), request.name());
        tracing::debug!(agent = %request.name(), action = %R::ACTION, url = %url, "Posting agent form");

        let response = self
            .client_config
            .send_with_retry(|| {
                self.client
                    .post(&url)
                    .basic_auth(self.credentials.username(), Some(self.credentials.password()))
                    .form(form)
            })
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        Self::handle_response(response).await
    }

    /// Fail with a 404 rejection unless the agent resource exists.
    async fn ensure_exists<R: AgentRequest + Sync>(
        &self,
        author_base_url: &str,
        request: &R,
    ) -> GatewayResult<()> {
        let url = format!(
            "{}.json",
            agent_url(author_base_url, request.run_mode(), request.name())
        );

        let response = self
            .client_config
            .send_with_retry(|| {
                self.client
                    .get(&url)
                    .basic_auth(self.credentials.username(), Some(self.credentials.password()))
            })
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            tracing::debug!(agent = %request.name(), action = %R::ACTION, "Agent resource not found");
        }
        Self::handle_response(response).await.map(|_| ())
    }

    async fn handle_response(response: reqwest::Response) -> GatewayResult<GatewayResponse> {
        let status = response.status();
        if status.is_success() {
            return Ok(GatewayResponse {
                status: status.as_u16(),
            });
        }

        let body = response.text().await.unwrap_or_default();
        Err(GatewayError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl AgentGateway for HttpAgentGateway {
    async fn create_agent(
        &self,
        author_base_url: &str,
        request: &CreateAgentRequest,
    ) -> GatewayResult<GatewayResponse> {
        self.post_form(author_base_url, request, &request.form_fields())
            .await
    }

    async fn pause_agent(
        &self,
        author_base_url: &str,
        request: &PauseAgentRequest,
    ) -> GatewayResult<GatewayResponse> {
        self.ensure_exists(author_base_url, request).await?;
        self.post_form(author_base_url, request, &request.form_fields())
            .await
    }

    async fn resume_agent(
        &self,
        author_base_url: &str,
        request: &ResumeAgentRequest,
    ) -> GatewayResult<GatewayResponse> {
        self.ensure_exists(author_base_url, request).await?;
        self.post_form(author_base_url, request, &request.form_fields())
            .await
    }

    async fn delete_agent(
        &self,
        author_base_url: &str,
        request: &DeleteAgentRequest,
    ) -> GatewayResult<GatewayResponse> {
        let url = agent_url(author_base_url, request.run_mode, &request.name);
        tracing::debug!(agent = %request.name, url = %url, "Deleting agent resource");

        let response = self
            .client_config
            .send_with_retry(|| {
                self.client
                    .delete(&url)
                    .basic_auth(self.credentials.username(), Some(self.credentials.password()))
            })
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        Self::handle_response(response).await
    }
}

/// In-memory gateway for tests.
#[cfg(any(test, feature = "test-utils"))]
pub mod mock {
    use super::*;
    use aem_orchestrator_core::AgentAction;
    use parking_lot::Mutex;
    use std::collections::{HashMap, VecDeque};

    /// Remote state of an agent held by [`MockAgentGateway`].
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct MockAgent {
        /// Whether the agent is enabled.
        pub enabled: bool,
        /// Transport URI set at creation.
        pub transport_uri: String,
        /// Description set at creation.
        pub description: String,
        /// Transport username last supplied.
        pub transport_user: String,
    }

    /// A gateway that keeps agents in memory, behaving like the remote
    /// management API: pause and resume of an unknown agent answer 404,
    /// create overwrites an existing agent of the same name.
    #[derive(Debug, Default)]
    pub struct MockAgentGateway {
        agents: Mutex<HashMap<(RunMode, String), MockAgent>>,
        calls: Mutex<Vec<(AgentAction, String, String)>>,
        failures: Mutex<VecDeque<GatewayError>>,
    }

    impl MockAgentGateway {
        /// Create an empty mock gateway.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Make the next call fail with `error` without touching state.
        pub fn fail_next(&self, error: GatewayError) {
            self.failures.lock().push_back(error);
        }

        /// Get the number of agents that exist remotely.
        #[must_use]
        pub fn agent_count(&self) -> usize {
            self.agents.lock().len()
        }

        /// Get the remote state of an agent.
        #[must_use]
        pub fn agent(&self, run_mode: RunMode, name: &str) -> Option<MockAgent> {
            self.agents
                .lock()
                .get(&(run_mode, name.to_string()))
                .cloned()
        }

        /// Every call received, as `(action, author_base_url, agent_name)`.
        #[must_use]
        pub fn calls(&self) -> Vec<(AgentAction, String, String)> {
            self.calls.lock().clone()
        }

        fn record(&self, action: AgentAction, author_base_url: &str, name: &AgentName) -> GatewayResult<()> {
            self.calls
                .lock()
                .push((action, author_base_url.to_string(), name.to_string()));
            match self.failures.lock().pop_front() {
                Some(error) => Err(error),
                None => Ok(()),
            }
        }

        fn not_found(name: &AgentName) -> GatewayError {
            GatewayError::Rejected {
                status: 404,
                body: format!("No resource found for {name}"),
            }
        }

        fn set_enabled(
            &self,
            run_mode: RunMode,
            name: &AgentName,
            enabled: bool,
            transport_user: Option<&str>,
        ) -> GatewayResult<GatewayResponse> {
            let mut agents = self.agents.lock();
            let agent = agents
                .get_mut(&(run_mode, name.to_string()))
                .ok_or_else(|| Self::not_found(name))?;
            agent.enabled = enabled;
            if let Some(user) = transport_user {
                agent.transport_user = user.to_string();
            }
            Ok(GatewayResponse { status: 200 })
        }
    }

    #[async_trait]
    impl AgentGateway for MockAgentGateway {
        async fn create_agent(
            &self,
            author_base_url: &str,
            request: &CreateAgentRequest,
        ) -> GatewayResult<GatewayResponse> {
            self.record(AgentAction::Create, author_base_url, &request.name)?;
            let previous = self.agents.lock().insert(
                (request.run_mode, request.name.to_string()),
                MockAgent {
                    enabled: true,
                    transport_uri: request.transport_uri.clone(),
                    description: request.description.clone(),
                    transport_user: request.credentials.username().to_string(),
                },
            );
            let status = if previous.is_some() { 200 } else { 201 };
            Ok(GatewayResponse { status })
        }

        async fn pause_agent(
            &self,
            author_base_url: &str,
            request: &PauseAgentRequest,
        ) -> GatewayResult<GatewayResponse> {
            self.record(AgentAction::Pause, author_base_url, &request.name)?;
            self.set_enabled(request.run_mode, &request.name, false, None)
        }

        async fn resume_agent(
            &self,
            author_base_url: &str,
            request: &ResumeAgentRequest,
        ) -> GatewayResult<GatewayResponse> {
            self.record(AgentAction::Resume, author_base_url, &request.name)?;
            self.set_enabled(
                request.run_mode,
                &request.name,
                true,
                Some(request.credentials.username()),
            )
        }

        async fn delete_agent(
            &self,
            author_base_url: &str,
            request: &DeleteAgentRequest,
        ) -> GatewayResult<GatewayResponse> {
            self.record(AgentAction::Delete, author_base_url, &request.name)?;
            self.agents
                .lock()
                .remove(&(request.run_mode, request.name.to_string()))
                .map(|_| GatewayResponse { status: 204 })
                .ok_or_else(|| Self::not_found(&request.name))
        }
    }
}
