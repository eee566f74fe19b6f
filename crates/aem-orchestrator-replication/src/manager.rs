//! Replication agent lifecycle manager.
//!
//! The manager keeps no record of which agents exist. Every operation derives
//! the agent name, builds the request, makes one gateway call and reports the
//! answer. The author instance stays the only source of truth, so each
//! operation is safe to repeat when an event is redelivered:
//!
//! - `create` targets the same derived path and overwrites the agent
//! - `pause` / `resume` re-send the same enabled flag
//! - `delete` of an agent the remote reports as absent succeeds

use std::sync::Arc;

use aem_orchestrator_core::{AgentAction, AgentCredentials, InstanceId, RunMode};

use crate::error::{GatewayResult, ReplicationError, Result};
use crate::gateway::{AgentGateway, GatewayResponse};
use crate::request;

/// Creates, pauses, resumes and deletes the replication agent serving each
/// publish instance.
pub struct ReplicationAgentManager<G: AgentGateway> {
    gateway: Arc<G>,
    replicator_credentials: AgentCredentials,
}

impl<G: AgentGateway> ReplicationAgentManager<G> {
    /// Create a manager issuing calls through `gateway`.
    ///
    /// `replicator_credentials` authenticate the replication transport of
    /// created and resumed agents.
    #[must_use]
    pub fn new(gateway: Arc<G>, replicator_credentials: AgentCredentials) -> Self {
        Self {
            gateway,
            replicator_credentials,
        }
    }

    /// Get a reference to the gateway.
    #[must_use]
    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Create the agent replicating to the publish instance `instance_id`.
    ///
    /// # Errors
    ///
    /// Returns `ReplicationError::Api` if the management API rejects the
    /// request and `ReplicationError::Transport` if it cannot be reached.
    pub async fn create(
        &self,
        instance_id: &InstanceId,
        publish_base_url: &str,
        author_base_url: &str,
        run_mode: RunMode,
    ) -> Result<()> {
        tracing::info!(instance_id = %instance_id, "Creating replication agent");

        let request = request::create_request(
            instance_id,
            publish_base_url,
            run_mode,
            &self.replicator_credentials,
        );
        tracing::debug!(
            agent = %request.name,
            transport_uri = %request.transport_uri,
            author = %author_base_url,
            "Built create request"
        );

        let result = self.gateway.create_agent(author_base_url, &request).await;
        Self::check(AgentAction::Create, instance_id, result)
    }

    /// Disable the agent for `instance_id` without removing it.
    ///
    /// Pausing an already paused agent succeeds.
    ///
    /// # Errors
    ///
    /// Returns `ReplicationError::Api` if the agent does not exist or the
    /// request is rejected, and `ReplicationError::Transport` if the
    /// management API cannot be reached.
    pub async fn pause(
        &self,
        instance_id: &InstanceId,
        author_base_url: &str,
        run_mode: RunMode,
    ) -> Result<()> {
        tracing::info!(instance_id = %instance_id, "Pausing replication agent");

        let request = request::pause_request(instance_id, run_mode);
        let result = self.gateway.pause_agent(author_base_url, &request).await;
        Self::check(AgentAction::Pause, instance_id, result)
    }

    /// Re-enable the agent for `instance_id`.
    ///
    /// # Errors
    ///
    /// Returns `ReplicationError::Api` if the agent does not exist or the
    /// request is rejected, and `ReplicationError::Transport` if the
    /// management API cannot be reached.
    pub async fn resume(
        &self,
        instance_id: &InstanceId,
        author_base_url: &str,
        run_mode: RunMode,
    ) -> Result<()> {
        tracing::info!(instance_id = %instance_id, "Resuming replication agent");

        let request =
            request::resume_request(instance_id, run_mode, &self.replicator_credentials);
        let result = self.gateway.resume_agent(author_base_url, &request).await;
        Self::check(AgentAction::Resume, instance_id, result)
    }

    /// Remove the agent for `instance_id`.
    ///
    /// An agent the remote reports as absent (404) counts as deleted.
    ///
    /// # Errors
    ///
    /// Returns `ReplicationError::Api` for any other rejection and
    /// `ReplicationError::Transport` if the management API cannot be reached.
    pub async fn delete(
        &self,
        instance_id: &InstanceId,
        author_base_url: &str,
        run_mode: RunMode,
    ) -> Result<()> {
        tracing::info!(instance_id = %instance_id, "Deleting replication agent");

        let request = request::delete_request(instance_id, run_mode);
        let result = self.gateway.delete_agent(author_base_url, &request).await;

        match Self::check(AgentAction::Delete, instance_id, result) {
            Err(e) if e.is_absent_on_delete() => {
                tracing::info!(
                    instance_id = %instance_id,
                    agent = %request.name,
                    "Replication agent already absent"
                );
                Ok(())
            }
            other => other,
        }
    }

    /// Validate a gateway answer and attach the action and instance to
    /// any failure.
    fn check(
        action: AgentAction,
        instance_id: &InstanceId,
        result: GatewayResult<GatewayResponse>,
    ) -> Result<()> {
        match result {
            Ok(GatewayResponse { status }) if (200..300).contains(&status) => {
                tracing::debug!(instance_id = %instance_id, action = %action, status, "Management API call succeeded");
                Ok(())
            }
            Ok(GatewayResponse { status }) => Err(ReplicationError::Api {
                action,
                instance_id: instance_id.clone(),
                status,
                body: String::new(),
            }),
            Err(e) => {
                let error = ReplicationError::from_gateway(action, instance_id, e);
                if !error.is_absent_on_delete() {
                    tracing::error!(
                        instance_id = %instance_id,
                        action = %action,
                        status = ?error.status_code(),
                        error = %error,
                        "Management API call failed"
                    );
                }
                Err(error)
            }
        }
    }
}
