//! Fleet identity resolution.
//!
//! A [`StackResourceLookup`] answers one describe-style question: which
//! physical resource does `(stack_name, logical_id)` refer to?
//! [`FleetResolver`] asks it exactly once per fleet role at startup and
//! freezes the answers into [`FleetIdentifiers`].

use async_trait::async_trait;
use aem_orchestrator_core::ClientConfig;
use serde::Deserialize;

use crate::error::{FleetError, Result};
use crate::types::{FleetIdentifiers, FleetRole, FleetStacks};

/// API version of the describe call.
const CLOUDFORMATION_API_VERSION: &str = "2010-05-15";

/// Trait for describe-style stack resource lookups.
///
/// This trait abstracts the infrastructure API, allowing mock
/// implementations in tests.
#[async_trait]
pub trait StackResourceLookup: Send + Sync {
    /// Return the physical id of `logical_id` in `stack_name`.
    ///
    /// # Errors
    ///
    /// Returns `FleetError::ResolutionFailure` if the stack or resource does
    /// not exist or the lookup cannot be performed.
    async fn physical_resource_id(&self, stack_name: &str, logical_id: &str) -> Result<String>;
}

/// `DescribeStackResource` response envelope.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeStackResourceResponse {
    describe_stack_resource_response: DescribeStackResourceEnvelope,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeStackResourceEnvelope {
    describe_stack_resource_result: DescribeStackResourceResult,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeStackResourceResult {
    stack_resource_detail: StackResourceDetail,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StackResourceDetail {
    #[serde(default)]
    physical_resource_id: Option<String>,
}

/// Lookup over the CloudFormation `DescribeStackResource` query API.
///
/// Requests are unsigned, so `endpoint` must be a signing proxy in front of
/// CloudFormation rather than the public regional endpoint, which rejects
/// unsigned requests.
#[derive(Debug, Clone)]
pub struct CloudFormationLookup {
    client: reqwest::Client,
    client_config: ClientConfig,
    endpoint: String,
}

impl CloudFormationLookup {
    /// Create a lookup against `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns `FleetError::Client` if the HTTP client cannot be built.
    pub fn new(client_config: &ClientConfig, endpoint: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: client_config.build_client()?,
            client_config: client_config.clone(),
            endpoint: endpoint.into(),
        })
    }

    /// Get the endpoint this lookup queries.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl StackResourceLookup for CloudFormationLookup {
    async fn physical_resource_id(&self, stack_name: &str, logical_id: &str) -> Result<String> {
        let url = format!("{}/", self.endpoint.trim_end_matches('/'));
        let query = [
            ("Action", "DescribeStackResource"),
            ("StackName", stack_name),
            ("LogicalResourceId", logical_id),
            ("Version", CLOUDFORMATION_API_VERSION),
        ];

        let response = self
            .client_config
            .send_with_retry(|| {
                self.client
                    .get(&url)
                    .header(reqwest::header::ACCEPT, "application/json")
                    .query(&query)
            })
            .await
            .map_err(|e| FleetError::resolution(stack_name, logical_id, format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FleetError::resolution(
                stack_name,
                logical_id,
                format!("describe returned {status}: {body}"),
            ));
        }

        let parsed: DescribeStackResourceResponse = response.json().await.map_err(|e| {
            FleetError::resolution(stack_name, logical_id, format!("invalid response: {e}"))
        })?;

        parsed
            .describe_stack_resource_response
            .describe_stack_resource_result
            .stack_resource_detail
            .physical_resource_id
            .ok_or_else(|| FleetError::resolution(stack_name, logical_id, "no physical resource id"))
    }
}

/// Resolves logical fleet descriptions into physical fleet identifiers.
pub struct FleetResolver<L: StackResourceLookup> {
    lookup: L,
}

impl<L: StackResourceLookup> FleetResolver<L> {
    /// Create a resolver over `lookup`.
    #[must_use]
    pub const fn new(lookup: L) -> Self {
        Self { lookup }
    }

    /// Resolve one `(stack_name, logical_id)` pair.
    ///
    /// # Errors
    ///
    /// Returns `FleetError::ResolutionFailure` if the lookup fails or yields
    /// an empty id.
    pub async fn resolve(&self, stack_name: &str, logical_id: &str) -> Result<String> {
        let physical_id = self
            .lookup
            .physical_resource_id(stack_name, logical_id)
            .await?;

        if physical_id.trim().is_empty() {
            return Err(FleetError::resolution(
                stack_name,
                logical_id,
                "empty physical resource id",
            ));
        }
        Ok(physical_id)
    }

    /// Resolve every managed fleet, once.
    ///
    /// # Errors
    ///
    /// Returns the first `FleetError::ResolutionFailure`; no partial result
    /// is produced.
    pub async fn resolve_fleets(&self, stacks: &FleetStacks) -> Result<FleetIdentifiers> {
        let publish = self.resolve_role(stacks, FleetRole::Publish).await?;
        let publish_dispatcher = self.resolve_role(stacks, FleetRole::PublishDispatcher).await?;
        let author_dispatcher = self.resolve_role(stacks, FleetRole::AuthorDispatcher).await?;

        Ok(FleetIdentifiers::new(
            publish,
            publish_dispatcher,
            author_dispatcher,
        ))
    }

    async fn resolve_role(&self, stacks: &FleetStacks, role: FleetRole) -> Result<String> {
        let stack = stacks.get(role);
        let physical_id = self.resolve(&stack.stack_name, &stack.logical_id).await?;
        tracing::info!(
            role = %role,
            stack = %stack.stack_name,
            logical_id = %stack.logical_id,
            fleet = %physical_id,
            "Resolved fleet identifier"
        );
        Ok(physical_id)
    }
}

/// In-memory lookup for tests.
#[cfg(any(test, feature = "test-utils"))]
pub mod mock {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    /// A lookup answering from a fixed table and counting calls.
    #[derive(Debug, Default)]
    pub struct MockStackResourceLookup {
        resources: HashMap<(String, String), String>,
        calls: Mutex<Vec<(String, String)>>,
    }

    impl MockStackResourceLookup {
        /// Create an empty lookup.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Register a resource.
        #[must_use]
        pub fn with_resource(
            mut self,
            stack_name: &str,
            logical_id: &str,
            physical_id: &str,
        ) -> Self {
            self.resources.insert(
                (stack_name.to_string(), logical_id.to_string()),
                physical_id.to_string(),
            );
            self
        }

        /// Number of lookups performed.
        #[must_use]
        pub fn call_count(&self) -> usize {
            self.calls.lock().len()
        }
    }

    #[async_trait]
    impl StackResourceLookup for MockStackResourceLookup {
        async fn physical_resource_id(&self, stack_name: &str, logical_id: &str) -> Result<String> {
            self.calls
                .lock()
                .push((stack_name.to_string(), logical_id.to_string()));
            self.resources
                .get(&(stack_name.to_string(), logical_id.to_string()))
                .cloned()
                .ok_or_else(|| {
                    FleetError::resolution(
                        stack_name,
                        logical_id,
                        format!("Stack '{stack_name}' or resource '{logical_id}' does not exist"),
                    )
                })
        }
    }
}
