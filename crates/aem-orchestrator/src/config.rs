//! Orchestrator configuration.
//!
//! Configuration is read once at startup into an immutable
//! [`OrchestratorConfig`] and passed by reference to whatever needs it.

use std::str::FromStr;
use std::time::Duration;

use aem_orchestrator_core::{AgentCredentials, ClientConfig, RunMode};
use aem_orchestrator_fleet::{FleetStack, FleetStacks};
use thiserror::Error;

/// AWS regions the orchestrator accepts.
pub const KNOWN_REGIONS: &[&str] = &[
    "af-south-1",
    "ap-east-1",
    "ap-northeast-1",
    "ap-northeast-2",
    "ap-northeast-3",
    "ap-south-1",
    "ap-south-2",
    "ap-southeast-1",
    "ap-southeast-2",
    "ap-southeast-3",
    "ap-southeast-4",
    "ca-central-1",
    "ca-west-1",
    "cn-north-1",
    "cn-northwest-1",
    "eu-central-1",
    "eu-central-2",
    "eu-north-1",
    "eu-south-1",
    "eu-south-2",
    "eu-west-1",
    "eu-west-2",
    "eu-west-3",
    "il-central-1",
    "me-central-1",
    "me-south-1",
    "sa-east-1",
    "us-east-1",
    "us-east-2",
    "us-gov-east-1",
    "us-gov-west-1",
    "us-west-1",
    "us-west-2",
];

/// Errors raised while loading configuration. All are fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required variable is not set.
    #[error("missing required configuration {0}")]
    Missing(&'static str),

    /// A variable is set but cannot be used.
    #[error("invalid configuration {var}: {reason}")]
    Invalid {
        /// The offending variable.
        var: &'static str,
        /// Why it was rejected.
        reason: String,
    },

    /// The region is not a known AWS region.
    #[error("unknown AWS region: {0}")]
    UnknownRegion(String),
}

/// Identity of the durable queue carrying fleet lifecycle events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueConfig {
    /// NATS server URL.
    pub nats_url: String,
    /// JetStream stream holding fleet events.
    pub stream: String,
    /// Durable consumer name.
    pub consumer: String,
    /// How long a delivered message may stay unacknowledged before the
    /// server redelivers it, in seconds.
    pub ack_wait_seconds: u64,
    /// Delay before a released message is delivered again, in seconds.
    pub retry_delay_seconds: u64,
    /// Deliveries after which the server gives up on a message.
    pub max_deliver: i64,
}

impl QueueConfig {
    /// Get the acknowledgement wait as a `Duration`.
    #[must_use]
    pub const fn ack_wait(&self) -> Duration {
        Duration::from_secs(self.ack_wait_seconds)
    }

    /// Get the retry delay as a `Duration`.
    #[must_use]
    pub const fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_seconds)
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            nats_url: "nats://localhost:4222".to_string(),
            stream: "aem-fleet-events".to_string(),
            consumer: "aem-orchestrator".to_string(),
            ack_wait_seconds: 300,
            retry_delay_seconds: 30,
            max_deliver: 20,
        }
    }
}

/// Author instance settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AemConfig {
    /// Base URL of the author instance's management API.
    pub author_base_url: String,
    /// Run mode used when an event does not name one.
    pub run_mode: RunMode,
    /// Credentials the orchestrator authenticates with.
    pub orchestrator_credentials: AgentCredentials,
    /// Credentials replication agents use towards publish instances.
    pub replicator_credentials: AgentCredentials,
}

/// Complete orchestrator configuration.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Event queue identity.
    pub queue: QueueConfig,
    /// AWS region the fleets live in.
    pub region: String,
    /// Outbound HTTP client settings.
    pub client: ClientConfig,
    /// Stack coordinates of the managed fleets.
    pub fleets: FleetStacks,
    /// Signing proxy answering fleet resolution lookups.
    pub fleet_resolution_endpoint: String,
    /// Author instance settings.
    pub aem: AemConfig,
}

impl OrchestratorConfig {
    /// Load configuration from environment variables.
    ///
    /// Supported environment variables:
    /// - `NATS_URL`, `QUEUE_STREAM`, `QUEUE_CONSUMER`, `QUEUE_ACK_WAIT_SECS`,
    ///   `QUEUE_RETRY_DELAY_SECS`, `QUEUE_MAX_DELIVER`
    /// - `AWS_REGION` (required)
    /// - `CLIENT_USE_PROXY`, `CLIENT_PROXY_PROTOCOL`, `CLIENT_PROXY_HOST`,
    ///   `CLIENT_PROXY_PORT`, `CLIENT_CONNECTION_TIMEOUT_MS`,
    ///   `CLIENT_REQUEST_TIMEOUT_MS`, `CLIENT_MAX_ERROR_RETRY`
    /// - `STACK_NAME_PUBLISH`, `STACK_NAME_PUBLISH_DISPATCHER`,
    ///   `STACK_NAME_AUTHOR_DISPATCHER` (required)
    /// - `LOGICAL_ID_PUBLISH`, `LOGICAL_ID_PUBLISH_DISPATCHER`,
    ///   `LOGICAL_ID_AUTHOR_DISPATCHER` (required)
    /// - `FLEET_RESOLUTION_ENDPOINT` (required; a request-signing proxy in
    ///   front of CloudFormation)
    /// - `AEM_AUTHOR_BASE_URL`, `AEM_ORCHESTRATOR_USERNAME`,
    ///   `AEM_ORCHESTRATOR_PASSWORD`, `AEM_REPLICATOR_USERNAME`,
    ///   `AEM_REPLICATOR_PASSWORD` (required), `AEM_RUN_MODE`
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if a required variable is missing, a value
    /// cannot be parsed, or the region is unknown.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// See [`OrchestratorConfig::from_env`].
    pub fn from_vars<F>(var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(var);

        let region = vars.required("AWS_REGION")?;
        if !KNOWN_REGIONS.contains(&region.as_str()) {
            return Err(ConfigError::UnknownRegion(region));
        }

        let queue_defaults = QueueConfig::default();
        let queue = QueueConfig {
            nats_url: vars.or("NATS_URL", queue_defaults.nats_url),
            stream: vars.or("QUEUE_STREAM", queue_defaults.stream),
            consumer: vars.or("QUEUE_CONSUMER", queue_defaults.consumer),
            ack_wait_seconds: vars.parsed("QUEUE_ACK_WAIT_SECS", queue_defaults.ack_wait_seconds)?,
            retry_delay_seconds: vars
                .parsed("QUEUE_RETRY_DELAY_SECS", queue_defaults.retry_delay_seconds)?,
            max_deliver: vars.parsed("QUEUE_MAX_DELIVER", queue_defaults.max_deliver)?,
        };
        if queue.max_deliver < 1 {
            return Err(ConfigError::Invalid {
                var: "QUEUE_MAX_DELIVER",
                reason: format!("must be at least 1, got {}", queue.max_deliver),
            });
        }

        let client = Self::client_config(&vars)?;

        let fleets = FleetStacks {
            publish: FleetStack::new(
                vars.required("STACK_NAME_PUBLISH")?,
                vars.required("LOGICAL_ID_PUBLISH")?,
            ),
            publish_dispatcher: FleetStack::new(
                vars.required("STACK_NAME_PUBLISH_DISPATCHER")?,
                vars.required("LOGICAL_ID_PUBLISH_DISPATCHER")?,
            ),
            author_dispatcher: FleetStack::new(
                vars.required("STACK_NAME_AUTHOR_DISPATCHER")?,
                vars.required("LOGICAL_ID_AUTHOR_DISPATCHER")?,
            ),
        };

        let fleet_resolution_endpoint = vars.required("FLEET_RESOLUTION_ENDPOINT")?;

        let aem = AemConfig {
            author_base_url: vars.required("AEM_AUTHOR_BASE_URL")?,
            run_mode: vars.parsed("AEM_RUN_MODE", RunMode::Author)?,
            orchestrator_credentials: AgentCredentials::new(
                vars.required("AEM_ORCHESTRATOR_USERNAME")?,
                vars.required("AEM_ORCHESTRATOR_PASSWORD")?,
            ),
            replicator_credentials: AgentCredentials::new(
                vars.required("AEM_REPLICATOR_USERNAME")?,
                vars.required("AEM_REPLICATOR_PASSWORD")?,
            ),
        };

        Ok(Self {
            queue,
            region,
            client,
            fleets,
            fleet_resolution_endpoint,
            aem,
        })
    }

    fn client_config<F>(vars: &Vars<F>) -> Result<ClientConfig, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = ClientConfig::default();
        let config = ClientConfig {
            use_proxy: vars.parsed("CLIENT_USE_PROXY", defaults.use_proxy)?,
            proxy_protocol: vars.or("CLIENT_PROXY_PROTOCOL", defaults.proxy_protocol),
            proxy_host: vars.or("CLIENT_PROXY_HOST", defaults.proxy_host),
            proxy_port: vars.parsed("CLIENT_PROXY_PORT", defaults.proxy_port)?,
            connection_timeout_ms: vars
                .parsed("CLIENT_CONNECTION_TIMEOUT_MS", defaults.connection_timeout_ms)?,
            request_timeout_ms: vars.parsed("CLIENT_REQUEST_TIMEOUT_MS", defaults.request_timeout_ms)?,
            max_error_retry: vars.parsed("CLIENT_MAX_ERROR_RETRY", defaults.max_error_retry)?,
        };

        if !matches!(config.proxy_protocol.to_ascii_lowercase().as_str(), "http" | "https") {
            return Err(ConfigError::Invalid {
                var: "CLIENT_PROXY_PROTOCOL",
                reason: format!("expected http or https, got {}", config.proxy_protocol),
            });
        }
        if config.use_proxy && config.proxy_host.is_empty() {
            return Err(ConfigError::Missing("CLIENT_PROXY_HOST"));
        }
        Ok(config)
    }
}

/// Variable source with typed accessors.
struct Vars<F>(F);

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    fn required(&self, key: &'static str) -> Result<String, ConfigError> {
        self.get(key).ok_or(ConfigError::Missing(key))
    }

    fn or(&self, key: &str, default: String) -> String {
        self.get(key).unwrap_or(default)
    }

    fn parsed<T>(&self, key: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get(key) {
            Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
                var: key,
                reason: e.to_string(),
            }),
            None => Ok(default),
        }
    }
}
