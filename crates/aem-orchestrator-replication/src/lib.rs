//! Replication agent lifecycle management for the AEM orchestrator.
//!
//! When a publish instance joins or leaves the fleet, the author instance
//! needs a replication agent created, paused, resumed or deleted so content
//! is distributed to exactly the running publish instances.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Event Ingestor                         │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 ReplicationAgentManager                     │
//! │  ┌─────────────┐ ┌─────────────┐ ┌─────────────────────┐    │
//! │  │   Agent     │ │  Request    │ │    Response         │    │
//! │  │   Naming    │ │  Builder    │ │    Validation       │    │
//! │  └─────────────┘ └─────────────┘ └─────────────────────┘    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//!                    ┌───────────────────┐
//!                    │   AgentGateway    │
//!                    │   (trait)         │
//!                    └─────────┬─────────┘
//!                              │ HTTP
//!                    ┌─────────▼─────────┐
//!                    │  Author instance  │
//!                    │  management API   │
//!                    └───────────────────┘
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use aem_orchestrator_core::{AgentCredentials, ClientConfig, InstanceId, RunMode};
//! use aem_orchestrator_replication::{HttpAgentGateway, ReplicationAgentManager};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let gateway = HttpAgentGateway::new(
//!     &ClientConfig::default(),
//!     AgentCredentials::new("orchestrator", "password"),
//! )?;
//! let manager = ReplicationAgentManager::new(
//!     Arc::new(gateway),
//!     AgentCredentials::new("replicator", "password"),
//! );
//!
//! let instance_id = InstanceId::new("i-0123abcd")?;
//! manager
//!     .create(&instance_id, "http://publish:4503", "http://author:4502", RunMode::Author)
//!     .await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod gateway;
pub mod manager;
pub mod request;

pub use error::{GatewayError, GatewayResult, ReplicationError, Result};
pub use gateway::{AgentGateway, GatewayResponse, HttpAgentGateway};
pub use manager::ReplicationAgentManager;
pub use request::{
    AgentRequest, CreateAgentRequest, DeleteAgentRequest, PauseAgentRequest, ResumeAgentRequest,
};

#[cfg(any(test, feature = "test-utils"))]
pub use gateway::mock::{MockAgent, MockAgentGateway};
