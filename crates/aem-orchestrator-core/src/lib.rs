//! Core types and utilities for the AEM orchestrator.
//!
//! This crate provides the foundational types shared by the replication and
//! fleet crates:
//!
//! - **Identifiers**: [`InstanceId`] and the [`AgentName`] derived from it
//! - **Agent vocabulary**: [`AgentAction`], [`RunMode`], [`AgentCredentials`]
//! - **HTTP plumbing**: [`ClientConfig`] with proxy, timeout and bounded
//!   transport retry
//!
//! # Example
//!
//! ```
//! use aem_orchestrator_core::{AgentName, InstanceId};
//!
//! let instance_id = InstanceId::new("i-0123abcd").unwrap();
//! let name = AgentName::for_instance(&instance_id);
//!
//! assert_eq!(name.as_str(), "replicationAgent-i-0123abcd");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod client;
pub mod error;
pub mod ids;
pub mod types;

pub use client::ClientConfig;
pub use error::{CoreError, Result};
pub use ids::{AgentName, InstanceId};
pub use types::{AgentAction, AgentCredentials, RunMode};
