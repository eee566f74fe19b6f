//! Fleet identity resolution for the AEM orchestrator.
//!
//! The orchestrator manages three autoscaled fleets (publish, publish
//! dispatcher, author dispatcher). Each is declared as an auto scaling group
//! inside a CloudFormation stack; this crate turns those logical
//! descriptions into the physical fleet identifiers used to route fleet
//! events.
//!
//! Resolution happens once, at startup. A failure is fatal: without knowing
//! which fleets it manages the orchestrator cannot act safely.
//!
//! # Example
//!
//! ```no_run
//! use aem_orchestrator_core::ClientConfig;
//! use aem_orchestrator_fleet::{CloudFormationLookup, FleetResolver, FleetStack, FleetStacks};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let lookup = CloudFormationLookup::new(&ClientConfig::default(), "http://cfn-signing-proxy:8080")?;
//! let resolver = FleetResolver::new(lookup);
//!
//! let stacks = FleetStacks {
//!     publish: FleetStack::new("aem-publish", "PublishAutoScalingGroup"),
//!     publish_dispatcher: FleetStack::new("aem-publish-dispatcher", "PublishDispatcherAutoScalingGroup"),
//!     author_dispatcher: FleetStack::new("aem-author-dispatcher", "AuthorDispatcherAutoScalingGroup"),
//! };
//! let fleets = resolver.resolve_fleets(&stacks).await?;
//! println!("publish fleet: {}", fleets.publish());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod resolver;
pub mod types;

pub use error::{FleetError, Result};
pub use resolver::{CloudFormationLookup, FleetResolver, StackResourceLookup};
pub use types::{FleetIdentifiers, FleetRole, FleetStack, FleetStacks};

#[cfg(any(test, feature = "test-utils"))]
pub use resolver::mock::MockStackResourceLookup;
