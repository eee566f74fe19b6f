//! AEM orchestrator daemon.
//!
//! Listens for fleet lifecycle events and keeps the author instance's
//! replication agents in step with the running publish instances.
//!
//! # Startup
//!
//! 1. Load [`OrchestratorConfig`] from the environment.
//! 2. Resolve the managed fleets into physical identifiers (fatal on error).
//! 3. Connect the [`JetStreamQueue`] and run the [`EventIngestor`].
//!
//! # Delivery
//!
//! Events are handled one at a time. A delivery is acknowledged once its
//! lifecycle operation succeeds, when it can never succeed (a malformed
//! payload or a 4xx rejection) or when it needs no action (another fleet).
//! An operation that may succeed later is released so the queue redelivers
//! it after a delay, up to a bounded number of deliveries; every lifecycle
//! operation tolerates being repeated.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod event;
pub mod ingest;
pub mod queue;

pub use config::{AemConfig, ConfigError, OrchestratorConfig, QueueConfig};
pub use event::{EventError, FleetEvent};
pub use ingest::{Disposition, EventIngestor, IngestError};
pub use queue::{JetStreamQueue, LifecycleQueue, QueueError, QueueMessage};

#[cfg(any(test, feature = "test-utils"))]
pub use queue::memory::InMemoryQueue;
