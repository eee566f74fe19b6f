//! Event ingestor.
//!
//! Pulls fleet events one at a time, routes publish fleet events to the
//! replication agent manager and settles each delivery. A message is fully
//! handled before the next is pulled.
//!
//! Only failures that may clear on a later attempt (transport errors, 429,
//! 5xx) are handed back to the queue. Everything else is acknowledged so a
//! permanently failing event is not redelivered forever.

use aem_orchestrator_core::AgentAction;
use aem_orchestrator_fleet::{FleetIdentifiers, FleetRole};
use aem_orchestrator_replication::{AgentGateway, ReplicationAgentManager, ReplicationError};
use thiserror::Error;

use crate::config::AemConfig;
use crate::event::{EventError, FleetEvent};
use crate::queue::{LifecycleQueue, QueueError};

/// Errors raised while ingesting events.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The queue failed. Fatal for [`EventIngestor::run`].
    #[error(transparent)]
    Queue(#[from] QueueError),

    /// The payload is not a usable fleet event.
    #[error(transparent)]
    MalformedEvent(#[from] EventError),

    /// The lifecycle operation failed.
    #[error(transparent)]
    Lifecycle(#[from] ReplicationError),
}

/// What happened to one delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// The lifecycle operation succeeded. Acknowledged.
    Applied,
    /// The event concerns a fleet without replication agents. Acknowledged.
    Skipped,
    /// The payload can never be handled. Acknowledged.
    Discarded,
    /// The management API refused the operation in a way a retry cannot
    /// fix. Acknowledged.
    Rejected,
    /// The lifecycle operation failed but may succeed later. Released for
    /// redelivery.
    Deferred,
}

impl Disposition {
    /// Whether the delivery is acknowledged.
    #[must_use]
    pub const fn acknowledges(self) -> bool {
        !matches!(self, Self::Deferred)
    }
}

/// Drives the replication agent manager from a lifecycle queue.
pub struct EventIngestor<'a, G: AgentGateway, Q: LifecycleQueue> {
    manager: &'a ReplicationAgentManager<G>,
    fleets: &'a FleetIdentifiers,
    aem: &'a AemConfig,
    queue: Q,
}

impl<'a, G: AgentGateway, Q: LifecycleQueue> EventIngestor<'a, G, Q> {
    /// Create an ingestor reading from `queue`.
    pub fn new(
        manager: &'a ReplicationAgentManager<G>,
        fleets: &'a FleetIdentifiers,
        aem: &'a AemConfig,
        queue: Q,
    ) -> Self {
        Self {
            manager,
            fleets,
            aem,
            queue,
        }
    }

    /// Apply one event.
    ///
    /// Returns `Ok(false)` if the event belongs to a fleet without
    /// replication agents and was not applied.
    ///
    /// # Errors
    ///
    /// Returns `IngestError::MalformedEvent` for a create event without a
    /// publish URL and `IngestError::Lifecycle` if the operation fails.
    pub async fn handle(&self, event: &FleetEvent) -> Result<bool, IngestError> {
        match self.fleets.role_of(&event.fleet) {
            Some(FleetRole::Publish) => {}
            role => {
                tracing::debug!(
                    fleet = %event.fleet,
                    role = ?role.map(|r| r.as_str()),
                    instance_id = %event.instance_id,
                    "Ignoring event outside the publish fleet"
                );
                return Ok(false);
            }
        }

        let author = self.aem.author_base_url.as_str();
        let run_mode = event.run_mode.unwrap_or(self.aem.run_mode);
        let instance_id = &event.instance_id;

        match event.action {
            AgentAction::Create => {
                let publish_base_url = event
                    .publish_base_url
                    .as_deref()
                    .ok_or_else(|| EventError::MissingPublishBaseUrl(instance_id.clone()))?;
                self.manager
                    .create(instance_id, publish_base_url, author, run_mode)
                    .await?;
            }
            AgentAction::Pause => self.manager.pause(instance_id, author, run_mode).await?,
            AgentAction::Resume => self.manager.resume(instance_id, author, run_mode).await?,
            AgentAction::Delete => self.manager.delete(instance_id, author, run_mode).await?,
        }
        Ok(true)
    }

    /// Receive, handle and settle one message.
    ///
    /// Returns `None` once the queue has closed.
    ///
    /// # Errors
    ///
    /// Returns `IngestError::Queue` if receiving or acknowledging fails.
    pub async fn process_next(&mut self) -> Result<Option<Disposition>, IngestError> {
        let Some(message) = self.queue.receive().await? else {
            return Ok(None);
        };

        let disposition = match FleetEvent::parse(&message.payload) {
            Ok(event) => self.dispose(&event).await,
            Err(e) => {
                tracing::warn!(error = %e, "Discarding malformed event");
                Disposition::Discarded
            }
        };

        if disposition.acknowledges() {
            self.queue.acknowledge(message.receipt).await?;
        } else {
            self.queue.release(message.receipt).await?;
        }
        Ok(Some(disposition))
    }

    /// Process messages until the queue closes.
    ///
    /// # Errors
    ///
    /// Returns `IngestError::Queue` on the first queue failure.
    pub async fn run(&mut self) -> Result<(), IngestError> {
        tracing::info!(publish_fleet = %self.fleets.publish(), "Event ingestor started");
        while self.process_next().await?.is_some() {}
        tracing::info!("Event queue closed");
        Ok(())
    }

    async fn dispose(&self, event: &FleetEvent) -> Disposition {
        match self.handle(event).await {
            Ok(true) => Disposition::Applied,
            Ok(false) => Disposition::Skipped,
            Err(IngestError::MalformedEvent(e)) => {
                tracing::warn!(error = %e, "Discarding malformed event");
                Disposition::Discarded
            }
            Err(IngestError::Lifecycle(e)) if !e.is_retriable() => {
                tracing::error!(
                    instance_id = %event.instance_id,
                    action = %event.action,
                    fleet = %event.fleet,
                    status = ?e.status_code(),
                    error = %e,
                    "Lifecycle operation rejected, dropping event"
                );
                Disposition::Rejected
            }
            Err(e) => {
                tracing::error!(
                    instance_id = %event.instance_id,
                    action = %event.action,
                    fleet = %event.fleet,
                    error = %e,
                    "Lifecycle operation failed, releasing event for redelivery"
                );
                Disposition::Deferred
            }
        }
    }
}
