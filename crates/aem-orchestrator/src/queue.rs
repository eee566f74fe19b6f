//! Durable event queue.
//!
//! Fleet events arrive on a queue with explicit acknowledgement: a message
//! that is received but never acknowledged is delivered again later. The
//! ingestor releases messages whose lifecycle operation may succeed on a
//! later attempt and acknowledges everything else.

use std::time::Duration;

use async_nats::jetstream;
use async_nats::jetstream::consumer::{pull, AckPolicy, DeliverPolicy};
use async_nats::jetstream::AckKind;
use async_trait::async_trait;
use futures::StreamExt;
use thiserror::Error;

use crate::config::QueueConfig;

/// Queue failures. All of them stop the ingestor.
#[derive(Debug, Error)]
pub enum QueueError {
    /// The queue could not be reached or set up.
    #[error("queue connection failed: {0}")]
    Connect(String),

    /// Pulling the next message failed.
    #[error("failed to receive message: {0}")]
    Receive(String),

    /// A message could not be acknowledged or released.
    #[error("failed to acknowledge message: {0}")]
    Acknowledge(String),
}

/// One delivered message.
#[derive(Debug)]
pub struct QueueMessage<R> {
    /// Raw event payload.
    pub payload: Vec<u8>,
    /// Handle used to acknowledge this delivery.
    pub receipt: R,
}

/// A queue delivering messages one at a time with explicit acknowledgement.
#[async_trait]
pub trait LifecycleQueue: Send {
    /// Handle identifying one delivery.
    type Receipt: Send;

    /// Wait for the next message. `None` means the queue has closed.
    ///
    /// # Errors
    ///
    /// Returns `QueueError::Receive` if the queue fails.
    async fn receive(&mut self) -> Result<Option<QueueMessage<Self::Receipt>>, QueueError>;

    /// Mark a delivery as handled so it is not delivered again.
    ///
    /// # Errors
    ///
    /// Returns `QueueError::Acknowledge` if the queue rejects the
    /// acknowledgement.
    async fn acknowledge(&mut self, receipt: Self::Receipt) -> Result<(), QueueError>;

    /// Hand a delivery back so it is delivered again after a delay.
    ///
    /// # Errors
    ///
    /// Returns `QueueError::Acknowledge` if the queue rejects the release.
    async fn release(&mut self, receipt: Self::Receipt) -> Result<(), QueueError>;
}

/// Queue backed by a durable JetStream pull consumer.
///
/// The consumer stops redelivering a message after `max_deliver` attempts.
pub struct JetStreamQueue {
    messages: pull::Stream,
    retry_delay: Duration,
}

impl JetStreamQueue {
    /// Connect to NATS and bind the durable consumer.
    ///
    /// The stream must already exist; the consumer is created on first use.
    ///
    /// # Errors
    ///
    /// Returns `QueueError::Connect` if the server, stream or consumer
    /// cannot be reached.
    pub async fn connect(config: &QueueConfig) -> Result<Self, QueueError> {
        tracing::info!(url = %config.nats_url, stream = %config.stream, "Connecting to NATS");

        let client = async_nats::ConnectOptions::new()
            .retry_on_initial_connect()
            .connect(&config.nats_url)
            .await
            .map_err(|e| QueueError::Connect(e.to_string()))?;
        let context = jetstream::new(client);

        let stream = context
            .get_stream(&config.stream)
            .await
            .map_err(|e| QueueError::Connect(format!("stream {}: {e}", config.stream)))?;

        let consumer = stream
            .get_or_create_consumer(
                &config.consumer,
                pull::Config {
                    durable_name: Some(config.consumer.clone()),
                    deliver_policy: DeliverPolicy::All,
                    ack_policy: AckPolicy::Explicit,
                    ack_wait: config.ack_wait(),
                    max_deliver: config.max_deliver,
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| QueueError::Connect(format!("consumer {}: {e}", config.consumer)))?;

        let messages = consumer
            .messages()
            .await
            .map_err(|e| QueueError::Connect(e.to_string()))?;

        tracing::info!(
            consumer = %config.consumer,
            max_deliver = config.max_deliver,
            "NATS consumer ready"
        );
        Ok(Self {
            messages,
            retry_delay: config.retry_delay(),
        })
    }
}

#[async_trait]
impl LifecycleQueue for JetStreamQueue {
    type Receipt = jetstream::Message;

    async fn receive(&mut self) -> Result<Option<QueueMessage<Self::Receipt>>, QueueError> {
        match self.messages.next().await {
            Some(Ok(message)) => Ok(Some(QueueMessage {
                payload: message.payload.to_vec(),
                receipt: message,
            })),
            Some(Err(e)) => Err(QueueError::Receive(e.to_string())),
            None => Ok(None),
        }
    }

    async fn acknowledge(&mut self, receipt: Self::Receipt) -> Result<(), QueueError> {
        receipt
            .ack()
            .await
            .map_err(|e| QueueError::Acknowledge(e.to_string()))
    }

    async fn release(&mut self, receipt: Self::Receipt) -> Result<(), QueueError> {
        receipt
            .ack_with(AckKind::Nak(Some(self.retry_delay)))
            .await
            .map_err(|e| QueueError::Acknowledge(e.to_string()))
    }
}

/// In-memory queue for tests.
#[cfg(any(test, feature = "test-utils"))]
pub mod memory {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::{BTreeMap, VecDeque};
    use std::sync::Arc;

    #[derive(Debug, Default)]
    struct State {
        next_id: u64,
        pending: VecDeque<(u64, Vec<u8>)>,
        in_flight: BTreeMap<u64, Vec<u8>>,
        acked: Vec<Vec<u8>>,
        deliveries: usize,
        releases: usize,
    }

    /// A queue whose handles share one set of messages.
    ///
    /// `receive` returns `None` once nothing is pending, so an ingestor run
    /// drains the queue and stops. Released deliveries go to the back of the
    /// queue immediately. Deliveries that are neither acknowledged nor
    /// released stay in flight until [`InMemoryQueue::redeliver_unacked`]
    /// puts them back, as after a crash.
    #[derive(Debug, Clone, Default)]
    pub struct InMemoryQueue {
        state: Arc<Mutex<State>>,
    }

    impl InMemoryQueue {
        /// Create an empty queue.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Enqueue a payload.
        pub fn push(&self, payload: impl Into<Vec<u8>>) {
            let mut state = self.state.lock();
            let id = state.next_id;
            state.next_id += 1;
            state.pending.push_back((id, payload.into()));
        }

        /// Payloads acknowledged so far, in order.
        #[must_use]
        pub fn acked(&self) -> Vec<Vec<u8>> {
            self.state.lock().acked.clone()
        }

        /// Number of delivered but unacknowledged messages.
        #[must_use]
        pub fn unacked_count(&self) -> usize {
            self.state.lock().in_flight.len()
        }

        /// Total number of deliveries, redeliveries included.
        #[must_use]
        pub fn delivery_count(&self) -> usize {
            self.state.lock().deliveries
        }

        /// Number of deliveries handed back for a retry.
        #[must_use]
        pub fn release_count(&self) -> usize {
            self.state.lock().releases
        }

        /// Put every unacknowledged delivery back on the queue.
        pub fn redeliver_unacked(&self) {
            let mut state = self.state.lock();
            let in_flight = std::mem::take(&mut state.in_flight);
            state.pending.extend(in_flight);
        }
    }

    #[async_trait]
    impl LifecycleQueue for InMemoryQueue {
        type Receipt = u64;

        async fn receive(&mut self) -> Result<Option<QueueMessage<u64>>, QueueError> {
            let mut state = self.state.lock();
            let Some((id, payload)) = state.pending.pop_front() else {
                return Ok(None);
            };
            state.deliveries += 1;
            state.in_flight.insert(id, payload.clone());
            Ok(Some(QueueMessage {
                payload,
                receipt: id,
            }))
        }

        async fn acknowledge(&mut self, receipt: u64) -> Result<(), QueueError> {
            let mut state = self.state.lock();
            let payload = state
                .in_flight
                .remove(&receipt)
                .ok_or_else(|| QueueError::Acknowledge(format!("unknown receipt {receipt}")))?;
            state.acked.push(payload);
            Ok(())
        }

        async fn release(&mut self, receipt: u64) -> Result<(), QueueError> {
            let mut state = self.state.lock();
            let payload = state
                .in_flight
                .remove(&receipt)
                .ok_or_else(|| QueueError::Acknowledge(format!("unknown receipt {receipt}")))?;
            state.releases += 1;
            state.pending.push_back((receipt, payload));
            Ok(())
        }
    }
}
