//! Ingestor tests over the in-memory queue and gateway.

use std::sync::Arc;

use aem_orchestrator::{
    AemConfig, Disposition, EventIngestor, FleetEvent, InMemoryQueue, LifecycleQueue,
};
use aem_orchestrator_core::{AgentAction, AgentCredentials, RunMode};
use aem_orchestrator_fleet::FleetIdentifiers;
use aem_orchestrator_replication::{GatewayError, MockAgentGateway, ReplicationAgentManager};

const AUTHOR: &str = "http://author:4502";
const PUBLISH_FLEET: &str = "publish-asg-7F3";
const AGENT: &str = "replicationAgent-i-0123abcd";

struct Harness {
    gateway: Arc<MockAgentGateway>,
    manager: ReplicationAgentManager<MockAgentGateway>,
    fleets: FleetIdentifiers,
    aem: AemConfig,
    queue: InMemoryQueue,
}

impl Harness {
    fn new() -> Self {
        let gateway = Arc::new(MockAgentGateway::new());
        let replicator = AgentCredentials::new("replicator", "repl-pass");
        Self {
            manager: ReplicationAgentManager::new(Arc::clone(&gateway), replicator.clone()),
            gateway,
            fleets: FleetIdentifiers::new(PUBLISH_FLEET, "pd-asg-1A2", "ad-asg-9C4"),
            aem: AemConfig {
                author_base_url: AUTHOR.to_string(),
                run_mode: RunMode::Author,
                orchestrator_credentials: AgentCredentials::new("orchestrator", "orch-pass"),
                replicator_credentials: replicator,
            },
            queue: InMemoryQueue::new(),
        }
    }

    fn ingestor(&self) -> EventIngestor<'_, MockAgentGateway, InMemoryQueue> {
        EventIngestor::new(&self.manager, &self.fleets, &self.aem, self.queue.clone())
    }

    fn agent_enabled(&self) -> Option<bool> {
        self.gateway
            .agent(RunMode::Author, AGENT)
            .map(|agent| agent.enabled)
    }
}

fn event(fleet: &str, action: &str) -> String {
    format!(
        r#"{{"fleet":"{fleet}","instance_id":"i-0123abcd","action":"{action}","publish_base_url":"http://10.0.1.12:4503"}}"#
    )
}

#[tokio::test]
async fn applies_lifecycle_in_order_and_acknowledges() {
    let harness = Harness::new();
    for action in ["create", "pause", "resume"] {
        harness.queue.push(event(PUBLISH_FLEET, action));
    }

    let mut ingestor = harness.ingestor();
    for _ in 0..3 {
        assert_eq!(
            ingestor.process_next().await.unwrap(),
            Some(Disposition::Applied)
        );
    }
    assert_eq!(ingestor.process_next().await.unwrap(), None);

    let agent = harness.gateway.agent(RunMode::Author, AGENT).unwrap();
    assert!(agent.enabled);
    assert_eq!(
        agent.transport_uri,
        "http://10.0.1.12:4503/bin/receive?sling:authRequestLogin=1"
    );
    assert_eq!(harness.queue.acked().len(), 3);
    assert_eq!(harness.queue.unacked_count(), 0);

    harness.queue.push(event(PUBLISH_FLEET, "delete"));
    harness.ingestor().run().await.unwrap();
    assert_eq!(harness.gateway.agent_count(), 0);
}

#[tokio::test]
async fn events_from_other_fleets_are_skipped() {
    let harness = Harness::new();
    harness.queue.push(event("pd-asg-1A2", "create"));
    harness.queue.push(event("someone-elses-asg", "create"));

    let mut ingestor = harness.ingestor();
    assert_eq!(
        ingestor.process_next().await.unwrap(),
        Some(Disposition::Skipped)
    );
    assert_eq!(
        ingestor.process_next().await.unwrap(),
        Some(Disposition::Skipped)
    );

    assert!(harness.gateway.calls().is_empty());
    assert_eq!(harness.queue.acked().len(), 2);
}

#[tokio::test]
async fn malformed_events_are_discarded() {
    let harness = Harness::new();
    harness.queue.push("{not json");
    harness.queue.push(format!(
        r#"{{"fleet":"{PUBLISH_FLEET}","instance_id":"i-0123abcd","action":"create"}}"#
    ));

    let mut ingestor = harness.ingestor();
    assert_eq!(
        ingestor.process_next().await.unwrap(),
        Some(Disposition::Discarded)
    );
    assert_eq!(
        ingestor.process_next().await.unwrap(),
        Some(Disposition::Discarded)
    );

    assert!(harness.gateway.calls().is_empty());
    assert_eq!(harness.queue.acked().len(), 2);
}

#[tokio::test]
async fn failed_operation_is_redelivered_and_converges() {
    let harness = Harness::new();
    harness.gateway.fail_next(GatewayError::Transport(
        "connection refused".to_string(),
    ));
    harness.queue.push(event(PUBLISH_FLEET, "create"));

    let mut ingestor = harness.ingestor();
    assert_eq!(
        ingestor.process_next().await.unwrap(),
        Some(Disposition::Deferred)
    );
    assert_eq!(harness.queue.release_count(), 1);
    assert!(harness.queue.acked().is_empty());
    assert_eq!(harness.agent_enabled(), None);

    assert_eq!(
        ingestor.process_next().await.unwrap(),
        Some(Disposition::Applied)
    );
    assert_eq!(harness.agent_enabled(), Some(true));
    assert_eq!(harness.queue.unacked_count(), 0);
    assert_eq!(harness.queue.delivery_count(), 2);
}

#[tokio::test]
async fn server_errors_are_released_for_retry() {
    let harness = Harness::new();
    harness.gateway.fail_next(GatewayError::Rejected {
        status: 503,
        body: "repository unavailable".to_string(),
    });
    harness.queue.push(event(PUBLISH_FLEET, "create"));

    harness.ingestor().run().await.unwrap();

    assert_eq!(harness.queue.release_count(), 1);
    assert_eq!(harness.queue.acked().len(), 1);
    assert_eq!(harness.agent_enabled(), Some(true));
}

#[tokio::test]
async fn crash_before_acknowledgement_converges_on_redelivery() {
    let harness = Harness::new();
    harness.queue.push(event(PUBLISH_FLEET, "create"));
    harness.ingestor().run().await.unwrap();

    // Apply a pause, then stop before acknowledging it.
    harness.queue.push(event(PUBLISH_FLEET, "pause"));
    let mut interrupted = harness.queue.clone();
    let delivery = interrupted.receive().await.unwrap().unwrap();
    let pause = FleetEvent::parse(&delivery.payload).unwrap();
    assert!(harness.ingestor().handle(&pause).await.unwrap());
    drop(delivery);
    assert_eq!(harness.queue.unacked_count(), 1);

    harness.queue.redeliver_unacked();
    harness.ingestor().run().await.unwrap();

    assert_eq!(harness.agent_enabled(), Some(false));
    assert_eq!(harness.gateway.agent_count(), 1);
    assert_eq!(harness.queue.unacked_count(), 0);
    assert_eq!(harness.queue.acked().len(), 2);
    assert_eq!(harness.queue.delivery_count(), 3);
}

#[tokio::test]
async fn redelivered_events_are_harmless() {
    let harness = Harness::new();
    for action in ["create", "create", "pause", "pause", "delete", "delete"] {
        harness.queue.push(event(PUBLISH_FLEET, action));
    }

    let mut ingestor = harness.ingestor();
    while let Some(disposition) = ingestor.process_next().await.unwrap() {
        assert_eq!(disposition, Disposition::Applied);
    }

    assert_eq!(harness.gateway.agent_count(), 0);
    assert_eq!(harness.queue.acked().len(), 6);
    let actions: Vec<AgentAction> = harness
        .gateway
        .calls()
        .into_iter()
        .map(|(action, author, name)| {
            assert_eq!(author, AUTHOR);
            assert_eq!(name, AGENT);
            action
        })
        .collect();
    assert_eq!(
        actions,
        [
            AgentAction::Create,
            AgentAction::Create,
            AgentAction::Pause,
            AgentAction::Pause,
            AgentAction::Delete,
            AgentAction::Delete,
        ]
    );
}

#[tokio::test]
async fn permanent_rejections_are_acknowledged_not_redelivered() {
    let harness = Harness::new();
    let mut ingestor = harness.ingestor();

    // Pause of an agent that was never created.
    harness.queue.push(event(PUBLISH_FLEET, "pause"));
    assert_eq!(
        ingestor.process_next().await.unwrap(),
        Some(Disposition::Rejected)
    );

    harness.gateway.fail_next(GatewayError::Rejected {
        status: 401,
        body: "Unauthorized".to_string(),
    });
    harness.queue.push(event(PUBLISH_FLEET, "create"));
    assert_eq!(
        ingestor.process_next().await.unwrap(),
        Some(Disposition::Rejected)
    );

    assert_eq!(ingestor.process_next().await.unwrap(), None);
    assert_eq!(harness.queue.delivery_count(), 2);
    assert_eq!(harness.queue.release_count(), 0);
    assert_eq!(harness.queue.acked().len(), 2);
    assert_eq!(harness.gateway.agent_count(), 0);
}

#[tokio::test]
async fn event_run_mode_overrides_configured_one() {
    let harness = Harness::new();
    harness.queue.push(format!(
        r#"{{"fleet":"{PUBLISH_FLEET}","instance_id":"i-0123abcd","action":"create","run_mode":"publish","publish_base_url":"http://10.0.1.12:4503"}}"#
    ));

    harness.ingestor().run().await.unwrap();

    assert!(harness.gateway.agent(RunMode::Publish, AGENT).is_some());
    assert!(harness.gateway.agent(RunMode::Author, AGENT).is_none());
}
