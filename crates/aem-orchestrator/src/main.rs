//! AEM Orchestrator
//!
//! Entry point for the orchestrator daemon. Resolves the managed fleets,
//! then consumes fleet events until the queue closes or the process is
//! interrupted.

use std::sync::Arc;

use aem_orchestrator::{EventIngestor, JetStreamQueue, OrchestratorConfig};
use aem_orchestrator_fleet::{CloudFormationLookup, FleetResolver};
use aem_orchestrator_replication::{HttpAgentGateway, ReplicationAgentManager};
use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,aem_orchestrator=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting AEM Orchestrator");

    let config = OrchestratorConfig::from_env().context("failed to load configuration")?;
    tracing::info!(
        region = %config.region,
        author = %config.aem.author_base_url,
        run_mode = %config.aem.run_mode,
        proxy = config.client.use_proxy,
        "Configuration loaded"
    );

    let lookup = CloudFormationLookup::new(&config.client, &config.fleet_resolution_endpoint)
        .context("failed to build fleet resolution client")?;
    let fleets = FleetResolver::new(lookup)
        .resolve_fleets(&config.fleets)
        .await
        .context("failed to resolve fleet identifiers")?;

    let gateway = HttpAgentGateway::new(&config.client, config.aem.orchestrator_credentials.clone())
        .context("failed to build management API client")?;
    let manager =
        ReplicationAgentManager::new(Arc::new(gateway), config.aem.replicator_credentials.clone());

    let queue = JetStreamQueue::connect(&config.queue)
        .await
        .context("failed to connect to the event queue")?;
    let mut ingestor = EventIngestor::new(&manager, &fleets, &config.aem, queue);

    tokio::select! {
        result = ingestor.run() => result.context("event ingestion failed")?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received interrupt, shutting down");
        }
    }

    Ok(())
}
