//! Tests for the HTTP management API gateway against a mock author instance.

use std::sync::Arc;

use aem_orchestrator_core::{AgentCredentials, ClientConfig, InstanceId, RunMode};
use aem_orchestrator_replication::{
    request, AgentGateway, GatewayError, HttpAgentGateway, ReplicationAgentManager,
    ReplicationError,
};
use wiremock::matchers::{basic_auth, body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const AGENT_PATH: &str = "/etc/replication/agents.author/replicationAgent-i-0123abcd";
const AGENT_JSON_PATH: &str = "/etc/replication/agents.author/replicationAgent-i-0123abcd.json";

fn instance() -> InstanceId {
    InstanceId::new("i-0123abcd").unwrap()
}

fn gateway() -> HttpAgentGateway {
    let config = ClientConfig {
        max_error_retry: 0,
        ..ClientConfig::default()
    };
    HttpAgentGateway::new(&config, AgentCredentials::new("orchestrator", "orch-pass")).unwrap()
}

async fn mount_existing_agent(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(AGENT_JSON_PATH))
        .and(basic_auth("orchestrator", "orch-pass"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"jcr:primaryType":"cq:Page"}"#))
        .mount(server)
        .await;
}

/// Answers every POST with 201, creating resources the way Sling does, and
/// 404 to reads of anything not created first.
async fn mount_sling_post_servlet(server: &MockServer) {
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_string("No resource found"))
        .mount(server)
        .await;
}

fn manager() -> ReplicationAgentManager<HttpAgentGateway> {
    ReplicationAgentManager::new(
        Arc::new(gateway()),
        AgentCredentials::new("replicator", "repl-pass"),
    )
}

#[tokio::test]
async fn create_posts_agent_form_with_basic_auth() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(AGENT_PATH))
        .and(basic_auth("orchestrator", "orch-pass"))
        .and(body_string_contains("jcr%3Acontent%2Fenabled=true"))
        .and(body_string_contains(
            "jcr%3Acontent%2FtransportUri=http%3A%2F%2Fpublish%3A4503%2Fbin%2Freceive",
        ))
        .and(body_string_contains("jcr%3Acontent%2FtransportUser=replicator"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    manager()
        .create(&instance(), "http://publish:4503", &server.uri(), RunMode::Author)
        .await
        .unwrap();
}

#[tokio::test]
async fn pause_posts_disabled_flag() {
    let server = MockServer::start().await;
    mount_existing_agent(&server).await;
    Mock::given(method("POST"))
        .and(path(AGENT_PATH))
        .and(body_string_contains("jcr%3Acontent%2Fenabled=false"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    manager()
        .pause(&instance(), &server.uri(), RunMode::Author)
        .await
        .unwrap();
}

#[tokio::test]
async fn resume_resupplies_transport_credentials() {
    let server = MockServer::start().await;
    mount_existing_agent(&server).await;
    Mock::given(method("POST"))
        .and(path(AGENT_PATH))
        .and(body_string_contains("jcr%3Acontent%2Fenabled=true"))
        .and(body_string_contains("jcr%3Acontent%2FtransportPassword=repl-pass"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    manager()
        .resume(&instance(), &server.uri(), RunMode::Author)
        .await
        .unwrap();
}

#[tokio::test]
async fn delete_uses_delete_verb() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path(AGENT_PATH))
        .and(basic_auth("orchestrator", "orch-pass"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    manager()
        .delete(&instance(), &server.uri(), RunMode::Author)
        .await
        .unwrap();
}

#[tokio::test]
async fn delete_of_absent_agent_succeeds() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path(AGENT_PATH))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    manager()
        .delete(&instance(), &server.uri(), RunMode::Author)
        .await
        .unwrap();
}

#[tokio::test]
async fn pause_of_missing_agent_surfaces_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(AGENT_JSON_PATH))
        .respond_with(ResponseTemplate::new(404).set_body_string("No resource found"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let err = manager()
        .pause(&instance(), &server.uri(), RunMode::Author)
        .await
        .unwrap_err();

    match err {
        ReplicationError::Api { status, body, .. } => {
            assert_eq!(status, 404);
            assert_eq!(body, "No resource found");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn pause_and_resume_never_create_a_missing_agent() {
    let server = MockServer::start().await;
    mount_sling_post_servlet(&server).await;
    let missing = InstanceId::new("i-never-created").unwrap();

    let paused = manager()
        .pause(&missing, &server.uri(), RunMode::Author)
        .await
        .unwrap_err();
    assert!(paused.is_not_found());

    let resumed = manager()
        .resume(&missing, &server.uri(), RunMode::Author)
        .await
        .unwrap_err();
    assert!(resumed.is_not_found());

    let requests = server.received_requests().await.unwrap();
    assert!(requests.iter().all(|r| r.method.as_str() == "GET"));
    assert_eq!(requests.len(), 2);
}

#[tokio::test]
async fn gateway_reports_rejections_distinctly_from_transport_failures() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(AGENT_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_string("repository error"))
        .mount(&server)
        .await;

    mount_existing_agent(&server).await;

    let pause = request::pause_request(&instance(), RunMode::Author);
    let rejected = gateway().pause_agent(&server.uri(), &pause).await.unwrap_err();
    assert_eq!(
        rejected,
        GatewayError::Rejected {
            status: 500,
            body: "repository error".to_string()
        }
    );

    let unreachable = gateway()
        .pause_agent("http://127.0.0.1:1", &pause)
        .await
        .unwrap_err();
    assert!(matches!(unreachable, GatewayError::Transport(_)));
    assert_eq!(unreachable.status_code(), None);
}
