//! End-to-end HTTP tests against a live `kwr-service` instance bound to an
//! OS-assigned ephemeral port, driven with `reqwest` the way the teacher's
//! own service-level integration tests exercise `doc-indexer`'s HTTP surface.

use std::net::SocketAddr;
use std::time::Duration;

use kwr_contracts::types::{ApiResponse, HealthResponse, RunSummaryDto};
use kwr_service::{build_pipeline, Config, HttpServer, ServiceContainer};
use serde_json::json;
use tokio::net::TcpListener;

/// Boots a full container + orchestrator + HTTP router on an ephemeral port
/// and returns its base URL. The server task is detached; it outlives the
/// test, which is harmless for a process-local integration test.
async fn spawn_server() -> String {
    let mut settings = kwr_config::Settings::default();
    settings.orchestrator.max_total_keywords = 200;

    let config = Config { server: Default::default(), settings };
    let container = std::sync::Arc::new(ServiceContainer::new(config).await.expect("container init"));
    let orchestrator = std::sync::Arc::new(build_pipeline(&container));

    let server_config = kwr_service::config::ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        timeout_seconds: 30,
        enable_cors: true,
        cors_origins: vec![],
    };
    let http = HttpServer::new(server_config, container, orchestrator);
    let router = http.build_router();

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind ephemeral port");
    let addr: SocketAddr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.ok();
    });

    format!("http://{addr}")
}

#[tokio::test]
async fn healthz_reports_healthy() {
    let base_url = spawn_server().await;
    let client = reqwest::Client::new();

    let response = client.get(format!("{base_url}/healthz")).send().await.expect("request");
    assert_eq!(response.status(), 200);
    let health: HealthResponse = response.json().await.expect("parse health response");
    assert!(health.healthy);
    assert!(!health.components.is_empty());
}

#[tokio::test]
async fn submit_status_and_roadmap_round_trip() {
    let base_url = spawn_server().await;
    let client = reqwest::Client::new();

    let submit_body = json!({
        "owner_id": "integration-test",
        "seeds": ["social selling"],
        "market": "US",
        "language": "en",
        "budget_limit": 50.0,
    });

    let response = client
        .post(format!("{base_url}/api/runs"))
        .json(&submit_body)
        .send()
        .await
        .expect("submit request");
    assert_eq!(response.status(), 200);
    let submitted: ApiResponse<RunSummaryDto> = response.json().await.expect("parse submit response");
    assert!(submitted.success);
    let run_id = submitted.data.expect("run summary").id;

    let mut last_status = String::new();
    for _ in 0..50 {
        let response = client
            .get(format!("{base_url}/api/runs/{run_id}"))
            .send()
            .await
            .expect("status request");
        assert_eq!(response.status(), 200);
        let body: serde_json::Value = response.json().await.expect("parse status response");
        last_status = body["data"]["summary"]["status"].as_str().unwrap_or_default().to_string();
        if last_status == "Completed" || last_status == "Failed" {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert_eq!(last_status, "Completed", "run did not complete against the mock provider stack");

    let response = client
        .get(format!("{base_url}/api/runs/{run_id}/roadmap"))
        .send()
        .await
        .expect("roadmap request");
    assert_eq!(response.status(), 200);
    let roadmap: serde_json::Value = response.json().await.expect("parse roadmap response");
    assert!(roadmap["data"]["items"].as_array().is_some());
}

#[tokio::test]
async fn cancel_on_an_unknown_run_returns_not_found() {
    let base_url = spawn_server().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{base_url}/api/runs/00000000-0000-0000-0000-000000000000/cancel"))
        .send()
        .await
        .expect("cancel request");
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn submit_rejects_more_than_five_seeds() {
    let base_url = spawn_server().await;
    let client = reqwest::Client::new();

    let submit_body = json!({
        "owner_id": "integration-test",
        "seeds": ["a", "b", "c", "d", "e", "f"],
        "market": "US",
        "language": "en",
        "budget_limit": 50.0,
    });

    let response = client
        .post(format!("{base_url}/api/runs"))
        .json(&submit_body)
        .send()
        .await
        .expect("submit request");
    assert_eq!(response.status(), 400);
}
