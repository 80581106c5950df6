//! HTTP surface for kwr-service (§8): submits runs, reports status, and
//! serves the generated roadmap, following the teacher's
//! `AppState`/`create_router`/`AppError` split between transport and the
//! pipeline underneath.

mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderValue, Method};
use axum::{middleware, Router};
use dashmap::DashMap;
use kwr_core::ids::RunId;
use kwr_pipeline::orchestrator::{CancellationSignal, Orchestrator};
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::container::ServiceContainer;

pub use handlers::AppState;

/// Wraps the live `ServiceContainer` and `Orchestrator` together with the
/// registry of cancellation handles for runs currently executing. The
/// registry lives here rather than in `ServiceContainer` because it tracks
/// in-flight HTTP-driven executions, not a provider dependency.
pub struct HttpServer {
    config: ServerConfig,
    app_state: AppState,
}

impl HttpServer {
    pub fn new(config: ServerConfig, container: Arc<ServiceContainer>, orchestrator: Arc<Orchestrator>) -> Self {
        let cancellations: Arc<DashMap<RunId, CancellationSignal>> = Arc::new(DashMap::new());
        let app_state = AppState::new(container, orchestrator, cancellations);
        Self { config, app_state }
    }

    pub fn build_router(&self) -> Router {
        let router = handlers::create_router(self.app_state.clone());

        let middleware_stack = ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(TimeoutLayer::new(Duration::from_secs(self.config.timeout_seconds)))
            .layer(middleware::from_fn(request_logging_middleware));

        let mut app = router.layer(middleware_stack);
        if self.config.enable_cors {
            app = app.layer(self.build_cors_layer());
        }
        app
    }

    pub async fn start(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let addr = SocketAddr::from((self.config.host.parse::<std::net::IpAddr>()?, self.config.port));
        let app = self.build_router();

        info!("Starting HTTP server on {}", addr);
        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
        info!("HTTP server stopped");
        Ok(())
    }

    fn build_cors_layer(&self) -> CorsLayer {
        let mut cors = CorsLayer::new()
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([axum::http::header::CONTENT_TYPE, axum::http::header::AUTHORIZATION]);

        if self.config.cors_origins.is_empty() {
            cors = cors.allow_origin(HeaderValue::from_static("*"));
        } else {
            let origins: Result<Vec<HeaderValue>, _> =
                self.config.cors_origins.iter().map(|origin| origin.parse()).collect();
            match origins {
                Ok(origins) => cors = cors.allow_origin(origins),
                Err(_) => {
                    warn!("Invalid CORS origins configured, allowing all origins");
                    cors = cors.allow_origin(HeaderValue::from_static("*"));
                }
            }
        }
        cors
    }
}

async fn request_logging_middleware(
    request: axum::extract::Request,
    next: middleware::Next,
) -> axum::response::Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let start = std::time::Instant::now();

    let response = next.run(request).await;

    info!(
        method = %method,
        path = %path,
        status = %response.status().as_u16(),
        duration_ms = %start.elapsed().as_millis(),
        "HTTP request processed"
    );
    response
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting graceful shutdown"),
        _ = terminate => info!("Received SIGTERM, starting graceful shutdown"),
    }
}
