//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (request ID, tracing, timeout, body limit)
//! - Mount the admin API when enabled
//! - Serve until the shutdown broadcast fires

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    http::Request,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::admin::setup_admin_router;
use crate::config::{AdminConfig, Config, ListenerConfig};
use crate::events::EventDispatcher;
use crate::http::request::{request_id, MakeRequestUuid};
use crate::http::webhook::handle_notification;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<EventDispatcher>,
    pub admin: AdminConfig,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(dispatcher: Arc<EventDispatcher>, admin: AdminConfig) -> Self {
        Self {
            dispatcher,
            admin,
            started_at: Instant::now(),
        }
    }
}

/// HTTP server for webhook intake and administration.
pub struct HttpServer {
    router: Router,
    listener_config: ListenerConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: &Config, dispatcher: Arc<EventDispatcher>) -> Self {
        let state = AppState::new(dispatcher, config.admin.clone());
        Self {
            router: build_router(config, state),
            listener_config: config.listener.clone(),
        }
    }

    /// The fully layered router, for serving or driving directly in tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until a shutdown signal arrives.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            request_timeout_secs = self.listener_config.request_timeout_secs,
            max_body_bytes = self.listener_config.max_body_bytes,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Build the Axum router with all middleware layers.
#[allow(deprecated)]
pub fn build_router(config: &Config, state: AppState) -> Router {
    let mut router = Router::new()
        .route("/", post(handle_notification))
        .route("/health", get(health));

    if config.admin.enabled {
        router = router.merge(setup_admin_router(state.clone()));
    }

    router.with_state(state).layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id(request),
                )
            }))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(RequestBodyLimitLayer::new(config.listener.max_body_bytes))
            // Innermost, so the timeout response body is the router's own.
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.listener.request_timeout_secs,
            ))),
    )
}

async fn health() -> &'static str {
    "ok"
}
