//! HTTP router
//!
//! Wires the request pipeline into axum. The backend client is injected
//! through [`AppState`]; there is no global client.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::routing::post;
use axum::Router;

use environment::Environment;

use crate::backend::BackendClient;
use crate::config::GatewayConfig;
use crate::pipeline;

/// Read-only state shared by every request
#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<dyn BackendClient>,
    pub environment: Environment,
    pub backend_timeout: Duration,
    pub gateway_version: Arc<str>,
}

impl AppState {
    pub fn new(backend: Arc<dyn BackendClient>, config: &GatewayConfig) -> Self {
        Self {
            backend,
            environment: config.environment,
            backend_timeout: config.backend_timeout(),
            gateway_version: config.gateway_version().into(),
        }
    }
}

/// Build the gateway's HTTP routes
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/process",
            post(pipeline::process).fallback(pipeline::method_not_allowed),
        )
        .layer(DefaultBodyLimit::max(pipeline::MAX_BODY_BYTES))
        .with_state(state)
}
