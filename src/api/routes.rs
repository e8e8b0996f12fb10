//! HTTP route assembly and shared application state.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::error::GatewayError;
use crate::orchestrator::Orchestrator;
use crate::poll::PollingController;
use crate::task::Task;

use super::models;
use super::videos;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub orchestrator: Orchestrator,
    /// Every task this process has seen, keyed by id. In-memory only; the
    /// store does not survive a restart.
    pub tasks: Arc<RwLock<HashMap<String, Task>>>,
    /// Active polling controllers, one per job-based task.
    pub pollers: RwLock<HashMap<String, Arc<PollingController>>>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let orchestrator = Orchestrator::from_config(&config);
        Self {
            config,
            orchestrator,
            tasks: Arc::new(RwLock::new(HashMap::new())),
            pollers: RwLock::new(HashMap::new()),
        }
    }
}

/// Start the HTTP server.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let port = config.port;
    let state = Arc::new(AppState::new(config));

    let app = Router::new()
        .route("/api/health", get(health))
        .route("/api/providers", get(models::list_providers))
        .nest("/api/models", models::routes())
        .nest("/api/videos", videos::routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// GET /api/health - liveness probe.
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Map a gateway error onto the handler error shape.
pub(super) fn http_error(error: GatewayError) -> (StatusCode, String) {
    (error.status_code(), error.to_string())
}
