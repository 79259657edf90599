// Overthinker - HTTP API
// Goals, feedback, manual runs and config over JSON

mod handlers;

pub use handlers::{
    add_feedback, get_config, get_feedback, get_goals, mark_complete, past_runs, root, run_once,
    run_status, set_config, set_goals, ApiError,
};

use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use std::future::Future;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::config::ConfigStore;
use crate::engine::Engine;
use crate::scheduling::PlannerScheduler;
use crate::storage::Storage;

/// Configuration for the HTTP server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (e.g., "127.0.0.1:8000")
    pub bind_address: String,
    /// Static UI directory served under /ui, when it exists
    pub ui_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: crate::config::constants::DEFAULT_HTTP_ADDR.to_string(),
            ui_dir: None,
        }
    }
}

/// Server state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
    pub storage: Arc<Storage>,
    pub config_store: ConfigStore,
    pub scheduler: Arc<Mutex<PlannerScheduler>>,
}

/// Build the API router (no UI, no listener).
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/api/goals/:scope", get(get_goals).post(set_goals))
        .route("/api/run", post(run_once))
        .route("/api/run/status/:scope", get(run_status))
        .route("/api/run/complete/:scope", post(mark_complete))
        .route("/api/run/past/:scope", get(past_runs))
        .route("/api/feedback", post(add_feedback))
        .route("/api/feedback/:scope", get(get_feedback))
        .route("/api/config", get(get_config).post(set_config))
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Bind and serve until `shutdown` resolves.
pub async fn serve<F>(state: AppState, config: ServerConfig, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr: SocketAddr = config.bind_address.parse()?;

    let mut app = create_router(state);
    if let Some(ui_dir) = config.ui_dir.filter(|dir| dir.is_dir()) {
        tracing::info!(dir = %ui_dir.display(), "Serving UI under /ui");
        app = app.nest_service(
            "/ui",
            ServeDir::new(ui_dir).append_index_html_on_directories(true),
        );
    }

    tracing::info!("Starting overthinker API on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
