//! The upload server: one page, one upload endpoint, downloads and history.

pub mod error;
pub mod handlers;
pub mod page;

use crate::{
    config::Config,
    engine::{python::PythonEngine, Engine},
    history::HistoryStore,
};
use anyhow::{Context, Result};
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared state handed to every handler. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<Config>,
    pub engine: Arc<dyn Engine>,
    pub history: HistoryStore,
    /// Held for the whole of a job so pipeline runs and history appends never interleave.
    pub job_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(cfg: &Config, engine: Arc<dyn Engine>) -> Self {
        Self {
            cfg: Arc::new(cfg.clone()),
            engine,
            history: HistoryStore::new(cfg.history_path()),
            job_lock: Arc::new(Mutex::new(())),
        }
    }
}

pub fn router(state: AppState) -> Router {
    let body_limit = state.cfg.server.max_upload_bytes;
    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        .route("/upload", post(handlers::upload))
        .route("/download/{*filename}", get(handlers::download))
        .route("/history", get(handlers::history))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Binds the configured address and serves until Ctrl+C.
pub async fn serve(cfg: &Config) -> Result<()> {
    let engine: Arc<dyn Engine> = Arc::new(PythonEngine::new(cfg));
    let app = router(AppState::new(cfg, engine));

    let addr = format!("{}:{}", cfg.server.host, cfg.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .with_context(|| "server error")?;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        // No signal handler available; run until killed.
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
