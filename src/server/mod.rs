//! HTTP surface of the study assistant.
pub mod routes;
pub mod state;

use anyhow::{Context, Result};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{delete, get, post},
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::{info, warn};

pub use state::AppState;

/// Build the router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let server = &state.config().server;

    let origins: Vec<HeaderValue> = server
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Ignoring invalid CORS origin {origin}: {e}");
                None
            }
        })
        .collect();
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any);

    let static_files = ServeDir::new(&server.static_dir);
    let upload_limit = DefaultBodyLimit::max(server.max_upload_bytes);

    Router::new()
        .route("/", get(routes::home))
        .route("/health", get(routes::health))
        .route("/upload", post(routes::upload).layer(upload_limit))
        .route("/agent", post(routes::run_agent))
        .route("/documents/:user_id", get(routes::list_documents))
        .route(
            "/documents/:user_id/:document_id",
            delete(routes::delete_document),
        )
        .route(
            "/history/:user_id/:document_id",
            get(routes::document_history),
        )
        .nest_service("/static", static_files)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Serve until Ctrl-C.
pub async fn serve(state: AppState) -> Result<()> {
    let addr = state.config().bind_address();
    std::fs::create_dir_all(&state.config().server.static_dir)
        .with_context(|| format!("failed to create {}", state.config().server.static_dir))?;

    let router = build_router(state);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!("StudyMate listening on http://{addr}");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
