//! HTTP server for the question wizard.
//!
//! Provides REST endpoints for:
//! - Form profiles and defaults
//! - Session lifecycle (create, inspect, reset, close)
//! - Key verification and roster selection
//! - Prompt preview and generation
//!
//! Idle sessions are evicted by a [`SessionSweeper`] that lives as long as the server.

pub mod routes;
pub mod state;

pub use routes::create_router;
pub use state::AppState;

use std::future::Future;
use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::session::SessionSweeper;

/// Full application: API routes plus CORS and request tracing.
pub fn app(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    create_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Serve the wizard on the configured address until `shutdown_signal` completes.
///
/// The session sweeper is started alongside the listener and stopped once the server
/// has drained.
///
/// # Errors
/// Returns an error if the listener cannot bind or the server fails.
pub async fn run_server_with_shutdown<F>(
    state: Arc<AppState>,
    shutdown_signal: F,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = state.config.bind_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("MCQ wizard listening on http://{addr}");

    let sweeper = SessionSweeper::new(
        Arc::clone(&state.sessions),
        state.config.session_ttl(),
        state.config.sweep_interval(),
    );
    let stop_sweeper = sweeper.shutdown_notifier();
    let sweeper_task = sweeper.spawn();

    let served = axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal)
        .await;

    stop_sweeper.notify_one();
    if let Err(e) = sweeper_task.await {
        warn!("Session sweeper ended abnormally: {e}");
    }

    served?;
    Ok(())
}
