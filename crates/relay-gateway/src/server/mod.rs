//! Relay server setup
//!
//! Provides the HTTP routes, middleware, and listener lifecycle.

mod handler;
mod login;
mod remote_addr;
mod response;
mod state;

pub use handler::ws_handler;
pub use login::{login, method_not_allowed, LoginForm};
pub use remote_addr::resolve_remote_addr;
pub use response::{ApiError, ApiResult};
pub use state::GatewayState;

use crate::connection::ConnectionRegistry;
use crate::protocol::CloseCode;
use axum::{
    routing::{get, post},
    Router,
};
use relay_common::{AppConfig, AppError};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// How long shutdown waits for writers to flush their close frames
const SHUTDOWN_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Create the relay router
pub fn create_router() -> Router<GatewayState> {
    Router::new()
        .route("/login", post(login).fallback(method_not_allowed))
        .route("/ws", get(ws_handler))
        .route("/ws/", get(ws_handler))
        .route("/ws/*rest", get(ws_handler))
        .route("/health", get(health_check))
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

/// Build the complete application
pub fn create_app(state: GatewayState) -> Router {
    create_router()
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the relay server until a shutdown signal arrives
pub async fn run_server(
    app: Router,
    addr: SocketAddr,
    registry: Arc<ConnectionRegistry>,
) -> Result<(), AppError> {
    tracing::info!("Starting relay server on {}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::Config(format!("Failed to bind to {addr}: {e}")))?;

    tracing::info!("Relay listening on http://{}", addr);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal(registry.clone()))
        .await?;

    drain_connections(&registry, SHUTDOWN_DRAIN_TIMEOUT).await;

    Ok(())
}

/// Run the complete relay server with configuration
pub async fn run(config: AppConfig) -> Result<(), AppError> {
    let addr = config.server.socket_addr()?;

    let state = GatewayState::new(config);
    let registry = state.registry().clone();

    let app = create_app(state);

    run_server(app, addr, registry).await
}

/// Resolve on Ctrl-C or SIGTERM, after asking every connection to close
async fn shutdown_signal(registry: Arc<ConnectionRegistry>) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }

    tracing::info!(connections = registry.len(), "Shutdown signal received");
    registry.close_all(CloseCode::GoingAway);
}

/// Wait until every connection has deregistered or the timeout passes
async fn drain_connections(registry: &ConnectionRegistry, limit: Duration) {
    let drained = tokio::time::timeout(limit, async {
        while !registry.is_empty() {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    })
    .await;

    if drained.is_err() {
        tracing::warn!(remaining = registry.len(), "Shutdown drain timed out");
    }
}
