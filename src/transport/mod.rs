//! HTTP, WebSocket and SSE surface.
//!
//! A thin layer over `Dashboard`: REST handlers forward commands and read the
//! metrics cache; the push endpoints mirror every published event.

/// HTTP error mapping.
pub mod error;
/// REST handlers.
pub mod handlers;
/// WebSocket and SSE push endpoints.
pub mod stream;

pub use error::{ApiError, ApiResult, ErrorResponse};
pub use stream::InboundCommand;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::dashboard::Dashboard;
use crate::error::{PulseResult, TransportError};

/// Shared handler state.
#[derive(Debug, Clone)]
pub struct AppState {
    dashboard: Arc<Dashboard>,
    closing: Arc<watch::Sender<bool>>,
}

impl AppState {
    /// State for a freshly started server; no stream is closing.
    #[must_use]
    pub fn new(dashboard: Arc<Dashboard>) -> Self {
        let (closing, _) = watch::channel(false);
        Self {
            dashboard,
            closing: Arc::new(closing),
        }
    }

    /// The served dashboard.
    #[must_use]
    pub fn dashboard(&self) -> &Arc<Dashboard> {
        &self.dashboard
    }

    /// Tells every open WebSocket and SSE stream to finish.
    pub fn close_streams(&self) {
        self.closing.send_replace(true);
    }
}

/// Builds the router.
pub fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .route("/simulate", post(handlers::simulate))
        .route("/feedback", post(handlers::feedback))
        .route("/approve_decision", post(handlers::approve_decision))
        .route("/events", get(stream::sse_handler));

    Router::new()
        .nest("/api", api_routes)
        .route("/ws", get(stream::ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Serves `dashboard` on `addr` until `shutdown` resolves.
///
/// Open streams are told to close once `shutdown` resolves, so the graceful
/// drain does not wait on long-lived clients.
///
/// # Errors
///
/// Returns `TransportError::BindFailed` if the address cannot be bound and
/// `TransportError::Server` if serving fails.
pub async fn serve<F>(dashboard: Arc<Dashboard>, addr: SocketAddr, shutdown: F) -> PulseResult<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind(addr).await.map_err(|e| TransportError::BindFailed {
        addr: addr.to_string(),
        message: e.to_string(),
    })?;
    let local = listener.local_addr().map_or_else(|_| addr.to_string(), |a| a.to_string());
    tracing::info!(addr = %local, "listening");

    let state = AppState::new(dashboard);
    let closer = state.clone();
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            shutdown.await;
            closer.close_streams();
        })
        .await
        .map_err(|e| TransportError::Server { message: e.to_string() })?;
    Ok(())
}
