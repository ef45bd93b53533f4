use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;

use crate::error::{AppError, Result};

mod handlers;
mod session;
mod state;

pub use session::SessionStore;
pub use state::AppState;

/// How many ports after the requested one are tried when it is taken.
const PORT_ATTEMPTS: u16 = 10;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/api/fetch", post(handlers::fetch))
        .route("/api/generate", post(handlers::generate))
        .route("/api/generate/stream", get(handlers::generate_stream))
        .route("/api/history", get(handlers::history_list))
        .route("/api/history/:name", get(handlers::history_view))
        .with_state(Arc::new(state))
}

/// Binds to localhost on `port`, or the next free port after it.
pub async fn bind(port: u16) -> Result<TcpListener> {
    for candidate in port..port.saturating_add(PORT_ATTEMPTS) {
        match TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], candidate))).await {
            Ok(listener) => {
                if candidate != port {
                    tracing::warn!("Port {} is in use, using {}", port, candidate);
                }
                return Ok(listener);
            }
            Err(e) => tracing::debug!("Cannot bind port {}: {}", candidate, e),
        }
    }
    Err(AppError::Config(format!(
        "no free port in {}..{}",
        port,
        port.saturating_add(PORT_ATTEMPTS)
    )))
}

/// Serves the UI until Ctrl-C.
pub async fn serve(listener: TcpListener, state: AppState) -> Result<()> {
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}
