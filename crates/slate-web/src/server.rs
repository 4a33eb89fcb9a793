//! Axum server setup and router construction.

use std::net::SocketAddr;
use std::path::PathBuf;

use axum::Router;
use axum::routing::{any, delete, get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::info;

use crate::api::{self, AppState};

/// Build the full axum router.
///
/// The router serves:
/// - The chat stream at `/chat`
/// - Health and session endpoints
/// - Optional static files for everything else, or a JSON 404
pub fn build_router(state: AppState, static_dir: Option<PathBuf>) -> Router {
    // Permissive CORS so a separately served frontend can call the API.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let router = Router::new()
        .route("/chat", post(api::post_chat))
        .route("/health", get(api::get_health))
        .route("/api/sessions/{id}", delete(api::delete_session))
        .route("/api/sessions/{id}/context", get(api::get_session_context))
        .with_state(state);

    let router = match static_dir {
        Some(dir) => router.fallback_service(
            ServeDir::new(dir)
                .call_fallback_on_method_not_allowed(true)
                .fallback(any(api::not_found)),
        ),
        None => router.fallback(api::not_found),
    };

    router.layer(cors)
}

/// Bind `bind_addr`, serve `router` on a spawned task, and return the bound
/// address.
pub async fn start_server(router: Router, bind_addr: SocketAddr) -> std::io::Result<SocketAddr> {
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    let addr = listener.local_addr()?;
    info!(%addr, "Serving");

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            tracing::error!("Server stopped: {e}");
        }
    });

    Ok(addr)
}
