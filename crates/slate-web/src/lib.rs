//! HTTP server streaming slate chat responses as Server-Sent Events.
//!
//! `slate-web` wraps the [`slate_rs`] response pipeline in an axum server.
//! Each `POST /chat` runs one turn for a session: the user message is
//! appended, the history is brought back under the context budget, the
//! [`TextSource`] is streamed through artifact extraction and chat filtering,
//! and every pipeline event is forwarded to the client as one SSE `data:`
//! frame.
//!
//! # Quick start
//!
//! ```ignore
//! use std::sync::Arc;
//! use slate_rs::pipeline::{ScriptedSource, TracingSink};
//! use slate_web::{WebConfig, spawn_web};
//!
//! let source = Arc::new(ScriptedSource::new(["Hello ", "there!"]));
//! let handle = spawn_web(source, Arc::new(TracingSink), WebConfig::default()).await?;
//! println!("Listening on http://{}", handle.addr);
//! ```
//!
//! # Endpoints
//!
//! | Route | Description |
//! |-------|-------------|
//! | `POST /chat` | `{message, session_id?}` → `text/event-stream` of pipeline events |
//! | `GET /health` | Liveness probe |
//! | `GET /api/sessions/{id}/context` | Context usage of an existing session |
//! | `DELETE /api/sessions/{id}` | Drop a session |
//!
//! Anything else is served from the optional static directory, or answered
//! with a JSON 404.

mod api;
mod server;
mod sse;

pub use api::{AppState, ChatRequest, DEFAULT_SESSION_ID};
pub use server::{build_router, start_server};

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use slate_rs::context::{ContextConfig, ContextManager};
use slate_rs::pipeline::{ArtifactSink, TextSource};
use slate_rs::session::SessionStore;

/// System prompt used when none is configured.
pub const DEFAULT_SYSTEM_PROMPT: &str = "\
You are a helpful assistant. When you produce standalone content such as code, \
an HTML page, HAML markup, or a longer document, wrap it in \
<artifact type=\"code|html|haml|markdown|text\" title=\"...\" language=\"...\"> \
... </artifact> so it can be shown separately from the chat.";

/// How often idle sessions are swept.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Configuration for the web server.
#[derive(Debug, Clone)]
pub struct WebConfig {
    /// Address to bind to. Default: `127.0.0.1:5000`.
    pub bind_addr: SocketAddr,
    /// Directory served for unknown routes. `None` serves only the API.
    pub static_dir: Option<PathBuf>,
    /// Base system prompt sent with every turn.
    pub system_prompt: String,
    /// Sessions idle this long are evicted. Default: one hour.
    pub session_idle_ttl: Duration,
    /// Context window thresholds applied before each turn.
    pub context: ContextConfig,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 5000)),
            static_dir: None,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            session_idle_ttl: Duration::from_secs(3600),
            context: ContextConfig::default(),
        }
    }
}

impl WebConfig {
    pub fn with_bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    pub fn with_static_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.static_dir = Some(dir.into());
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_session_idle_ttl(mut self, ttl: Duration) -> Self {
        self.session_idle_ttl = ttl;
        self
    }

    pub fn with_context(mut self, context: ContextConfig) -> Self {
        self.context = context;
        self
    }
}

/// A running server.
#[derive(Debug, Clone)]
pub struct WebHandle {
    /// The bound address (useful when binding port 0).
    pub addr: SocketAddr,
    /// The server's session store.
    pub sessions: SessionStore,
}

/// Spawn the web server and the idle-session sweeper on Tokio tasks.
///
/// Both run until the Tokio runtime shuts down. Fails only if the bind
/// address cannot be bound.
pub async fn spawn_web(
    source: Arc<dyn TextSource>,
    sink: Arc<dyn ArtifactSink>,
    config: WebConfig,
) -> std::io::Result<WebHandle> {
    let sessions = SessionStore::new();
    let state = AppState {
        sessions: sessions.clone(),
        source,
        sink,
        manager: Arc::new(ContextManager::new(config.context)),
        system_prompt: Arc::from(config.system_prompt),
    };
    let router = build_router(state, config.static_dir);
    let addr = start_server(router, config.bind_addr).await?;

    let sweeper = sessions.clone();
    let ttl = config.session_idle_ttl;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SWEEP_INTERVAL);
        interval.tick().await;
        loop {
            interval.tick().await;
            sweeper.evict_idle(ttl);
        }
    });

    Ok(WebHandle { addr, sessions })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = WebConfig::default();
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:5000");
        assert!(config.static_dir.is_none());
        assert_eq!(config.session_idle_ttl, Duration::from_secs(3600));
        assert_eq!(config.context.context_window, 200_000);
    }

    #[test]
    fn builders_override_fields() {
        let config = WebConfig::default()
            .with_bind_addr(([0, 0, 0, 0], 8080).into())
            .with_static_dir("public")
            .with_system_prompt("Be brief.")
            .with_session_idle_ttl(Duration::from_secs(5));
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.static_dir, Some(PathBuf::from("public")));
        assert_eq!(config.system_prompt, "Be brief.");
        assert_eq!(config.session_idle_ttl, Duration::from_secs(5));
    }
}
