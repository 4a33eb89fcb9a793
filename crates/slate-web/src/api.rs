//! HTTP endpoint handlers.
//!
//! `POST /chat` answers with an SSE stream; everything else is plain JSON.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use slate_rs::Message;
use slate_rs::context::{ContextManager, ContextStatus};
use slate_rs::pipeline::{ArtifactSink, SourceRequest, StreamEvent, TextSource, run_response};
use slate_rs::session::SessionStore;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::sse;

/// Session used when a request names none.
pub const DEFAULT_SESSION_ID: &str = "default";

/// Events buffered between the turn task and the SSE writer.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Shared application state passed to all handlers via axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionStore,
    pub source: Arc<dyn TextSource>,
    pub sink: Arc<dyn ArtifactSink>,
    pub manager: Arc<ContextManager>,
    pub system_prompt: Arc<str>,
}

/// Request body for POST /chat.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
}

fn json_error(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

/// `POST /chat`: run one turn and stream its events.
///
/// Returns 400 when the message is missing or blank. Otherwise the turn runs
/// on its own task and the response is a `text/event-stream` that always
/// ends with a `complete` event.
pub async fn post_chat(State(app): State<AppState>, Json(body): Json<ChatRequest>) -> Response {
    let message = body.message.as_deref().map(str::trim).unwrap_or_default();
    if message.is_empty() {
        return json_error(StatusCode::BAD_REQUEST, "Message is required");
    }
    let message = message.to_string();
    let session_id = body
        .session_id
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| DEFAULT_SESSION_ID.to_string());

    let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    tokio::spawn(run_turn(app, session_id, message, tx));
    sse::event_stream(rx).into_response()
}

/// One chat turn. Holds the session lock from appending the user message
/// until the assistant reply is recorded.
async fn run_turn(app: AppState, session_id: String, message: String, tx: mpsc::Sender<StreamEvent>) {
    let session = app.sessions.get_or_create(&session_id);
    let mut conversation = session.lock().await;
    conversation.push(Message::user(message).stamped());

    let (managed, report) = app.manager.manage(conversation.messages(), &app.system_prompt);
    conversation.replace(managed);
    if report.state.status != ContextStatus::Normal {
        let _ = tx.send(StreamEvent::context(&report.state)).await;
    }

    let request = SourceRequest::from_history(&app.system_prompt, conversation.messages());
    let stream = app.source.stream(request);
    let outcome = run_response(stream, app.sink.as_ref(), &tx).await;

    conversation.push(Message::assistant(outcome.assistant_content()).stamped());
    session.touch();
    info!(
        session = %session_id,
        messages = conversation.len(),
        failed = outcome.error.is_some(),
        "Turn finished"
    );
}

/// `GET /health`: liveness probe.
pub async fn get_health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

/// `GET /api/sessions/{id}/context`: context usage of a session.
///
/// Returns 404 for unknown sessions and 409 while a turn is in progress.
pub async fn get_session_context(State(app): State<AppState>, Path(id): Path<String>) -> Response {
    let Some(session) = app.sessions.get(&id) else {
        return json_error(StatusCode::NOT_FOUND, "Session not found");
    };
    let Some(messages) = session.snapshot() else {
        return json_error(StatusCode::CONFLICT, "Session is busy");
    };
    let state = app.manager.state(&messages, &app.system_prompt);
    Json(serde_json::json!({
        "state": state.snapshot(),
        "message": state.status_message(),
    }))
    .into_response()
}

/// `DELETE /api/sessions/{id}`: drop a session.
///
/// Returns 204 when removed, 404 if it did not exist.
pub async fn delete_session(State(app): State<AppState>, Path(id): Path<String>) -> StatusCode {
    if app.sessions.remove(&id) {
        StatusCode::NO_CONTENT
    } else {
        warn!(session = %id, "Delete of unknown session");
        StatusCode::NOT_FOUND
    }
}

/// Fallback for unknown routes.
pub async fn not_found() -> Response {
    json_error(StatusCode::NOT_FOUND, "Not found")
}
