//! Downstream events emitted while a response streams.
//!
//! Every event serializes as a JSON object tagged by `type`:
//!
//! ```json
//! {"type": "text", "content": "Here is the page: "}
//! {"type": "artifacts_update", "content": [{"id": "artifact_18", "type": "haml", ...}]}
//! {"type": "complete"}
//! ```

use serde::{Deserialize, Serialize};

use super::error::UpstreamError;
use crate::artifact::{Artifact, ArtifactRemoval};
use crate::context::{ContextSnapshot, ContextState};

/// One event in a response stream. Order is significant.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Visible chat text (artifact regions removed).
    Text { content: String },
    /// New or changed artifacts.
    ArtifactsUpdate { content: Vec<Artifact> },
    /// Artifacts dropped at finalization.
    ArtifactsRemove { content: Vec<ArtifactRemoval> },
    /// Context usage notice, sent before streaming when usage is not normal.
    Context {
        state: ContextSnapshot,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    /// A completed artifact could not be materialized. Non-fatal.
    ArtifactError { id: String, content: String },
    TimeoutError { content: String },
    RateLimitError { content: String },
    ConnectionError { content: String },
    StreamError { content: String },
    Error { content: String },
    /// Terminal marker, emitted on every path.
    Complete,
}

impl StreamEvent {
    pub fn text(content: impl Into<String>) -> Self {
        StreamEvent::Text {
            content: content.into(),
        }
    }

    /// Context notice for a state, with its status line.
    pub fn context(state: &ContextState) -> Self {
        StreamEvent::Context {
            state: state.snapshot(),
            message: state.status_message(),
        }
    }

    /// The typed error event for an upstream failure.
    pub fn upstream_error(err: &UpstreamError) -> Self {
        let content = err.to_string();
        match err {
            UpstreamError::Timeout(_) => StreamEvent::TimeoutError { content },
            UpstreamError::RateLimited(_) => StreamEvent::RateLimitError { content },
            UpstreamError::Connection(_) => StreamEvent::ConnectionError { content },
            UpstreamError::Interrupted(_) => StreamEvent::StreamError { content },
            UpstreamError::Other(_) => StreamEvent::Error { content },
        }
    }

    /// The `type` tag this event serializes with.
    pub fn event_type(&self) -> &'static str {
        match self {
            StreamEvent::Text { .. } => "text",
            StreamEvent::ArtifactsUpdate { .. } => "artifacts_update",
            StreamEvent::ArtifactsRemove { .. } => "artifacts_remove",
            StreamEvent::Context { .. } => "context",
            StreamEvent::ArtifactError { .. } => "artifact_error",
            StreamEvent::TimeoutError { .. } => "timeout_error",
            StreamEvent::RateLimitError { .. } => "rate_limit_error",
            StreamEvent::ConnectionError { .. } => "connection_error",
            StreamEvent::StreamError { .. } => "stream_error",
            StreamEvent::Error { .. } => "error",
            StreamEvent::Complete => "complete",
        }
    }

    /// Whether this is one of the upstream error events.
    pub fn is_upstream_error(&self) -> bool {
        matches!(
            self,
            StreamEvent::TimeoutError { .. }
                | StreamEvent::RateLimitError { .. }
                | StreamEvent::ConnectionError { .. }
                | StreamEvent::StreamError { .. }
                | StreamEvent::Error { .. }
        )
    }

    /// Serialize to the JSON payload carried in an SSE `data:` line.
    pub fn to_json(&self) -> String {
        // Plain data: serialization cannot fail.
        serde_json::to_string(self).unwrap_or_else(|_| r#"{"type":"error","content":"serialization failed"}"#.into())
    }
}
