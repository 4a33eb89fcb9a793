//! Streaming chat core: artifact extraction, context window management, and
//! HAML rendering.
//!
//! `slate-rs` sits between an opaque text-generation source and an end user.
//! While model output streams in, it separates "artifact" blocks from the
//! visible chat transcript; before each model call it keeps the conversation
//! inside a bounded token budget; and it compiles the compact HAML markup used
//! by one artifact kind into HTML.
//!
//! # Getting started
//!
//! ```ignore
//! use slate_rs::prelude::*;
//!
//! let source = ScriptedSource::new([
//!     "Here you go: <artifact type=\"code\" language=\"rust\" title=\"Demo\">",
//!     "fn main() {}</artifact> Enjoy!",
//! ]);
//! let (tx, mut rx) = tokio::sync::mpsc::channel(64);
//! let outcome = run_response(source.stream(SourceRequest::default()), &NoopSink, &tx).await;
//! while let Ok(event) = rx.try_recv() {
//!     println!("{}", event.to_json());
//! }
//! println!("visible: {}", outcome.chat_text);
//! ```
//!
//! # Where to find things
//!
//! - **Artifacts in streamed text:** [`ArtifactExtractor`](artifact::ArtifactExtractor)
//!   rescans the accumulated buffer on every delta; [`ChatFilter`](artifact::ChatFilter)
//!   decides which bytes of each delta reach the chat transcript.
//! - **Context budget:** [`ContextManager`](context::ContextManager) estimates
//!   tokens, scores messages with a swappable [`KeywordWeights`](context::KeywordWeights)
//!   table, and prunes/summarizes history.
//! - **HAML to HTML:** [`markup::render_html`], wrapped into a themed page by
//!   [`style::generate_html`].
//! - **One full response:** [`pipeline::run_response`] drives a
//!   [`TextSource`](pipeline::TextSource) stream through extraction, filtering,
//!   finalization and materialization, and always ends with `complete`.
//! - **Sessions:** [`SessionStore`](session::SessionStore) owns per-session
//!   conversations behind a single-writer lock.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`artifact`] | Artifact records, extractor, chat content filter |
//! | [`context`] | Token estimation, importance scoring, pruning, summaries |
//! | [`logging`] | Subscriber setup for the binaries |
//! | [`markup`] | Indentation markup (HAML subset) compiler |
//! | [`pipeline`] | Stream events, upstream errors, text sources, artifact sinks |
//! | [`session`] | Concurrent per-session conversation store |
//! | [`style`] | Themed HTML document template and fragment helpers |

pub mod artifact;
pub mod context;
pub mod logging;
pub mod markup;
pub mod pipeline;
pub mod prelude;
pub mod session;
pub mod style;

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

// ── Message types ──────────────────────────────────────────────────

/// Role of a message in the conversation.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageRole::System => write!(f, "system"),
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

/// A message in the conversation.
///
/// Insertion order is conversation order. The timestamp is kept as text so a
/// present-but-unparseable value can be told apart from a missing one.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_summary: bool,
}

fn is_false(v: &bool) -> bool {
    !*v
}

impl Message {
    fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: None,
            is_summary: false,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    /// A synthesized system message standing in for a pruned run of history.
    pub fn summary(content: impl Into<String>, timestamp: Option<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
            timestamp,
            is_summary: true,
        }
    }

    /// Set an explicit timestamp string.
    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }

    /// Stamp the message with the current time (RFC 3339).
    pub fn stamped(mut self) -> Self {
        self.timestamp = Some(Utc::now().to_rfc3339());
        self
    }

    /// Parse the timestamp, accepting RFC 3339 or a naive local
    /// `YYYY-MM-DDTHH:MM:SS[.f]` value. Returns `None` when absent or invalid.
    pub fn parsed_timestamp(&self) -> Option<DateTime<Utc>> {
        let raw = self.timestamp.as_deref()?.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").ok()?;
        Local
            .from_local_datetime(&naive)
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_constructors() {
        let sys = Message::system("hello");
        assert_eq!(sys.role, MessageRole::System);
        assert!(!sys.is_summary);

        let user = Message::user("world");
        assert_eq!(user.role, MessageRole::User);
        assert!(user.timestamp.is_none());

        let summary = Message::summary("[Summary]", Some("2024-01-01T00:00:00".into()));
        assert_eq!(summary.role, MessageRole::System);
        assert!(summary.is_summary);
    }

    #[test]
    fn message_serialization_skips_defaults() {
        let json = serde_json::to_value(Message::assistant("hi")).unwrap();
        assert_eq!(json["role"], "assistant");
        assert!(json.get("timestamp").is_none());
        assert!(json.get("is_summary").is_none());

        let parsed: Message =
            serde_json::from_str(r#"{"role":"user","content":"q","is_summary":true}"#).unwrap();
        assert!(parsed.is_summary);
    }

    #[test]
    fn parses_rfc3339_and_naive_timestamps() {
        let rfc = Message::user("a").with_timestamp("2024-05-01T12:00:00+00:00");
        assert_eq!(
            rfc.parsed_timestamp().unwrap(),
            Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
        );

        let naive = Message::user("a").with_timestamp("2024-05-01T12:00:00.123456");
        assert!(naive.parsed_timestamp().is_some());

        let garbage = Message::user("a").with_timestamp("yesterday-ish");
        assert!(garbage.parsed_timestamp().is_none());
        assert!(Message::user("a").parsed_timestamp().is_none());
    }

    #[test]
    fn stamped_message_parses() {
        let msg = Message::user("now").stamped();
        let ts = msg.parsed_timestamp().unwrap();
        assert!((Utc::now() - ts).num_seconds() < 5);
    }
}
