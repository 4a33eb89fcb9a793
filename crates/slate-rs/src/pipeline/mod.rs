//! Response pipeline: upstream deltas in, typed events out.
//!
//! For every delta the pipeline:
//!
//! 1. Appends it to the response buffer and rescans the buffer with the
//!    [`ArtifactExtractor`], emitting `artifacts_update` for new or changed
//!    artifacts.
//! 2. Hands each artifact that just became complete to the [`ArtifactSink`]
//!    (compiling `haml` first). Failures become `artifact_error`.
//! 3. Runs the delta through the [`ChatFilter`] and emits the visible part as
//!    `text`.
//!
//! When the upstream stream ends, fails, or the receiver goes away, in-flight
//! artifacts are finalized and `complete` is sent last on every path.

pub mod error;
pub mod events;
pub mod sink;
pub mod source;

pub use error::{SinkError, UpstreamError};
pub use events::StreamEvent;
pub use sink::{ArtifactSink, NoopSink, TracingSink};
pub use source::{DeltaStream, ScriptStep, ScriptedSource, SourceRequest, TextSource};

use std::collections::HashSet;

use futures::StreamExt;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::artifact::{Artifact, ArtifactExtractor, ArtifactKind, ChatFilter};
use crate::markup::render_html;
use crate::style;

/// Stored as the assistant turn when a response had no visible text.
pub const ARTIFACT_ONLY_REPLY: &str = "Created an artifact for you.";

/// Synchronous per-response state: buffer, extractor, filter, and the set of
/// artifacts already handed to the sink.
#[derive(Debug, Default)]
pub struct ResponseProcessor {
    buffer: String,
    extractor: ArtifactExtractor,
    filter: ChatFilter,
    chat_text: String,
    materialized: HashSet<String>,
}

impl ResponseProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process one delta. Returns `artifacts_update` (if any) followed by
    /// `text` (if any).
    pub fn push_delta(&mut self, delta: &str) -> Vec<StreamEvent> {
        self.buffer.push_str(delta);
        let mut events = Vec::new();

        let updates = self.extractor.extract(&self.buffer);
        if !updates.is_empty() {
            events.push(StreamEvent::ArtifactsUpdate { content: updates });
        }

        let visible = self.filter.push(delta);
        if !visible.is_empty() {
            self.chat_text.push_str(&visible);
            events.push(StreamEvent::text(visible));
        }
        events
    }

    /// Finalize in-flight artifacts. Returns `artifacts_update` for promoted
    /// ones followed by `artifacts_remove` for dropped ones.
    pub fn finish(&mut self) -> Vec<StreamEvent> {
        let finalization = self.extractor.finalize();
        let mut events = Vec::new();
        if !finalization.promoted.is_empty() {
            events.push(StreamEvent::ArtifactsUpdate {
                content: finalization.promoted,
            });
        }
        if !finalization.removed.is_empty() {
            events.push(StreamEvent::ArtifactsRemove {
                content: finalization.removed,
            });
        }
        events
    }

    /// Hand every newly completed artifact in `event` to `sink`. Returns one
    /// `artifact_error` per failure.
    pub fn materialize(&mut self, event: &StreamEvent, sink: &dyn ArtifactSink) -> Vec<StreamEvent> {
        let StreamEvent::ArtifactsUpdate { content } = event else {
            return Vec::new();
        };
        let mut errors = Vec::new();
        for artifact in content.iter().filter(|a| a.complete) {
            if !self.materialized.insert(artifact.id.clone()) {
                continue;
            }
            let rendered = themed_page(artifact);
            if let Err(e) = sink.materialize(artifact, rendered.as_deref()) {
                warn!(id = %artifact.id, "Artifact materialization failed: {e}");
                errors.push(StreamEvent::ArtifactError {
                    id: artifact.id.clone(),
                    content: e.to_string(),
                });
            }
        }
        errors
    }

    /// Visible chat text accumulated so far.
    pub fn chat_text(&self) -> &str {
        &self.chat_text
    }

    /// Full raw response accumulated so far.
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Artifacts currently tracked, in buffer order.
    pub fn artifacts(&self) -> impl Iterator<Item = &Artifact> {
        self.extractor.artifacts()
    }
}

/// Page handed to the sink alongside `artifact`: compiled `haml`, or an
/// `html` fragment, wrapped in the themed document unless it already is one.
fn themed_page(artifact: &Artifact) -> Option<String> {
    let html = match artifact.kind {
        ArtifactKind::Haml => render_html(&artifact.content),
        ArtifactKind::Html if !style::is_document(&artifact.content) => artifact.content.clone(),
        _ => return None,
    };
    if style::is_document(&html) {
        Some(html)
    } else {
        Some(style::generate_html(&artifact.title, &html))
    }
}

/// What a finished response left behind.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResponseOutcome {
    pub chat_text: String,
    /// Artifacts kept after finalization.
    pub artifacts: Vec<Artifact>,
    /// The upstream failure that ended the stream early, if any.
    pub error: Option<UpstreamError>,
}

impl ResponseOutcome {
    /// Content for the assistant turn recorded in the conversation.
    pub fn assistant_content(&self) -> String {
        if self.chat_text.trim().is_empty() {
            ARTIFACT_ONLY_REPLY.to_string()
        } else {
            self.chat_text.clone()
        }
    }
}

/// Drive one response to completion, sending every event to `tx`.
///
/// Stops reading upstream on the first error or once the receiver is
/// dropped; finalization and `complete` happen either way.
pub async fn run_response(
    mut stream: DeltaStream,
    sink: &dyn ArtifactSink,
    tx: &mpsc::Sender<StreamEvent>,
) -> ResponseOutcome {
    let mut processor = ResponseProcessor::new();
    let mut error = None;
    let mut deltas = 0usize;

    while let Some(item) = stream.next().await {
        match item {
            Ok(delta) => {
                deltas += 1;
                let events = processor.push_delta(&delta);
                forward(&mut processor, events, sink, tx).await;
                if tx.is_closed() {
                    debug!("Event receiver dropped, stopping upstream read");
                    break;
                }
            }
            Err(e) => {
                warn!("Upstream error after {deltas} deltas: {e}");
                let _ = tx.send(StreamEvent::upstream_error(&e)).await;
                error = Some(e);
                break;
            }
        }
    }

    let events = processor.finish();
    forward(&mut processor, events, sink, tx).await;
    let _ = tx.send(StreamEvent::Complete).await;

    let outcome = ResponseOutcome {
        chat_text: processor.chat_text().to_string(),
        artifacts: processor.artifacts().cloned().collect(),
        error,
    };
    info!(
        deltas,
        chat_chars = outcome.chat_text.chars().count(),
        artifacts = outcome.artifacts.len(),
        failed = outcome.error.is_some(),
        "Response finished"
    );
    outcome
}

/// Send events in order, each followed by any materialization errors it
/// caused. Send failures mean the receiver is gone and are ignored.
async fn forward(
    processor: &mut ResponseProcessor,
    events: Vec<StreamEvent>,
    sink: &dyn ArtifactSink,
    tx: &mpsc::Sender<StreamEvent>,
) {
    for event in events {
        let errors = processor.materialize(&event, sink);
        let _ = tx.send(event).await;
        for err in errors {
            let _ = tx.send(err).await;
        }
    }
}
