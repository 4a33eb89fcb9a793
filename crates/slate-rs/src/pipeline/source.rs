//! The upstream text source seam.
//!
//! The model provider is opaque: anything that can turn a [`SourceRequest`]
//! into an ordered stream of text deltas implements [`TextSource`].
//! [`ScriptedSource`] replays fixed deltas and is what the CLI, the demo
//! server and the tests use.

use std::path::Path;
use std::pin::Pin;
use std::time::Duration;

use futures::{Stream, StreamExt, stream};
use serde::Serialize;

use super::error::UpstreamError;
use crate::{Message, MessageRole};

/// Ordered text deltas, ending early on the first error.
pub type DeltaStream = Pin<Box<dyn Stream<Item = Result<String, UpstreamError>> + Send>>;

/// What is sent upstream for one turn.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SourceRequest {
    pub system_prompt: String,
    /// User and assistant messages only, in conversation order.
    pub messages: Vec<Message>,
}

impl SourceRequest {
    /// Build a request from a managed history.
    ///
    /// System messages (including context summaries) are not sent as chat
    /// turns; their text is appended to the system prompt instead.
    pub fn from_history(system_prompt: &str, history: &[Message]) -> Self {
        let mut system_prompt = system_prompt.to_string();
        let summaries: Vec<&str> = history
            .iter()
            .filter(|m| m.role == MessageRole::System)
            .map(|m| m.content.as_str())
            .collect();
        if !summaries.is_empty() {
            if !system_prompt.is_empty() {
                system_prompt.push_str("\n\n");
            }
            system_prompt.push_str("Earlier in this conversation:\n");
            system_prompt.push_str(&summaries.join("\n"));
        }

        let messages = history
            .iter()
            .filter(|m| m.role != MessageRole::System)
            .map(|m| Message {
                role: m.role,
                content: m.content.clone(),
                timestamp: None,
                is_summary: false,
            })
            .collect();

        Self {
            system_prompt,
            messages,
        }
    }
}

/// Produces a response as a stream of text deltas.
pub trait TextSource: Send + Sync {
    fn stream(&self, request: SourceRequest) -> DeltaStream;
}

/// One step of a scripted response.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptStep {
    Delta(String),
    Fail(UpstreamError),
}

/// A source that replays a fixed script, ignoring the request.
///
/// # Example
///
/// ```
/// use slate_rs::pipeline::{ScriptedSource, UpstreamError};
///
/// let source = ScriptedSource::from_text("Hello there", 5)
///     .then_fail(UpstreamError::classify("connection reset"));
/// assert_eq!(source.len(), 4);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ScriptedSource {
    steps: Vec<ScriptStep>,
    delay: Option<Duration>,
}

impl ScriptedSource {
    pub fn new<I, S>(deltas: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            steps: deltas.into_iter().map(|d| ScriptStep::Delta(d.into())).collect(),
            delay: None,
        }
    }

    /// Split `text` into deltas of `chunk_size` characters (at least one).
    pub fn from_text(text: &str, chunk_size: usize) -> Self {
        let chars: Vec<char> = text.chars().collect();
        Self::new(
            chars
                .chunks(chunk_size.max(1))
                .map(|chunk| chunk.iter().collect::<String>()),
        )
    }

    /// Load a file and split it like [`from_text`](Self::from_text).
    pub fn from_file(path: &Path, chunk_size: usize) -> Result<Self, String> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
        Ok(Self::from_text(&text, chunk_size))
    }

    /// Append a failure after the scripted deltas.
    pub fn then_fail(mut self, error: UpstreamError) -> Self {
        self.steps.push(ScriptStep::Fail(error));
        self
    }

    /// Sleep before yielding each step.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn steps(&self) -> &[ScriptStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl TextSource for ScriptedSource {
    fn stream(&self, _request: SourceRequest) -> DeltaStream {
        let delay = self.delay;
        let steps = stream::iter(self.steps.clone()).then(move |step| async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            match step {
                ScriptStep::Delta(text) => Ok(text),
                ScriptStep::Fail(err) => Err(err),
            }
        });
        Box::pin(steps)
    }
}
