//! Convenience re-exports for common `slate-rs` types.
//!
//! Meant to be glob-imported by servers and tools built on the pipeline:
//!
//! ```ignore
//! use slate_rs::prelude::*;
//! ```
//!
//! Specialized pieces (attribute parsing, raw extraction functions, summary
//! text) are left out; import those from their modules directly.

// ── Core types ──────────────────────────────────────────────────────
pub use crate::{Message, MessageRole};

// ── Artifacts ───────────────────────────────────────────────────────
pub use crate::artifact::{Artifact, ArtifactExtractor, ArtifactKind, ArtifactRemoval, ChatFilter};

// ── Context management ──────────────────────────────────────────────
pub use crate::context::{
    ContextConfig, ContextManager, ContextSnapshot, ContextState, ContextStatus, ContextStrategy,
    KeywordWeights, ManagementReport, estimate_tokens,
};

// ── Markup ──────────────────────────────────────────────────────────
pub use crate::markup::render_html;
pub use crate::style::{StyleGuide, generate_html};

// ── Response pipeline ───────────────────────────────────────────────
pub use crate::pipeline::{
    ARTIFACT_ONLY_REPLY, ArtifactSink, DeltaStream, NoopSink, ResponseOutcome, ResponseProcessor,
    ScriptedSource, SinkError, SourceRequest, StreamEvent, TextSource, TracingSink, UpstreamError,
    run_response,
};

// ── Sessions ────────────────────────────────────────────────────────
pub use crate::session::{Conversation, Session, SessionStore};
