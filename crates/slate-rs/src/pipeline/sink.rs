//! Where completed artifacts go.
//!
//! The pipeline calls [`ArtifactSink::materialize`] exactly once per artifact,
//! at the moment it becomes complete. Persistence and serving are left to the
//! implementor; a failure is reported as an `artifact_error` event and the
//! response keeps streaming.

use tracing::info;

use super::error::SinkError;
use crate::artifact::Artifact;

/// Receives each artifact once it is complete.
pub trait ArtifactSink: Send + Sync {
    /// `rendered_html` is a complete page for `haml` artifacts and for `html`
    /// fragments, themed by [`crate::style`] when the markup is not already
    /// a document. It is `None` for every other kind.
    fn materialize(&self, artifact: &Artifact, rendered_html: Option<&str>) -> Result<(), SinkError>;
}

/// Discards artifacts.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl ArtifactSink for NoopSink {
    fn materialize(&self, _artifact: &Artifact, _rendered_html: Option<&str>) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Logs each materialized artifact at `info`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ArtifactSink for TracingSink {
    fn materialize(&self, artifact: &Artifact, rendered_html: Option<&str>) -> Result<(), SinkError> {
        info!(
            id = %artifact.id,
            kind = %artifact.kind,
            title = %artifact.title,
            chars = artifact.content.chars().count(),
            rendered = rendered_html.is_some(),
            "Artifact materialized"
        );
        Ok(())
    }
}
