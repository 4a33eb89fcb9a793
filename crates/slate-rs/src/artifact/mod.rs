//! Artifacts: separately renderable blocks embedded in streamed model output.
//!
//! Artifacts are delimited in the model's text by
//! `<artifact type="T" title="S" [language="L"]> … </artifact>`. Two
//! cooperating pieces process every delta:
//!
//! 1. **[`extractor`]**: [`ArtifactExtractor`] rescans the whole accumulated
//!    response on each delta and reports artifacts that are new or changed.
//! 2. **[`filter`]**: [`ChatFilter`] looks only at the newest delta and
//!    decides which part of it belongs in the visible chat transcript.
//!
//! Nested or overlapping artifacts are unsupported input: pairing is
//! first-open/first-close.

pub mod extractor;
pub mod filter;

pub use extractor::{ArtifactExtractor, MIN_FINAL_CONTENT_CHARS};
pub use filter::ChatFilter;

use serde::{Deserialize, Serialize};

/// Title used when the opening marker carries none.
pub const DEFAULT_TITLE: &str = "Untitled Artifact";

/// Kind of artifact, taken from the `type` attribute.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Code,
    Html,
    Haml,
    Markdown,
    #[default]
    Text,
}

impl ArtifactKind {
    /// Parse a `type` attribute value. Unknown names degrade to `Text`.
    pub fn from_attr(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "code" => ArtifactKind::Code,
            "html" => ArtifactKind::Html,
            "haml" => ArtifactKind::Haml,
            "markdown" | "md" => ArtifactKind::Markdown,
            _ => ArtifactKind::Text,
        }
    }
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ArtifactKind::Code => "code",
            ArtifactKind::Html => "html",
            ArtifactKind::Haml => "haml",
            ArtifactKind::Markdown => "markdown",
            ArtifactKind::Text => "text",
        };
        f.write_str(name)
    }
}

/// An artifact detected in a streaming response.
///
/// `content` only grows while `complete` is false; once complete the record
/// is immutable.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Artifact {
    /// Derived from the opening marker's byte offset in the response buffer.
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ArtifactKind,
    pub title: String,
    /// Only set for `code` artifacts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    pub content: String,
    pub complete: bool,
}

impl Artifact {
    /// Stable identifier for an artifact starting at `offset`.
    pub fn id_for_offset(offset: usize) -> String {
        format!("artifact_{offset}")
    }
}

/// Removal notice for an artifact dropped at finalization.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ArtifactRemoval {
    pub id: String,
    pub action: RemovalAction,
}

/// The only removal action on the wire.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RemovalAction {
    Remove,
}

impl ArtifactRemoval {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            action: RemovalAction::Remove,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_from_attr_degrades_to_text() {
        assert_eq!(ArtifactKind::from_attr("CODE"), ArtifactKind::Code);
        assert_eq!(ArtifactKind::from_attr(" haml "), ArtifactKind::Haml);
        assert_eq!(ArtifactKind::from_attr("md"), ArtifactKind::Markdown);
        assert_eq!(ArtifactKind::from_attr("spreadsheet"), ArtifactKind::Text);
    }

    #[test]
    fn artifact_wire_shape() {
        let artifact = Artifact {
            id: Artifact::id_for_offset(12),
            kind: ArtifactKind::Code,
            title: "Demo".into(),
            language: Some("python".into()),
            content: "pass".into(),
            complete: true,
        };
        let json = serde_json::to_value(&artifact).unwrap();
        assert_eq!(json["id"], "artifact_12");
        assert_eq!(json["type"], "code");
        assert_eq!(json["language"], "python");

        let plain = Artifact {
            language: None,
            kind: ArtifactKind::Markdown,
            ..artifact
        };
        let json = serde_json::to_value(&plain).unwrap();
        assert!(json.get("language").is_none());
    }

    #[test]
    fn removal_wire_shape() {
        let json = serde_json::to_value(ArtifactRemoval::new("artifact_3")).unwrap();
        assert_eq!(json, serde_json::json!({"id": "artifact_3", "action": "remove"}));
    }
}
