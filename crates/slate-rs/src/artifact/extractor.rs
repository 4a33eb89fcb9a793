//! Incremental artifact detection over a growing response buffer.
//!
//! The extractor is invoked once per received delta with the *whole*
//! accumulated response, not just the delta. Each call rescans the buffer:
//!
//! 1. Complete `<artifact …>…</artifact>` spans (leftmost, non-nested) are
//!    recorded as `complete = true` the first time they are seen.
//! 2. Opening markers with no complete span starting at the same offset are
//!    recorded as `complete = false`, with everything after the marker as
//!    provisional content. They are re-emitted only when that content changes.
//!
//! An in-flight record whose opening marker ends up inside a later complete
//! span is dropped, so the outcome does not depend on how the stream was
//! chunked. When the upstream stream ends, [`ArtifactExtractor::finalize`]
//! promotes substantial in-flight artifacts and drops the rest.
//!
//! Extraction never fails. Anything that does not parse as a marker is plain
//! text.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use super::{Artifact, ArtifactKind, ArtifactRemoval, DEFAULT_TITLE};

/// In-flight artifacts whose trimmed content is at most this many characters
/// are discarded at finalization instead of being promoted.
pub const MIN_FINAL_CONTENT_CHARS: usize = 10;

static COMPLETE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<artifact(\s[^>]*)?>(.*?)</artifact>").expect("complete artifact pattern")
});

static OPEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<artifact(\s[^>]*)?>").expect("open artifact pattern"));

static ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([A-Za-z_][\w-]*)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("attribute pattern")
});

/// Result of [`ArtifactExtractor::finalize`].
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Finalization {
    /// In-flight artifacts promoted to complete.
    pub promoted: Vec<Artifact>,
    /// In-flight artifacts dropped for lack of content.
    pub removed: Vec<ArtifactRemoval>,
}

impl Finalization {
    pub fn is_empty(&self) -> bool {
        self.promoted.is_empty() && self.removed.is_empty()
    }
}

/// Tracks the artifacts seen so far in one streaming response, keyed by the
/// byte offset of their opening marker.
///
/// # Example
///
/// ```
/// use slate_rs::artifact::ArtifactExtractor;
///
/// let mut extractor = ArtifactExtractor::new();
/// let mut buffer = String::from("Sure! <artifact type=\"code\" language=\"rust\" title=\"Hi\">fn main()");
/// let updates = extractor.extract(&buffer);
/// assert_eq!(updates.len(), 1);
/// assert!(!updates[0].complete);
///
/// buffer.push_str(" {}</artifact>");
/// let updates = extractor.extract(&buffer);
/// assert!(updates[0].complete);
/// assert_eq!(updates[0].content, "fn main() {}");
/// ```
#[derive(Debug, Default)]
pub struct ArtifactExtractor {
    seen: BTreeMap<usize, Artifact>,
    /// In-flight records dropped because a complete span swallowed them.
    superseded: Vec<ArtifactRemoval>,
}

impl ArtifactExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rescan `buffer` and return artifacts that are new or changed since the
    /// previous call.
    pub fn extract(&mut self, buffer: &str) -> Vec<Artifact> {
        let in_flight: Vec<usize> = self
            .seen
            .iter()
            .filter(|(_, a)| !a.complete)
            .map(|(&offset, _)| offset)
            .collect();
        let updates = extract_artifacts(buffer, &mut self.seen);
        for offset in in_flight {
            if !self.seen.contains_key(&offset) {
                self.superseded.push(ArtifactRemoval::new(Artifact::id_for_offset(offset)));
            }
        }
        updates
    }

    /// Resolve every artifact that is still in flight.
    ///
    /// Artifacts with more than [`MIN_FINAL_CONTENT_CHARS`] characters of
    /// trimmed content become complete; the rest are forgotten and reported
    /// as removals, along with any records superseded during extraction.
    pub fn finalize(&mut self) -> Finalization {
        let mut result = Finalization {
            removed: std::mem::take(&mut self.superseded),
            ..Finalization::default()
        };
        let mut dropped = Vec::new();

        for (offset, artifact) in self.seen.iter_mut() {
            if artifact.complete {
                continue;
            }
            if artifact.content.trim().chars().count() > MIN_FINAL_CONTENT_CHARS {
                artifact.complete = true;
                result.promoted.push(artifact.clone());
            } else {
                result.removed.push(ArtifactRemoval::new(artifact.id.clone()));
                dropped.push(*offset);
            }
        }
        for offset in dropped {
            self.seen.remove(&offset);
        }

        if !result.is_empty() {
            debug!(
                "Artifact finalization: {} promoted, {} removed",
                result.promoted.len(),
                result.removed.len()
            );
        }
        result
    }

    /// All artifacts currently tracked, in buffer order.
    pub fn artifacts(&self) -> impl Iterator<Item = &Artifact> {
        self.seen.values()
    }

    /// Number of artifacts currently tracked.
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// Rescan `buffer` against the map of previously seen artifacts (keyed by
/// opening-marker offset) and return the ones that are new or changed.
pub fn extract_artifacts(buffer: &str, seen: &mut BTreeMap<usize, Artifact>) -> Vec<Artifact> {
    let mut updates = Vec::new();
    let mut spans: Vec<(usize, usize)> = Vec::new();

    for caps in COMPLETE_RE.captures_iter(buffer) {
        let Some(whole) = caps.get(0) else { continue };
        let start = whole.start();
        spans.push((start, whole.end()));

        let content = clean_content(caps.get(2).map_or("", |m| m.as_str()));
        match seen.get_mut(&start) {
            Some(existing) if existing.complete => {}
            Some(existing) => {
                existing.content = content.to_string();
                existing.complete = true;
                updates.push(existing.clone());
            }
            None => {
                let attrs = caps.get(1).map_or("", |m| m.as_str());
                let artifact = build_artifact(start, attrs, content, true);
                seen.insert(start, artifact.clone());
                updates.push(artifact);
            }
        }
    }

    // Opening markers swallowed by a span are not artifacts of their own.
    seen.retain(|&offset, a| a.complete || !spans.iter().any(|&(s, e)| offset > s && offset < e));

    for caps in OPEN_RE.captures_iter(buffer) {
        let Some(marker) = caps.get(0) else { continue };
        let start = marker.start();
        // Closed already, or swallowed by an earlier span (nesting is unsupported).
        if spans.iter().any(|&(s, e)| start >= s && start < e) {
            continue;
        }

        #[allow(clippy::string_slice)] // regex match ends on a char boundary
        let content = clean_content(&buffer[marker.end()..]);
        match seen.get_mut(&start) {
            Some(existing) if existing.complete || existing.content == content => {}
            Some(existing) => {
                existing.content = content.to_string();
                updates.push(existing.clone());
            }
            None => {
                let attrs = caps.get(1).map_or("", |m| m.as_str());
                let artifact = build_artifact(start, attrs, content, false);
                seen.insert(start, artifact.clone());
                updates.push(artifact);
            }
        }
    }

    if !updates.is_empty() {
        debug!("Artifact extraction: {} new or changed", updates.len());
    }
    updates
}

/// Strip the line breaks that surround the body without touching the first
/// line's indentation.
fn clean_content(raw: &str) -> &str {
    raw.trim_matches(|c| c == '\n' || c == '\r')
}

fn build_artifact(offset: usize, attrs: &str, content: &str, complete: bool) -> Artifact {
    let attrs = MarkerAttributes::parse(attrs);
    let kind = attrs
        .kind
        .as_deref()
        .map(ArtifactKind::from_attr)
        .unwrap_or_default();
    let language = match kind {
        ArtifactKind::Code => attrs.language,
        _ => None,
    };
    Artifact {
        id: Artifact::id_for_offset(offset),
        kind,
        title: attrs.title.unwrap_or_else(|| DEFAULT_TITLE.to_string()),
        language,
        content: content.to_string(),
        complete,
    }
}

/// Attributes read from an opening marker. Anything unrecognized is ignored.
#[derive(Debug, Default, PartialEq)]
struct MarkerAttributes {
    kind: Option<String>,
    title: Option<String>,
    language: Option<String>,
}

impl MarkerAttributes {
    fn parse(raw: &str) -> Self {
        let mut attrs = Self::default();
        for caps in ATTR_RE.captures_iter(raw) {
            let key = caps.get(1).map_or("", |m| m.as_str()).to_ascii_lowercase();
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .map_or("", |m| m.as_str())
                .trim();
            if value.is_empty() {
                continue;
            }
            match key.as_str() {
                "type" => attrs.kind = Some(value.to_string()),
                "title" => attrs.title = Some(value.to_string()),
                "language" => attrs.language = Some(value.to_string()),
                _ => {}
            }
        }
        attrs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const OPEN: &str = r#"<artifact type="code" language="python" title="Demo">"#;

    #[test]
    fn complete_artifact_in_one_pass() {
        let mut extractor = ArtifactExtractor::new();
        let buffer = format!("Intro {OPEN}\ndef f(): pass\n</artifact> outro");
        let updates = extractor.extract(&buffer);

        assert_eq!(updates.len(), 1);
        let a = &updates[0];
        assert_eq!(a.id, "artifact_6");
        assert_eq!(a.kind, ArtifactKind::Code);
        assert_eq!(a.language.as_deref(), Some("python"));
        assert_eq!(a.title, "Demo");
        assert_eq!(a.content, "def f(): pass");
        assert!(a.complete);

        // Rescanning the same buffer reports nothing new.
        assert!(extractor.extract(&buffer).is_empty());
    }

    #[test]
    fn incomplete_artifact_streams_then_completes() {
        let mut extractor = ArtifactExtractor::new();
        let mut buffer = format!("{OPEN}def f():");
        let first = extractor.extract(&buffer);
        assert_eq!(first.len(), 1);
        assert!(!first[0].complete);
        assert_eq!(first[0].content, "def f():");

        // Unchanged content is not re-emitted.
        assert!(extractor.extract(&buffer).is_empty());

        buffer.push_str(" pass");
        let second = extractor.extract(&buffer);
        assert_eq!(second[0].content, "def f(): pass");
        assert!(!second[0].complete);

        buffer.push_str("</artifact>");
        let third = extractor.extract(&buffer);
        assert_eq!(third.len(), 1);
        assert!(third[0].complete);
        assert_eq!(third[0].id, first[0].id);
    }

    #[test]
    fn complete_artifact_is_immutable() {
        let mut extractor = ArtifactExtractor::new();
        let mut buffer = format!("{OPEN}x = 1</artifact>");
        extractor.extract(&buffer);
        buffer.push_str(" and then </artifact> again");
        assert!(extractor.extract(&buffer).is_empty());
        assert_eq!(extractor.artifacts().next().unwrap().content, "x = 1");
    }

    #[test]
    fn multiple_artifacts_have_distinct_ids() {
        let mut extractor = ArtifactExtractor::new();
        let buffer = "<artifact type=\"markdown\" title=\"A\"># A</artifact>\n\
                      <artifact type=\"html\" title=\"B\"><p>b</p></artifact>";
        let updates = extractor.extract(buffer);
        assert_eq!(updates.len(), 2);
        assert_ne!(updates[0].id, updates[1].id);
        assert_eq!(updates[0].kind, ArtifactKind::Markdown);
        assert_eq!(updates[1].kind, ArtifactKind::Html);
        assert!(updates[1].language.is_none());
    }

    #[test]
    fn missing_and_malformed_attributes_use_defaults() {
        let mut extractor = ArtifactExtractor::new();
        let updates = extractor.extract("<artifact>plain</artifact><artifact type=code title=>x</artifact>");
        assert_eq!(updates.len(), 2);
        for a in &updates {
            assert_eq!(a.kind, ArtifactKind::Text);
            assert_eq!(a.title, DEFAULT_TITLE);
            assert!(a.language.is_none());
        }
    }

    #[test]
    fn single_quotes_and_case_insensitive_tag() {
        let mut extractor = ArtifactExtractor::new();
        let updates =
            extractor.extract("<ARTIFACT type='haml' title='Page'>%p Hi</Artifact>");
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].kind, ArtifactKind::Haml);
        assert_eq!(updates[0].title, "Page");
        assert!(updates[0].complete);
    }

    #[test]
    fn language_ignored_for_non_code() {
        let mut extractor = ArtifactExtractor::new();
        let updates =
            extractor.extract(r#"<artifact type="markdown" language="md" title="T">x</artifact>"#);
        assert!(updates[0].language.is_none());
    }

    #[test]
    fn partial_opening_marker_is_plain_text() {
        let mut extractor = ArtifactExtractor::new();
        assert!(extractor.extract("text <artifact type=\"co").is_empty());
        assert!(extractor.extract("<artifactory>not one</artifactory>").is_empty());
        assert!(extractor.extract("<artifact_note>x</artifact> <artifact-x>y</artifact>").is_empty());
    }

    #[test]
    fn first_content_line_keeps_indentation() {
        let mut extractor = ArtifactExtractor::new();
        let updates =
            extractor.extract("<artifact type=\"haml\">\n  %p a\n  %p b\n</artifact>");
        assert_eq!(updates[0].content, "  %p a\n  %p b");
    }

    #[test]
    fn finalize_promotes_substantial_artifact() {
        let mut extractor = ArtifactExtractor::new();
        extractor.extract(&format!("{OPEN}def f(): pass"));
        let result = extractor.finalize();
        assert_eq!(result.promoted.len(), 1);
        assert!(result.promoted[0].complete);
        assert_eq!(result.promoted[0].content, "def f(): pass");
        assert!(result.removed.is_empty());

        // Nothing left in flight.
        assert!(extractor.finalize().is_empty());
    }

    #[test]
    fn finalize_removes_thin_artifact() {
        let mut extractor = ArtifactExtractor::new();
        let updates = extractor.extract(&format!("{OPEN}ok"));
        let result = extractor.finalize();
        assert!(result.promoted.is_empty());
        assert_eq!(result.removed, vec![ArtifactRemoval::new(updates[0].id.clone())]);
        assert!(extractor.is_empty());
    }

    #[test]
    fn finalize_threshold_is_exclusive() {
        let mut extractor = ArtifactExtractor::new();
        extractor.extract(&format!("{OPEN}  0123456789  "));
        let result = extractor.finalize();
        assert_eq!(result.removed.len(), 1);
    }

    #[test]
    fn finalize_leaves_complete_artifacts_alone() {
        let mut extractor = ArtifactExtractor::new();
        extractor.extract(&format!("{OPEN}ok</artifact>"));
        assert!(extractor.finalize().is_empty());
        assert_eq!(extractor.len(), 1);
    }

    /// Feed `text` in pieces, never splitting a marker, and return the final
    /// completed artifacts.
    fn run_chunked(text: &str, cuts: &[usize]) -> Vec<Artifact> {
        let mut extractor = ArtifactExtractor::new();
        let mut buffer = String::new();
        let mut last = 0;
        for &cut in cuts.iter().chain(std::iter::once(&text.len())) {
            if cut <= last {
                continue;
            }
            buffer.push_str(&text[last..cut]);
            extractor.extract(&buffer);
            last = cut;
        }
        extractor.finalize();
        extractor.artifacts().filter(|a| a.complete).cloned().collect()
    }

    #[test]
    fn swallowed_in_flight_record_is_dropped() {
        let text = "<artifact>aaa<artifact>bbbbbbbbbbbbbbb</artifact>";

        let mut whole = ArtifactExtractor::new();
        whole.extract(text);
        let whole_result = whole.finalize();
        assert!(whole_result.is_empty());

        let mut split = ArtifactExtractor::new();
        let first = split.extract("<artifact>aaa<artifact>bbbbbbbbbbbbbbb");
        assert_eq!(first.len(), 2);
        split.extract(text);
        let split_result = split.finalize();
        assert!(split_result.promoted.is_empty());
        assert_eq!(split_result.removed, vec![ArtifactRemoval::new("artifact_13")]);

        let ids = |e: &ArtifactExtractor| e.artifacts().map(|a| a.id.clone()).collect::<Vec<_>>();
        assert_eq!(ids(&whole), ids(&split));
        assert_eq!(ids(&split), vec!["artifact_0".to_string()]);
    }

    fn marker_ranges(text: &str) -> Vec<(usize, usize)> {
        OPEN_RE
            .find_iter(text)
            .map(|m| (m.start(), m.end()))
            .chain(text.match_indices("</artifact>").map(|(i, s)| (i, i + s.len())))
            .collect()
    }

    proptest! {
        #[test]
        fn completed_artifacts_do_not_depend_on_chunking(
            prose in "[a-z .,]{0,30}",
            body_a in "[a-z =():\n]{0,40}",
            body_b in "[a-z =():\n]{0,40}",
            tail in "[a-z ]{0,20}",
            raw_cuts in proptest::collection::vec(0usize..400, 0..12),
        ) {
            let text = format!(
                "{prose}{OPEN}{body_a}</artifact>{prose}<artifact type=\"html\" title=\"B\">{body_b}</artifact>{tail}<artifact type=\"text\">{tail}"
            );
            let markers = marker_ranges(&text);
            let mut cuts: Vec<usize> = raw_cuts
                .into_iter()
                .map(|c| c % (text.len() + 1))
                .filter(|&c| !markers.iter().any(|&(s, e)| c > s && c < e))
                .collect();
            cuts.sort_unstable();

            let whole = run_chunked(&text, &[]);
            let chunked = run_chunked(&text, &cuts);
            prop_assert_eq!(whole, chunked);
        }
    }
}
