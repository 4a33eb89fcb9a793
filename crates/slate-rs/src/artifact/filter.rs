//! Per-delta chat content filter.
//!
//! Decides which bytes of each streamed delta reach the visible chat
//! transcript. Only the newest delta is inspected, never an accumulated
//! buffer, so a marker that straddles two deltas is not recognized until a
//! single delta carries all of it.
//!
//! `<artifact` opens an artifact only when followed by whitespace, `>` or
//! the end of the delta, the same boundary the extractor's patterns use.
//! Prose such as `<artifactory` stays visible.

use tracing::trace;

const OPEN_MARKER: &str = "<artifact";
const CLOSE_MARKER: &str = "</artifact>";

/// Two-state (outside / inside an artifact) filter over streamed deltas.
///
/// # Example
///
/// ```
/// use slate_rs::artifact::ChatFilter;
///
/// let mut filter = ChatFilter::new();
/// assert_eq!(filter.push("Here it is: <artifact type=\"code\">"), "Here it is: ");
/// assert_eq!(filter.push("fn main() {}"), "");
/// assert_eq!(filter.push("</artifact> Done."), " Done.");
/// assert!(!filter.inside_artifact());
/// ```
#[derive(Debug, Default, Clone)]
pub struct ChatFilter {
    inside: bool,
}

impl ChatFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the filter is currently suppressing artifact content.
    pub fn inside_artifact(&self) -> bool {
        self.inside
    }

    /// Filter one delta, returning the part that belongs in the transcript.
    pub fn push(&mut self, delta: &str) -> String {
        let (visible, inside) = filter_chunk(delta, self.inside);
        self.inside = inside;
        visible
    }
}

/// Filter a single delta given the current "inside an artifact" flag.
///
/// Returns the visible text and the updated flag. Outside an artifact, text
/// before an opening marker is kept and the marker starts suppression;
/// inside, everything through the closing marker is dropped and what follows
/// is kept. The rules are re-applied to the rest of the delta after each
/// transition, so prose around a whole artifact carried by one delta
/// survives.
#[allow(clippy::string_slice)] // offsets come from ASCII marker matches
pub fn filter_chunk(delta: &str, inside_artifact: bool) -> (String, bool) {
    // ASCII lowercasing keeps byte offsets aligned with `delta`.
    let lowered = delta.to_ascii_lowercase();
    let mut visible = String::new();
    let mut inside = inside_artifact;
    let mut pos = 0;

    while pos < delta.len() {
        if inside {
            match lowered[pos..].find(CLOSE_MARKER) {
                Some(idx) => {
                    pos += idx + CLOSE_MARKER.len();
                    inside = false;
                    trace!("Chat filter: left artifact");
                }
                None => break,
            }
        } else {
            match find_open_marker(&lowered[pos..]) {
                Some(idx) => {
                    visible.push_str(&delta[pos..pos + idx]);
                    pos += idx + OPEN_MARKER.len();
                    inside = true;
                    trace!("Chat filter: entered artifact");
                }
                None => {
                    visible.push_str(&delta[pos..]);
                    break;
                }
            }
        }
    }

    (visible, inside)
}

/// Offset of the first `<artifact` in `lowered` that is followed by a marker
/// boundary. A marker at the very end of the delta counts.
fn find_open_marker(lowered: &str) -> Option<usize> {
    lowered
        .match_indices(OPEN_MARKER)
        .map(|(idx, _)| idx)
        .find(|&idx| match lowered.as_bytes().get(idx + OPEN_MARKER.len()) {
            None => true,
            Some(&b) => b == b'>' || b.is_ascii_whitespace(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outside_without_marker_passes_through() {
        assert_eq!(filter_chunk("hello world", false), ("hello world".into(), false));
    }

    #[test]
    fn opening_marker_keeps_prefix_and_enters() {
        let (visible, inside) = filter_chunk("Look: <artifact type=\"code\" title=\"x\">print(1)", false);
        assert_eq!(visible, "Look: ");
        assert!(inside);
    }

    #[test]
    fn inside_without_close_emits_nothing() {
        assert_eq!(filter_chunk("print(2)\n", true), (String::new(), true));
    }

    #[test]
    fn closing_marker_keeps_suffix_and_leaves() {
        let (visible, inside) = filter_chunk("x = 1\n</artifact>\nThat's it.", true);
        assert_eq!(visible, "\nThat's it.");
        assert!(!inside);
    }

    #[test]
    fn markers_are_case_insensitive() {
        let (visible, inside) = filter_chunk("A <ARTIFACT type=\"html\">", false);
        assert_eq!(visible, "A ");
        assert!(inside);
        let (visible, inside) = filter_chunk("</Artifact>B", true);
        assert_eq!(visible, "B");
        assert!(!inside);
    }

    #[test]
    fn whole_artifact_in_one_delta_keeps_surrounding_prose() {
        let (visible, inside) =
            filter_chunk("Before <artifact type=\"text\">body</artifact> after", false);
        assert_eq!(visible, "Before  after");
        assert!(!inside);
    }

    #[test]
    fn marker_split_across_deltas_is_detected_late() {
        let mut filter = ChatFilter::new();
        // Neither half carries the full opening marker, so both pass through.
        assert_eq!(filter.push("Intro <arti"), "Intro <arti");
        assert_eq!(filter.push("fact type=\"code\">x"), "fact type=\"code\">x");
        assert!(!filter.inside_artifact());
    }

    #[test]
    fn split_closing_marker_keeps_suppressing() {
        let mut filter = ChatFilter::new();
        filter.push("<artifact>");
        assert_eq!(filter.push("body</arti"), "");
        assert_eq!(filter.push("fact> tail"), "");
        assert!(filter.inside_artifact());
        assert_eq!(filter.push("</artifact>!"), "!");
    }

    #[test]
    fn visible_text_preserves_order_across_deltas() {
        let mut filter = ChatFilter::new();
        let deltas = [
            "One ",
            "two <artifact type=\"code\">",
            "hidden ",
            "hidden</artifact> three",
            " four",
        ];
        let visible: String = deltas.iter().map(|d| filter.push(d)).collect();
        assert_eq!(visible, "One two  three four");
    }

    #[test]
    fn lookalike_tags_stay_visible() {
        let (visible, inside) = filter_chunk("see <artifact_note> here, more prose", false);
        assert_eq!(visible, "see <artifact_note> here, more prose");
        assert!(!inside);

        let mut filter = ChatFilter::new();
        assert_eq!(filter.push("Try <artifactory> or "), "Try <artifactory> or ");
        assert_eq!(filter.push("<artifact>x</artifact>!"), "!");
        assert!(!filter.inside_artifact());
    }

    #[test]
    fn marker_at_end_of_delta_enters() {
        let mut filter = ChatFilter::new();
        assert_eq!(filter.push("Intro <artifact"), "Intro ");
        assert!(filter.inside_artifact());
        assert_eq!(filter.push(" type=\"code\">x</artifact> ok"), " ok");
    }

    #[test]
    fn multibyte_text_is_sliced_safely() {
        let (visible, inside) = filter_chunk("héllo → <artifact>ü</artifact> ✓", false);
        assert_eq!(visible, "héllo →  ✓");
        assert!(!inside);
    }
}
