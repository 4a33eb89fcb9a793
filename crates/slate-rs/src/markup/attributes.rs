//! `{...}` attribute blocks.
//!
//! Both the modern `key: "value"` form and the legacy `:key => "value"` form
//! are accepted, and may be mixed within one block.

/// Ordered attribute list. Setting an existing key replaces its value in
/// place, so output order is first appearance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes {
    entries: Vec<(String, String)>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Insert at `index`, or replace in place if the key is already present.
    pub fn insert_at(&mut self, index: usize, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        if self.get(&key).is_some() {
            self.set(key, value);
        } else {
            self.entries.insert(index.min(self.entries.len()), (key, value.into()));
        }
    }

    /// Render as ` k="v" k2="v2"` (leading space included), or an empty
    /// string when there are no attributes.
    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(|(k, v)| format!(" {k}=\"{}\"", v.replace('"', "&quot;")))
            .collect()
    }

    /// Parse the inside of a `{...}` block (braces excluded).
    pub fn parse(block: &str) -> Self {
        let mut attrs = Self::new();
        for pair in split_outside_quotes(block) {
            let parsed = if let Some((key, value)) = pair.split_once("=>") {
                Some((key.trim().trim_start_matches(':'), value))
            } else {
                pair.split_once(':')
            };
            let Some((key, value)) = parsed else {
                continue;
            };
            let key = unquote(key.trim());
            if key.is_empty() {
                continue;
            }
            attrs.set(key, unquote(value.trim()));
        }
        attrs
    }
}

/// Byte index of the `}` closing a block whose `{` has already been
/// consumed. Braces inside quoted strings are ignored.
pub fn block_end(after_open: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    for (i, ch) in after_open.char_indices() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(ch),
            (None, '{') => depth += 1,
            (None, '}') if depth == 0 => return Some(i),
            (None, '}') => depth -= 1,
            _ => {}
        }
    }
    None
}

/// Split on commas that are not inside a quoted string. Empty pieces are
/// dropped.
fn split_outside_quotes(block: &str) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, ch) in block.char_indices() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(ch),
            (None, ',') => {
                pieces.push(block.get(start..i).unwrap_or_default());
                start = i + 1;
            }
            _ => {}
        }
    }
    pieces.push(block.get(start..).unwrap_or_default());
    pieces.into_iter().map(str::trim).filter(|p| !p.is_empty()).collect()
}

/// Strip one pair of matching surrounding quotes.
fn unquote(value: &str) -> &str {
    for q in ['"', '\''] {
        if let Some(inner) = value.strip_prefix(q).and_then(|v| v.strip_suffix(q)) {
            return inner;
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modern_and_legacy_forms() {
        let attrs = Attributes::parse(r#"lang: "en", :charset => 'utf-8', data-role: content"#);
        assert_eq!(attrs.get("lang"), Some("en"));
        assert_eq!(attrs.get("charset"), Some("utf-8"));
        assert_eq!(attrs.get("data-role"), Some("content"));
        assert_eq!(attrs.render(), r#" lang="en" charset="utf-8" data-role="content""#);
    }

    #[test]
    fn commas_inside_quotes_do_not_split() {
        let attrs = Attributes::parse(r#"title: "a, b, c", alt: 'x,y'"#);
        assert_eq!(attrs.get("title"), Some("a, b, c"));
        assert_eq!(attrs.get("alt"), Some("x,y"));
    }

    #[test]
    fn values_keep_inner_colons() {
        let attrs = Attributes::parse(r#"href: "https://example.com/a:b""#);
        assert_eq!(attrs.get("href"), Some("https://example.com/a:b"));
    }

    #[test]
    fn quoted_keys_are_unquoted() {
        let attrs = Attributes::parse(r#""aria-label": "Close""#);
        assert_eq!(attrs.get("aria-label"), Some("Close"));
    }

    #[test]
    fn junk_pairs_are_skipped() {
        let attrs = Attributes::parse("checked, , : x");
        assert!(attrs.is_empty());
    }

    #[test]
    fn double_quotes_are_escaped_on_render() {
        let mut attrs = Attributes::new();
        attrs.set("title", r#"say "hi""#);
        assert_eq!(attrs.render(), r#" title="say &quot;hi&quot;""#);
    }

    #[test]
    fn later_keys_replace_in_place() {
        let attrs = Attributes::parse(r#"a: "1", b: "2", a: "3""#);
        assert_eq!(attrs.render(), r#" a="3" b="2""#);
    }

    #[test]
    fn insert_at_places_new_keys_and_replaces_old() {
        let mut attrs = Attributes::parse(r#"href: "/""#);
        attrs.insert_at(0, "class", "btn");
        attrs.insert_at(1, "id", "go");
        assert_eq!(attrs.render(), r#" class="btn" id="go" href="/""#);
        attrs.insert_at(0, "href", "/home");
        assert_eq!(attrs.render(), r#" class="btn" id="go" href="/home""#);
    }

    #[test]
    fn block_end_skips_quoted_and_nested_braces() {
        assert_eq!(block_end(r#"a: "}"} rest"#), Some(6));
        assert_eq!(block_end("a: {b: 1}} x"), Some(9));
        assert_eq!(block_end("a: 1"), None);
    }
}
