//! Indentation markup (HAML subset) to HTML.
//!
//! [`render_html`] is a pure function. Nesting comes from indentation: a
//! stack of `(indent, tag)` entries records open elements, and every tag line
//! first closes each entry whose indent is at or beyond its own.
//!
//! | Line                          | Output                                   |
//! |-------------------------------|------------------------------------------|
//! | blank                         | nothing                                  |
//! | `!!!`                         | `<!DOCTYPE html>`                        |
//! | `/ note`                      | `<!-- note -->`                          |
//! | `%tag.cls#id{k: "v"} text`    | `<tag class="cls" id="id" k="v">text</tag>` |
//! | `.cls` / `#id`                | `<div …>` (opened, closed on dedent)     |
//! | `%br`, `%img{…}`, `%x /`      | `<br>` (void, never pushed)              |
//! | anything else                 | the line as literal text                 |
//!
//! Output is indented two spaces per two columns of source indentation.
//! A tag line whose head cannot be parsed (no leading letter) is emitted as
//! literal text instead of failing.

pub mod attributes;

pub use attributes::Attributes;

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

const DOCTYPE_MARKER: &str = "!!!";
const DOCTYPE: &str = "<!DOCTYPE html>";
const DEFAULT_TAG: &str = "div";

/// Elements that are always emitted without a closing tag.
pub const VOID_ELEMENTS: &[&str] = &[
    "br", "hr", "img", "input", "meta", "link", "area", "base", "col", "embed", "source", "track", "wbr",
];

static TAG_HEAD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^%([A-Za-z][A-Za-z0-9]*)((?:[.#][^.#\s{]+)*)").expect("valid tag head regex")
});
static SHORTHAND_HEAD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:[.#][^.#\s{]+)+").expect("valid shorthand regex"));
static SHORTHAND_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([.#])([^.#\s{]+)").expect("valid shorthand part regex"));

/// Compile markup source to HTML. Lines are joined with `\n`.
///
/// # Example
///
/// ```
/// use slate_rs::markup::render_html;
///
/// let html = render_html("%div\n  %p Hi\n%span");
/// assert_eq!(html, "<div>\n  <p>Hi</p>\n</div>\n<span>\n</span>");
/// ```
pub fn render_html(source: &str) -> String {
    let mut compiler = Compiler::default();
    for line in source.lines() {
        compiler.line(line);
    }
    compiler.finish()
}

/// An element waiting for its closing tag.
#[derive(Debug)]
struct OpenTag {
    indent: usize,
    name: String,
}

#[derive(Debug, Default)]
struct Compiler {
    out: Vec<String>,
    stack: Vec<OpenTag>,
}

fn pad(indent: usize) -> String {
    "  ".repeat(indent / 2)
}

impl Compiler {
    fn line(&mut self, raw: &str) {
        let body = raw.trim_start();
        if body.is_empty() {
            return;
        }
        let indent = raw.chars().count() - body.chars().count();

        if body.starts_with(DOCTYPE_MARKER) {
            self.out.push(DOCTYPE.to_string());
            return;
        }
        if let Some(comment) = body.strip_prefix('/') {
            self.out.push(format!("{}<!-- {} -->", pad(indent), comment.trim()));
            return;
        }
        if !body.starts_with(['%', '.', '#']) {
            self.out.push(format!("{}{body}", pad(indent)));
            return;
        }

        self.close_to(indent);

        match TagLine::parse(body) {
            Some(tag) => self.emit(tag, indent),
            None => {
                debug!(line = body, "Unparsable tag head, emitting as text");
                self.out.push(format!("{}{body}", pad(indent)));
            }
        }
    }

    /// Close every open element whose indent is at or beyond `indent`.
    fn close_to(&mut self, indent: usize) {
        while let Some(top) = self.stack.last()
            && top.indent >= indent
        {
            if let Some(open) = self.stack.pop() {
                self.out.push(format!("{}</{}>", pad(open.indent), open.name));
            }
        }
    }

    fn emit(&mut self, tag: TagLine, indent: usize) {
        let pad = pad(indent);
        let attrs = tag.attrs.render();
        if tag.self_closing {
            self.out.push(format!("{pad}<{}{attrs}>", tag.name));
        } else if !tag.content.is_empty() {
            self.out
                .push(format!("{pad}<{name}{attrs}>{}</{name}>", tag.content, name = tag.name));
        } else {
            self.out.push(format!("{pad}<{}{attrs}>", tag.name));
            self.stack.push(OpenTag {
                indent,
                name: tag.name,
            });
        }
    }

    fn finish(mut self) -> String {
        self.close_to(0);
        self.out.join("\n")
    }
}

/// A parsed tag line.
#[derive(Debug, PartialEq)]
struct TagLine {
    name: String,
    attrs: Attributes,
    content: String,
    self_closing: bool,
}

impl TagLine {
    /// Parse a line starting with `%`, `.` or `#`. `None` when the head has
    /// no leading letter.
    #[allow(clippy::string_slice)] // regex and `{`/`}` offsets fall on char boundaries
    fn parse(body: &str) -> Option<Self> {
        let (name, shorthand, rest) = if let Some(caps) = TAG_HEAD_RE.captures(body) {
            let end = caps.get(0)?.end();
            let shorthand = caps.get(2).map_or("", |m| m.as_str());
            (caps[1].to_string(), shorthand, &body[end..])
        } else if let Some(m) = SHORTHAND_HEAD_RE.find(body) {
            (DEFAULT_TAG.to_string(), m.as_str(), &body[m.end()..])
        } else {
            return None;
        };

        let (block, rest) = match rest.strip_prefix('{') {
            Some(inner) => match attributes::block_end(inner) {
                Some(end) => (Some(&inner[..end]), &inner[end + 1..]),
                None => (None, rest),
            },
            None => (None, rest),
        };

        let mut attrs = block.map(Attributes::parse).unwrap_or_default();
        let mut classes = Vec::new();
        let mut id = None;
        for caps in SHORTHAND_RE.captures_iter(shorthand) {
            match &caps[1] {
                "." => classes.push(caps[2].to_string()),
                _ => id = Some(caps[2].to_string()),
            }
        }

        let mut front = 0;
        if !classes.is_empty() {
            let joined = classes.join(" ");
            match attrs.get("class").map(str::to_string) {
                Some(existing) => attrs.set("class", format!("{existing} {joined}").trim().to_string()),
                None => {
                    attrs.insert_at(front, "class", joined);
                    front += 1;
                }
            }
        }
        if let Some(id) = id {
            attrs.insert_at(front, "id", id);
        }

        let mut content = rest.trim();
        let mut self_closing = false;
        if let Some(stripped) = content.strip_suffix('/') {
            self_closing = true;
            content = stripped.trim_end();
        }
        if VOID_ELEMENTS.contains(&name.as_str()) {
            self_closing = true;
        }

        Some(Self {
            name,
            attrs,
            content: content.to_string(),
            self_closing,
        })
    }
}
