//! Themed HTML documents for rendered artifacts.
//!
//! Rendered markup is usually a fragment. [`StyleGuide::generate_html`] wraps
//! it in a complete document whose stylesheet carries the application theme:
//!
//! | Piece | Contents |
//! |-------|----------|
//! | `:root` | One `--name: value;` custom property per theme variable |
//! | base styles | Typography, `.header`, `.content-section`, tables, `.grid-N`, `.card`, `.metric`, `.footer` |
//! | custom styles | Whatever [`StyleGuide::with_custom_styles`] added |
//!
//! The `create_*`-style helpers ([`StyleGuide::header`],
//! [`StyleGuide::data_table`], ...) produce fragments that use the base
//! classes.

use std::sync::LazyLock;

use chrono::Local;

/// Theme variables, in stylesheet order.
pub const THEME_VARIABLES: &[(&str, &str)] = &[
    // Primary
    ("primary", "#1a1a1a"),
    ("primary-light", "#333333"),
    ("primary-dark", "#000000"),
    // Backgrounds
    ("background", "#f5f5f5"),
    ("background-light", "#ffffff"),
    ("background-dark", "#f9fafb"),
    ("background-highlight", "#f8fafc"),
    // Accent
    ("accent", "#2563eb"),
    ("accent-light", "#3b82f6"),
    ("accent-dark", "#1d4ed8"),
    ("accent-subtle", "rgba(37, 99, 235, 0.1)"),
    // Text
    ("text-primary", "#1a1a1a"),
    ("text-secondary", "#6b7280"),
    ("text-muted", "#9ca3af"),
    // Status
    ("success", "#10b981"),
    ("warning", "#f59e0b"),
    ("error", "#dc2626"),
    ("warning-bg", "#fef3c7"),
    // Borders
    ("border", "#e5e5e5"),
    ("border-light", "#f3f4f6"),
    ("border-dark", "#d1d5db"),
    // Shadows
    ("shadow-sm", "0 1px 2px rgba(0, 0, 0, 0.05)"),
    ("shadow-md", "0 1px 3px rgba(0, 0, 0, 0.1)"),
    ("shadow-lg", "2px 0 10px rgba(0, 0, 0, 0.1)"),
];

const BASE_STYLES: &str = r#"
* { margin: 0; padding: 0; box-sizing: border-box; }
body {
    font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, Oxygen, Ubuntu, Cantarell, sans-serif;
    line-height: 1.6;
    color: var(--text-primary);
    background-color: var(--background);
    padding: 2rem;
    max-width: 1200px;
    margin: 0 auto;
}
h1, h2, h3, h4, h5, h6 { color: var(--text-primary); margin-bottom: 1rem; font-weight: 600; }
h1 { font-size: 2.5rem; }
h2 { font-size: 2rem; }
h3 { font-size: 1.5rem; }
h4 { font-size: 1.25rem; }
h5 { font-size: 1.125rem; }
h6 { font-size: 1rem; }
p { margin-bottom: 1rem; color: var(--text-secondary); }
.header {
    background: var(--primary);
    color: white;
    padding: 2rem;
    margin: -2rem -2rem 2rem -2rem;
    border-radius: 0 0 8px 8px;
}
.header h1 { color: white; margin-bottom: 0.5rem; }
.header p { color: rgba(255, 255, 255, 0.8); margin-bottom: 0; }
.content-section {
    background: var(--background-light);
    padding: 2rem;
    margin-bottom: 2rem;
    border-radius: 8px;
    box-shadow: var(--shadow-md);
}
.highlight-box, .warning-box { padding: 1rem; margin: 1rem 0; border-radius: 0 4px 4px 0; }
.highlight-box { background: var(--background-highlight); border-left: 4px solid var(--accent); }
.warning-box { background: var(--warning-bg); border-left: 4px solid var(--warning); }
.button {
    background: var(--accent);
    color: white;
    padding: 0.75rem 1.5rem;
    border: none;
    border-radius: 6px;
    cursor: pointer;
    font-weight: 500;
    text-decoration: none;
    display: inline-block;
    transition: background-color 0.2s ease;
}
.button:hover { background: var(--accent-dark); }
.button-secondary { background: var(--background-dark); color: var(--text-primary); border: 1px solid var(--border-dark); }
.button-secondary:hover { background: var(--border-light); }
table {
    width: 100%;
    border-collapse: collapse;
    margin: 1rem 0;
    background: var(--background-light);
    border-radius: 8px;
    overflow: hidden;
    box-shadow: var(--shadow-sm);
}
th { background: var(--primary); color: white; padding: 1rem; text-align: left; font-weight: 600; }
td { padding: 1rem; border-bottom: 1px solid var(--border-light); }
tr:last-child td { border-bottom: none; }
tr:nth-child(even) { background: var(--background-highlight); }
.status-success { color: var(--success); font-weight: 500; }
.status-warning { color: var(--warning); font-weight: 500; }
.status-error { color: var(--error); font-weight: 500; }
.grid { display: grid; gap: 1rem; margin: 1rem 0; }
.grid-2 { grid-template-columns: repeat(2, 1fr); }
.grid-3 { grid-template-columns: repeat(3, 1fr); }
.grid-4 { grid-template-columns: repeat(4, 1fr); }
.card {
    background: var(--background-light);
    padding: 1.5rem;
    border-radius: 8px;
    box-shadow: var(--shadow-md);
    border: 1px solid var(--border-light);
}
.card h3 { margin-bottom: 0.5rem; color: var(--text-primary); }
.card p { color: var(--text-secondary); margin-bottom: 0; }
.metric { text-align: center; padding: 1rem; }
.metric-value { font-size: 2rem; font-weight: 700; color: var(--accent); display: block; }
.metric-label { font-size: 0.875rem; color: var(--text-muted); text-transform: uppercase; font-weight: 500; }
.footer {
    text-align: center;
    margin-top: 3rem;
    padding-top: 2rem;
    border-top: 1px solid var(--border);
    color: var(--text-muted);
    font-size: 0.875rem;
}
@media (max-width: 768px) {
    body { padding: 1rem; }
    .header { margin: -1rem -1rem 1rem -1rem; padding: 1.5rem; }
    .content-section { padding: 1.5rem; }
    .grid-2, .grid-3, .grid-4 { grid-template-columns: 1fr; }
}
"#;

/// strftime pattern for generated-on stamps.
const STAMP_FORMAT: &str = "%B %d, %Y at %I:%M %p";

const SUCCESS_WORDS: &[&str] = &["success", "ok", "active", "healthy"];
const WARNING_WORDS: &[&str] = &["warning", "caution", "pending"];
const ERROR_WORDS: &[&str] = &["error", "failed", "down", "critical"];

static DEFAULT_GUIDE: LazyLock<StyleGuide> = LazyLock::new(StyleGuide::default);

/// Wrap `content` in a themed document using the default theme.
pub fn generate_html(title: &str, content: &str) -> String {
    DEFAULT_GUIDE.generate_html(title, content)
}

/// Whether `html` is already a full document (contains an `<html` tag).
pub fn is_document(html: &str) -> bool {
    html.to_ascii_lowercase().contains("<html")
}

/// Callout flavour for [`StyleGuide::highlight_box`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BoxKind {
    #[default]
    Info,
    Warning,
}

/// One card in [`StyleGuide::metrics_grid`].
#[derive(Debug, Clone, PartialEq)]
pub struct Metric {
    pub value: String,
    pub label: String,
}

impl Metric {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

/// Theme plus document template.
#[derive(Debug, Clone)]
pub struct StyleGuide {
    variables: Vec<(String, String)>,
    custom_styles: String,
}

impl Default for StyleGuide {
    fn default() -> Self {
        Self {
            variables: THEME_VARIABLES
                .iter()
                .map(|&(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            custom_styles: String::new(),
        }
    }
}

impl StyleGuide {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override a theme variable, or append it if unknown.
    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let value = value.into();
        match self.variables.iter_mut().find(|(k, _)| *k == name) {
            Some(entry) => entry.1 = value,
            None => self.variables.push((name, value)),
        }
        self
    }

    /// Extra CSS appended after the base styles.
    pub fn with_custom_styles(mut self, css: impl Into<String>) -> Self {
        self.custom_styles = css.into();
        self
    }

    pub fn variable(&self, name: &str) -> Option<&str> {
        self.variables
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// The `:root { --name: value; ... }` block.
    pub fn css_variables(&self) -> String {
        let lines: Vec<String> = self
            .variables
            .iter()
            .map(|(k, v)| format!("    --{k}: {v};"))
            .collect();
        format!(":root {{\n{}\n}}", lines.join("\n"))
    }

    /// Complete HTML document with the theme stylesheet and `content` as
    /// the body.
    pub fn generate_html(&self, title: &str, content: &str) -> String {
        format!(
            "<!DOCTYPE html>\n\
             <html lang=\"en\">\n\
             <head>\n\
             <meta charset=\"UTF-8\">\n\
             <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n\
             <title>{title}</title>\n\
             <style>\n{vars}\n{BASE_STYLES}\n{custom}\n</style>\n\
             </head>\n\
             <body>\n{content}\n</body>\n\
             </html>",
            title = escape_text(title),
            vars = self.css_variables(),
            custom = self.custom_styles,
        )
    }

    /// Dark banner with a title, an optional subtitle and a generated-on
    /// stamp. `timestamp` defaults to the local time.
    pub fn header(&self, title: &str, subtitle: Option<&str>, timestamp: Option<&str>) -> String {
        let stamp = timestamp
            .map(str::to_string)
            .unwrap_or_else(|| Local::now().format(STAMP_FORMAT).to_string());
        let subtitle = subtitle
            .filter(|s| !s.is_empty())
            .map(|s| format!("<p>{s}</p>"))
            .unwrap_or_default();
        format!("<div class=\"header\">\n<h1>{title}</h1>\n{subtitle}<p>Generated on {stamp}</p>\n</div>")
    }

    /// Table with a header row. Cells in `status_column` get a status class
    /// picked from their wording.
    pub fn data_table(&self, headers: &[&str], rows: &[Vec<String>], status_column: Option<usize>) -> String {
        let head: String = headers.iter().map(|h| format!("<th>{h}</th>")).collect();
        let body: String = rows
            .iter()
            .map(|row| {
                let cells: String = row
                    .iter()
                    .enumerate()
                    .map(|(i, cell)| match status_column.filter(|&c| c == i).and(status_class(cell)) {
                        Some(class) => format!("<td><span class=\"{class}\">{cell}</span></td>"),
                        None => format!("<td>{cell}</td>"),
                    })
                    .collect();
                format!("<tr>{cells}</tr>")
            })
            .collect();
        format!("<table>\n<thead><tr>{head}</tr></thead>\n<tbody>{body}</tbody>\n</table>")
    }

    /// Grid of metric cards, `columns` wide.
    pub fn metrics_grid(&self, metrics: &[Metric], columns: usize) -> String {
        let cards: String = metrics
            .iter()
            .map(|m| {
                format!(
                    "<div class=\"card metric\"><span class=\"metric-value\">{}</span><span class=\"metric-label\">{}</span></div>",
                    m.value, m.label
                )
            })
            .collect();
        format!("<div class=\"grid grid-{columns}\">{cards}</div>")
    }

    pub fn highlight_box(&self, content: &str, kind: BoxKind) -> String {
        let class = match kind {
            BoxKind::Info => "highlight-box",
            BoxKind::Warning => "warning-box",
        };
        format!("<div class=\"{class}\">{content}</div>")
    }

    pub fn button(&self, text: &str, href: &str, primary: bool) -> String {
        let class = if primary { "button" } else { "button button-secondary" };
        format!("<a href=\"{href}\" class=\"{class}\">{text}</a>")
    }

    /// Footer line. `text` defaults to a generated-on stamp.
    pub fn footer(&self, text: Option<&str>) -> String {
        let text = text
            .map(str::to_string)
            .unwrap_or_else(|| format!("Generated by Slate on {}", Local::now().format(STAMP_FORMAT)));
        format!("<div class=\"footer\">{text}</div>")
    }
}

fn status_class(cell: &str) -> Option<&'static str> {
    let lowered = cell.to_lowercase();
    let any = |words: &[&str]| words.iter().any(|w| lowered.contains(w));
    if any(SUCCESS_WORDS) {
        Some("status-success")
    } else if any(WARNING_WORDS) {
        Some("status-warning")
    } else if any(ERROR_WORDS) {
        Some("status-error")
    } else {
        None
    }
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}
