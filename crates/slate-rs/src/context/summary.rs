//! Extractive summaries for runs of pruned messages.
//!
//! No model call is involved: the summary is assembled from short user
//! excerpts and a handful of assistant action tags, so it is deterministic
//! and cheap enough to run on every management pass.

use chrono::{DateTime, Local, Utc};

use crate::{Message, MessageRole};

/// User messages this short or shorter contribute no excerpt.
const MIN_EXCERPT_SOURCE_CHARS: usize = 20;
/// Characters kept from each user message.
const EXCERPT_CHARS: usize = 50;
/// Maximum number of user excerpts in one summary.
const MAX_EXCERPTS: usize = 3;

const TAG_TOOLS: &str = "used tools";
const TAG_ARTIFACTS: &str = "created artifacts";
const TAG_CODE: &str = "provided code";

/// Summarize a run of messages.
///
/// Format:
///
/// ```text
/// [Summary of N messages from YYYY-MM-DD] User asked about: a, b, c. Assistant used tools, provided code
/// ```
///
/// The date is the first ten characters of the first message's timestamp, or
/// today's local date at `now` when that message has none. Either part after
/// the header is omitted when it would be empty. Returns an empty string for
/// an empty run.
pub fn summarize_messages(messages: &[Message], now: DateTime<Utc>) -> String {
    let Some(first) = messages.first() else {
        return String::new();
    };

    let mut excerpts: Vec<String> = Vec::new();
    let mut tags: Vec<&'static str> = Vec::new();

    for msg in messages {
        match msg.role {
            MessageRole::User => {
                if let Some(excerpt) = user_excerpt(&msg.content)
                    && !excerpts.contains(&excerpt)
                {
                    excerpts.push(excerpt);
                }
            }
            MessageRole::Assistant => {
                for tag in assistant_tags(&msg.content) {
                    if !tags.contains(&tag) {
                        tags.push(tag);
                    }
                }
            }
            MessageRole::System => {}
        }
    }

    let mut parts = Vec::new();
    if !excerpts.is_empty() {
        let shown: Vec<&str> = excerpts.iter().take(MAX_EXCERPTS).map(String::as_str).collect();
        parts.push(format!("User asked about: {}", shown.join(", ")));
    }
    if !tags.is_empty() {
        parts.push(format!("Assistant {}", tags.join(", ")));
    }

    let date = match &first.timestamp {
        Some(ts) => ts.chars().take(10).collect::<String>(),
        None => now.with_timezone(&Local).format("%Y-%m-%d").to_string(),
    };

    let summary = format!(
        "[Summary of {} messages from {date}] {}",
        messages.len(),
        parts.join(". ")
    );
    summary.trim_end().to_string()
}

/// Excerpt of a user message, if it is long enough to be worth one.
fn user_excerpt(content: &str) -> Option<String> {
    if content.chars().count() <= MIN_EXCERPT_SOURCE_CHARS {
        return None;
    }
    match content.split_once('?') {
        Some((question, _)) => {
            let question = question.trim();
            let skip = question.chars().count().saturating_sub(EXCERPT_CHARS);
            let tail: String = question.chars().skip(skip).collect();
            Some(format!("{tail}?"))
        }
        None => {
            let head: String = content.chars().take(EXCERPT_CHARS).collect();
            Some(format!("{head}..."))
        }
    }
}

/// Action tags an assistant message contributes, in a fixed order.
fn assistant_tags(content: &str) -> Vec<&'static str> {
    let mut tags = Vec::new();
    if content.contains('🔧') {
        tags.push(TAG_TOOLS);
    }
    if content.to_lowercase().contains("artifact") {
        tags.push(TAG_ARTIFACTS);
    }
    if content.contains("```") {
        tags.push(TAG_CODE);
    }
    tags
}
