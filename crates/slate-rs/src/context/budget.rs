//! Token estimation and context-window state.
//!
//! There is no tokenizer on this path. Token counts are estimated from
//! character and word counts, which is close enough to pick a management
//! strategy before each model call.

use serde::{Deserialize, Serialize};

use crate::Message;

/// Default characters per token (conservative estimate for English text).
pub const DEFAULT_CHARS_PER_TOKEN: f64 = 3.5;

/// Tokens per whitespace-separated word.
pub const TOKENS_PER_WORD: f64 = 1.3;

/// Fixed per-message overhead added when summing a conversation.
pub const MESSAGE_OVERHEAD_TOKENS: usize = 10;

/// Default context window size in tokens.
pub const DEFAULT_CONTEXT_WINDOW: usize = 200_000;

/// Estimate the token count of `text`: the mean of a character-based and a
/// word-based estimate, rounded.
///
/// ```
/// use slate_rs::context::estimate_tokens;
///
/// assert_eq!(estimate_tokens(""), 0);
/// assert_eq!(estimate_tokens("hello world"), 3);
/// ```
pub fn estimate_tokens(text: &str) -> usize {
    if text.is_empty() {
        return 0;
    }
    let chars = text.chars().count() as f64;
    let words = text.split_whitespace().count() as f64;
    ((chars / DEFAULT_CHARS_PER_TOKEN + words * TOKENS_PER_WORD) / 2.0).round() as usize
}

/// How aggressively history should be pruned.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ContextStrategy {
    None,
    Light,
    Moderate,
    Aggressive,
}

impl ContextStrategy {
    /// Status label shown for this strategy.
    pub fn status(self) -> ContextStatus {
        match self {
            ContextStrategy::None => ContextStatus::Normal,
            ContextStrategy::Light => ContextStatus::Caution,
            ContextStrategy::Moderate => ContextStatus::Warning,
            ContextStrategy::Aggressive => ContextStatus::Critical,
        }
    }

    /// Number of messages to remove from a conversation of `len` messages.
    pub fn removal_budget(self, len: usize) -> usize {
        let scaled = |fraction: f64| (len as f64 * fraction) as usize;
        match self {
            ContextStrategy::None => 0,
            ContextStrategy::Light => scaled(0.2).max(2),
            ContextStrategy::Moderate => scaled(0.4).max(4),
            ContextStrategy::Aggressive => scaled(0.6).max(6),
        }
    }
}

impl std::fmt::Display for ContextStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ContextStrategy::None => "none",
            ContextStrategy::Light => "light",
            ContextStrategy::Moderate => "moderate",
            ContextStrategy::Aggressive => "aggressive",
        };
        f.write_str(name)
    }
}

/// Severity label for context usage.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ContextStatus {
    Normal,
    Caution,
    Warning,
    Critical,
}

/// Thresholds and sizes for context management.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ContextConfig {
    /// Context window size in tokens.
    pub context_window: usize,
    /// Usage ratio at which light pruning starts.
    pub caution_threshold: f64,
    /// Usage ratio at which moderate pruning starts.
    pub warning_threshold: f64,
    /// Usage ratio at which aggressive pruning starts.
    pub critical_threshold: f64,
    /// Tokens added per message when summing a conversation.
    pub message_overhead: usize,
    /// Number of most recent messages that pruning never touches.
    pub protected_recent: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            context_window: DEFAULT_CONTEXT_WINDOW,
            caution_threshold: 0.7,
            warning_threshold: 0.8,
            critical_threshold: 0.9,
            message_overhead: MESSAGE_OVERHEAD_TOKENS,
            protected_recent: 4,
        }
    }
}

impl ContextConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the context window size (in tokens).
    pub fn with_context_window(mut self, tokens: usize) -> Self {
        self.context_window = tokens;
        self
    }

    /// Override the three strategy thresholds (ratios of the window).
    pub fn with_thresholds(mut self, caution: f64, warning: f64, critical: f64) -> Self {
        self.caution_threshold = caution;
        self.warning_threshold = warning;
        self.critical_threshold = critical;
        self
    }

    /// Strategy for a given usage ratio.
    pub fn strategy_for(&self, usage_ratio: f64) -> ContextStrategy {
        if usage_ratio >= self.critical_threshold {
            ContextStrategy::Aggressive
        } else if usage_ratio >= self.warning_threshold {
            ContextStrategy::Moderate
        } else if usage_ratio >= self.caution_threshold {
            ContextStrategy::Light
        } else {
            ContextStrategy::None
        }
    }

    /// Estimated tokens for a system prompt plus a message list, including the
    /// per-message overhead.
    pub fn estimate_conversation(&self, messages: &[Message], system_prompt: &str) -> usize {
        messages
            .iter()
            .map(|m| estimate_tokens(&m.content) + self.message_overhead)
            .sum::<usize>()
            + estimate_tokens(system_prompt)
    }

    /// Compute the full context state for a conversation.
    pub fn state(&self, messages: &[Message], system_prompt: &str) -> ContextState {
        let tokens_used = self.estimate_conversation(messages, system_prompt);
        let usage_ratio = if self.context_window > 0 {
            tokens_used as f64 / self.context_window as f64
        } else {
            1.0
        };
        let strategy = self.strategy_for(usage_ratio);

        ContextState {
            tokens_used,
            tokens_limit: self.context_window,
            usage_ratio,
            usage_percentage: round_one_decimal(usage_ratio * 100.0),
            message_count: messages.len(),
            status: strategy.status(),
            strategy,
            tokens_remaining: self.context_window as i64 - tokens_used as i64,
        }
    }
}

/// Derived context-window state. Never stored; recomputed on demand.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ContextState {
    pub tokens_used: usize,
    pub tokens_limit: usize,
    pub usage_ratio: f64,
    /// Usage as a percentage rounded to one decimal.
    pub usage_percentage: f64,
    pub message_count: usize,
    pub status: ContextStatus,
    pub strategy: ContextStrategy,
    /// Negative when the conversation already exceeds the window.
    pub tokens_remaining: i64,
}

impl ContextState {
    /// Read-only view exposed to callers.
    pub fn snapshot(&self) -> ContextSnapshot {
        ContextSnapshot {
            tokens_used: self.tokens_used,
            tokens_limit: self.tokens_limit,
            usage_percentage: self.usage_percentage,
            status: self.status,
            strategy: self.strategy,
            tokens_remaining: self.tokens_remaining,
        }
    }

    /// Human-readable status line, or `None` while usage is normal.
    pub fn status_message(&self) -> Option<String> {
        let pct = self.usage_percentage;
        match self.status {
            ContextStatus::Critical => Some(format!(
                "⚠️ Context window {pct:.1}% full. Older messages being summarized to maintain conversation flow."
            )),
            ContextStatus::Warning => Some(format!(
                "📊 Context usage at {pct:.1}%. Starting to optimize conversation history."
            )),
            ContextStatus::Caution => Some(format!(
                "💡 Context {pct:.1}% used (~{} tokens remaining).",
                group_thousands(self.tokens_remaining)
            )),
            ContextStatus::Normal => None,
        }
    }

    /// Format as a short log-friendly string.
    pub fn to_log_string(&self) -> String {
        format!(
            "context: ~{} tokens ({:.1}% of {}, {})",
            self.tokens_used, self.usage_percentage, self.tokens_limit, self.strategy,
        )
    }
}

/// Snapshot of context usage at a point in time.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ContextSnapshot {
    pub tokens_used: usize,
    pub tokens_limit: usize,
    pub usage_percentage: f64,
    pub status: ContextStatus,
    pub strategy: ContextStrategy,
    pub tokens_remaining: i64,
}

pub(crate) fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn group_thousands(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if n < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn estimate_averages_char_and_word_estimates() {
        // 11 chars / 3.5 = 3.14, 2 words * 1.3 = 2.6 → 2.87 → 3
        assert_eq!(estimate_tokens("hello world"), 3);
        assert_eq!(estimate_tokens(&"a".repeat(700)), 101);
    }

    #[test]
    fn conversation_estimate_adds_overhead() {
        let config = ContextConfig::default();
        let messages = vec![Message::user("hello world"), Message::assistant("")];
        assert_eq!(config.estimate_conversation(&messages, ""), 3 + 10 + 10);
        assert_eq!(config.estimate_conversation(&messages, "hello world"), 26);
    }

    #[test]
    fn strategy_thresholds() {
        let config = ContextConfig::default();
        assert_eq!(config.strategy_for(0.1), ContextStrategy::None);
        assert_eq!(config.strategy_for(0.7), ContextStrategy::Light);
        assert_eq!(config.strategy_for(0.85), ContextStrategy::Moderate);
        assert_eq!(config.strategy_for(0.85).status(), ContextStatus::Warning);
        assert_eq!(config.strategy_for(0.9), ContextStrategy::Aggressive);
        assert_eq!(config.strategy_for(1.4).status(), ContextStatus::Critical);
    }

    #[test]
    fn custom_thresholds() {
        let config = ContextConfig::default().with_thresholds(0.5, 0.6, 0.7);
        assert_eq!(config.strategy_for(0.55), ContextStrategy::Light);
        assert_eq!(config.strategy_for(0.75), ContextStrategy::Aggressive);
    }

    #[test]
    fn state_for_moderate_usage() {
        // 85 messages of empty content → 850 overhead tokens in a 1000 window.
        let config = ContextConfig::default().with_context_window(1000);
        let messages = vec![Message::user(""); 85];
        let state = config.state(&messages, "");
        assert_eq!(state.tokens_used, 850);
        assert!((state.usage_ratio - 0.85).abs() < 1e-9);
        assert_eq!(state.usage_percentage, 85.0);
        assert_eq!(state.strategy, ContextStrategy::Moderate);
        assert_eq!(state.status, ContextStatus::Warning);
        assert_eq!(state.tokens_remaining, 150);
        assert_eq!(state.message_count, 85);
    }

    #[test]
    fn zero_window_is_saturated() {
        let config = ContextConfig::default().with_context_window(0);
        let state = config.state(&[], "");
        assert_eq!(state.strategy, ContextStrategy::Aggressive);
    }

    #[test]
    fn removal_budgets() {
        assert_eq!(ContextStrategy::None.removal_budget(50), 0);
        assert_eq!(ContextStrategy::Light.removal_budget(5), 2);
        assert_eq!(ContextStrategy::Light.removal_budget(20), 4);
        assert_eq!(ContextStrategy::Moderate.removal_budget(5), 4);
        assert_eq!(ContextStrategy::Moderate.removal_budget(20), 8);
        assert_eq!(ContextStrategy::Aggressive.removal_budget(5), 6);
        assert_eq!(ContextStrategy::Aggressive.removal_budget(20), 12);
    }

    #[test]
    fn status_messages_per_band() {
        let config = ContextConfig::default().with_context_window(1000);
        let at = |n: usize| config.state(&vec![Message::user(""); n], "");

        assert!(at(10).status_message().is_none());
        assert_eq!(
            at(75).status_message().unwrap(),
            "💡 Context 75.0% used (~250 tokens remaining)."
        );
        assert_eq!(
            at(85).status_message().unwrap(),
            "📊 Context usage at 85.0%. Starting to optimize conversation history."
        );
        assert!(at(95).status_message().unwrap().starts_with("⚠️ Context window 95.0% full."));
    }

    #[test]
    fn snapshot_mirrors_state() {
        let state = ContextConfig::default().state(&[Message::user("hi there")], "sys");
        let snap = state.snapshot();
        assert_eq!(snap.tokens_used, state.tokens_used);
        assert_eq!(snap.status, ContextStatus::Normal);
        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["strategy"], "none");
        assert_eq!(json["status"], "normal");
    }

    #[test]
    fn thousands_grouping() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1,000");
        assert_eq!(group_thousands(199_990), "199,990");
        assert_eq!(group_thousands(-1_234_567), "-1,234,567");
    }

    proptest! {
        #[test]
        fn estimate_is_monotonic_under_extension(base in ".{0,200}", extra in ".{0,200}") {
            let longer = format!("{base}{extra}");
            prop_assert!(estimate_tokens(&longer) >= estimate_tokens(&base));
            prop_assert_eq!(estimate_tokens(&base), estimate_tokens(&base));
        }
    }
}
