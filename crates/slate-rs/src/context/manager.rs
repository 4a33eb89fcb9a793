//! Importance-based pruning with run summaries.
//!
//! [`ContextManager::manage`] is run on the full history before every model
//! call. When usage crosses a threshold it:
//!
//! 1. Scores every message ([`scoring::importance`]) and adds a linear
//!    recency bonus `(i / len) * 0.3`.
//! 2. Sorts ascending by score (ties keep input order).
//! 3. Walks the lowest scores first, skipping the protected tail, until the
//!    strategy's removal budget is spent.
//! 4. Groups removed indices into maximal contiguous runs; each run of two
//!    or more becomes one system summary message at the run's first index.
//! 5. Rebuilds the list in input order.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use super::budget::{ContextConfig, ContextState, ContextStrategy, round_one_decimal};
use super::scoring::{self, KeywordWeights};
use super::summary::summarize_messages;
use crate::Message;

/// Weight of the position-based bonus added before sorting.
const RECENCY_BONUS: f64 = 0.3;

/// Outcome of one management pass.
#[derive(Debug, Clone, Serialize)]
pub struct ManagementReport {
    /// Strategy applied (`none` when nothing was done).
    pub action: ContextStrategy,
    pub removed_count: usize,
    /// Number of summary messages inserted.
    pub summarized_count: usize,
    pub tokens_before: usize,
    pub tokens_after: usize,
    pub reduction_percentage: f64,
    /// State of the returned conversation.
    pub state: ContextState,
}

/// Keeps a conversation within its context window.
///
/// # Example
///
/// ```
/// use slate_rs::Message;
/// use slate_rs::context::{ContextConfig, ContextManager, ContextStrategy};
///
/// let manager = ContextManager::new(ContextConfig::new().with_context_window(100_000));
/// let history = vec![Message::user("hello"), Message::assistant("hi there")];
/// let (kept, report) = manager.manage(&history, "You are helpful.");
/// assert_eq!(kept, history);
/// assert_eq!(report.action, ContextStrategy::None);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ContextManager {
    pub config: ContextConfig,
    pub weights: KeywordWeights,
}

impl ContextManager {
    pub fn new(config: ContextConfig) -> Self {
        Self {
            config,
            weights: KeywordWeights::default(),
        }
    }

    /// Replace the keyword weight table.
    pub fn with_weights(mut self, weights: KeywordWeights) -> Self {
        self.weights = weights;
        self
    }

    /// Usage state of a conversation, without modifying it.
    pub fn state(&self, messages: &[Message], system_prompt: &str) -> ContextState {
        self.config.state(messages, system_prompt)
    }

    /// Importance of one message right now.
    pub fn importance(&self, message: &Message) -> f64 {
        scoring::importance(message, &self.weights, Utc::now())
    }

    /// Manage a conversation against the current time.
    pub fn manage(&self, messages: &[Message], system_prompt: &str) -> (Vec<Message>, ManagementReport) {
        self.manage_at(messages, system_prompt, Utc::now())
    }

    /// Manage a conversation as of `now`.
    ///
    /// Returns the possibly reduced conversation and a report. The last
    /// `protected_recent` messages are always kept verbatim.
    pub fn manage_at(
        &self,
        messages: &[Message],
        system_prompt: &str,
        now: DateTime<Utc>,
    ) -> (Vec<Message>, ManagementReport) {
        let state = self.state(messages, system_prompt);
        let tokens_before = state.tokens_used;

        if messages.is_empty() || state.strategy == ContextStrategy::None {
            let report = ManagementReport {
                action: ContextStrategy::None,
                removed_count: 0,
                summarized_count: 0,
                tokens_before,
                tokens_after: tokens_before,
                reduction_percentage: 0.0,
                state,
            };
            return (messages.to_vec(), report);
        }

        let removed = self.select_removals(messages, state.strategy, now);
        let (managed, summarized_count) = rebuild_with_summaries(messages, &removed, now);

        let new_state = self.state(&managed, system_prompt);
        let tokens_after = new_state.tokens_used;
        let reduction_percentage = if tokens_before == 0 {
            0.0
        } else {
            round_one_decimal((1.0 - tokens_after as f64 / tokens_before as f64) * 100.0)
        };

        let report = ManagementReport {
            action: state.strategy,
            removed_count: removed.len(),
            summarized_count,
            tokens_before,
            tokens_after,
            reduction_percentage,
            state: new_state,
        };

        info!(
            action = %report.action,
            removed = report.removed_count,
            summarized = report.summarized_count,
            tokens_before = report.tokens_before,
            tokens_after = report.tokens_after,
            reduction_pct = report.reduction_percentage,
            "Context management: {}",
            report.state.to_log_string()
        );

        (managed, report)
    }

    /// Pick message indices to remove, returned in ascending order.
    fn select_removals(&self, messages: &[Message], strategy: ContextStrategy, now: DateTime<Utc>) -> Vec<usize> {
        let len = messages.len();
        let protected_from = len.saturating_sub(self.config.protected_recent);
        let budget = strategy.removal_budget(len);

        let mut scored: Vec<(f64, usize)> = messages
            .iter()
            .enumerate()
            .map(|(i, msg)| {
                let bonus = (i as f64 / len as f64) * RECENCY_BONUS;
                (scoring::importance(msg, &self.weights, now) + bonus, i)
            })
            .collect();
        scored.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

        let mut removed: Vec<usize> = scored
            .iter()
            .map(|&(_, i)| i)
            .filter(|&i| i < protected_from)
            .take(budget)
            .collect();
        removed.sort_unstable();

        debug!(
            strategy = %strategy,
            budget,
            selected = removed.len(),
            "Selected messages for removal"
        );
        removed
    }
}

/// Maximal runs of consecutive indices in an ascending index list.
fn contiguous_runs(sorted: &[usize]) -> Vec<&[usize]> {
    let mut runs = Vec::new();
    let mut start = 0;
    for i in 1..=sorted.len() {
        if i == sorted.len() || sorted[i] != sorted[i - 1] + 1 {
            if start < i {
                runs.push(&sorted[start..i]);
            }
            start = i;
        }
    }
    runs
}

/// Drop `removed` from `messages`, inserting one summary at the first index
/// of every run of two or more. Out-of-range and repeated indices are
/// ignored. Returns the rebuilt list and the number of summaries inserted.
pub(crate) fn rebuild_with_summaries(
    messages: &[Message],
    removed: &[usize],
    now: DateTime<Utc>,
) -> (Vec<Message>, usize) {
    let mut removed: Vec<usize> = removed.iter().copied().filter(|&i| i < messages.len()).collect();
    removed.sort_unstable();
    removed.dedup();

    let mut summaries: Vec<(usize, Message)> = Vec::new();
    for run in contiguous_runs(&removed) {
        if run.len() < 2 {
            continue;
        }
        let group: Vec<Message> = run.iter().map(|&i| messages[i].clone()).collect();
        let text = summarize_messages(&group, now);
        if !text.is_empty() {
            summaries.push((run[0], Message::summary(text, group[0].timestamp.clone())));
        }
    }
    let summarized = summaries.len();

    let mut pending = summaries.into_iter().peekable();
    let mut out = Vec::with_capacity(messages.len() - removed.len() + summarized);
    for (i, msg) in messages.iter().enumerate() {
        if let Some((_, summary)) = pending.next_if(|(at, _)| *at == i) {
            out.push(summary);
        }
        if removed.binary_search(&i).is_err() {
            out.push(msg.clone());
        }
    }
    (out, summarized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MessageRole;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn numbered(n: usize) -> Vec<Message> {
        (0..n)
            .map(|i| {
                if i % 2 == 0 {
                    Message::user(format!("m{i}"))
                } else {
                    Message::assistant(format!("m{i}"))
                }
            })
            .collect()
    }

    fn contents(messages: &[Message]) -> Vec<String> {
        messages
            .iter()
            .map(|m| {
                if m.is_summary {
                    "S".to_string()
                } else {
                    m.content.clone()
                }
            })
            .collect()
    }

    #[test]
    fn runs_are_maximal() {
        let runs = contiguous_runs(&[1, 2, 5, 7, 8, 9]);
        assert_eq!(runs, vec![&[1, 2][..], &[5][..], &[7, 8, 9][..]]);
        assert!(contiguous_runs(&[]).is_empty());
    }

    #[test]
    fn summaries_land_at_run_start_and_singletons_vanish() {
        let messages = numbered(14);
        let (rebuilt, summarized) = rebuild_with_summaries(&messages, &[1, 2, 5, 7, 8, 9], now());
        assert_eq!(summarized, 2);
        assert_eq!(
            contents(&rebuilt),
            vec!["m0", "S", "m3", "m4", "m6", "S", "m10", "m11", "m12", "m13"]
        );
        let summary = &rebuilt[1];
        assert_eq!(summary.role, MessageRole::System);
        assert!(summary.content.starts_with("[Summary of 2 messages from "));
        assert!(rebuilt[5].content.starts_with("[Summary of 3 messages from "));
    }

    #[test]
    fn invalid_removal_indices_are_ignored() {
        let messages = numbered(4);
        let (rebuilt, summarized) = rebuild_with_summaries(&messages, &[2, 1, 1, 9], now());
        assert_eq!(summarized, 1);
        assert_eq!(contents(&rebuilt), vec!["m0", "S", "m3"]);

        let (rebuilt, summarized) = rebuild_with_summaries(&messages, &[4, 7], now());
        assert_eq!(summarized, 0);
        assert_eq!(rebuilt, messages);
    }

    #[test]
    fn summary_inherits_first_timestamp() {
        let messages = vec![
            Message::user("a").with_timestamp("2024-05-01T10:00:00Z"),
            Message::assistant("b").with_timestamp("2024-05-01T10:00:05Z"),
            Message::user("c"),
        ];
        let (rebuilt, _) = rebuild_with_summaries(&messages, &[0, 1], now());
        assert_eq!(rebuilt.len(), 2);
        assert_eq!(rebuilt[0].timestamp.as_deref(), Some("2024-05-01T10:00:00Z"));
        assert!(rebuilt[0].content.contains("from 2024-05-01"));
    }

    #[test]
    fn empty_conversation_is_noop() {
        let manager = ContextManager::new(ContextConfig::new().with_context_window(10));
        let (kept, report) = manager.manage_at(&[], "", now());
        assert!(kept.is_empty());
        assert_eq!(report.action, ContextStrategy::None);
        assert_eq!(report.removed_count, 0);
    }

    #[test]
    fn below_threshold_is_untouched() {
        let manager = ContextManager::new(ContextConfig::new());
        let messages = numbered(10);
        let (kept, report) = manager.manage_at(&messages, "system", now());
        assert_eq!(kept, messages);
        assert_eq!(report.action, ContextStrategy::None);
        assert_eq!(report.tokens_before, report.tokens_after);
    }

    #[test]
    fn moderate_pressure_removes_budget_and_keeps_tail() {
        // 20 empty-ish messages at 11 tokens each in a 260-token window: 0.846.
        let messages: Vec<Message> = (0..20).map(|i| Message::user(format!("m{i}"))).collect();
        let manager = ContextManager::new(ContextConfig::new().with_context_window(260));
        let state = manager.state(&messages, "");
        assert_eq!(state.strategy, ContextStrategy::Moderate);

        let (kept, report) = manager.manage_at(&messages, "", now());
        assert_eq!(report.action, ContextStrategy::Moderate);
        assert_eq!(report.removed_count, 8);
        assert!(report.tokens_after < report.tokens_before);
        assert!(report.reduction_percentage > 0.0);

        // Identical scores plus the recency bonus: the oldest go first.
        assert_eq!(report.summarized_count, 1);
        let kept_contents = contents(&kept);
        assert_eq!(kept_contents[0], "S");
        assert_eq!(&kept_contents[1..], &contents(&messages[8..]));
    }

    #[test]
    fn protected_skip_does_not_consume_budget() {
        // Make the protected tail the least important so it sorts first.
        let mut messages: Vec<Message> = (0..10)
            .map(|i| Message::user(format!("{i} please explain the critical bug {}", "x".repeat(500))))
            .collect();
        for msg in messages.iter_mut().skip(6) {
            msg.content = "ok".into();
        }
        let manager = ContextManager::new(ContextConfig::new().with_context_window(1));
        let (kept, report) = manager.manage_at(&messages, "", now());
        assert_eq!(report.action, ContextStrategy::Aggressive);
        // max(6, floor(10 * 0.6)) = 6, all taken from the first six.
        assert_eq!(report.removed_count, 6);
        assert_eq!(kept.len(), 5);
        assert!(kept[0].is_summary);
        assert_eq!(&kept[1..], &messages[6..]);
    }

    #[test]
    fn management_never_grows_or_drops_the_tail() {
        let messages = numbered(3);
        let manager = ContextManager::new(ContextConfig::new().with_context_window(1));
        let (kept, report) = manager.manage_at(&messages, "", now());
        assert_eq!(report.removed_count, 0);
        assert_eq!(kept, messages);
    }

    fn arb_message() -> impl Strategy<Value = Message> {
        (any::<bool>(), "[a-z ?`🔧]{0,80}").prop_map(|(user, text)| {
            if user {
                Message::user(text)
            } else {
                Message::assistant(text)
            }
        })
    }

    proptest! {
        #[test]
        fn recent_four_always_survive(
            messages in prop::collection::vec(arb_message(), 0..40),
            window in 1usize..400,
        ) {
            let manager = ContextManager::new(ContextConfig::new().with_context_window(window));
            let (kept, report) = manager.manage_at(&messages, "", now());
            let tail = messages.len().min(4);
            prop_assert!(kept.len() >= tail);
            prop_assert_eq!(&kept[kept.len() - tail..], &messages[messages.len() - tail..]);
            prop_assert_eq!(
                kept.len(),
                messages.len() - report.removed_count + report.summarized_count
            );
        }
    }
}
