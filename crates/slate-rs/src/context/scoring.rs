//! Message importance scoring.
//!
//! Each message gets a heuristic score in `[0, 1]` built from its role,
//! content signals (code, tool use, artifacts), keyword buckets, length, and
//! age. Keyword buckets live in an explicit [`KeywordWeights`] table so callers
//! can load their own weights and tests can score in isolation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Message, MessageRole};

const USER_BASE: f64 = 0.4;
const ASSISTANT_BASE: f64 = 0.3;
const CODE_BLOCK_BONUS: f64 = 0.2;
const TOOL_USE_BONUS: f64 = 0.15;
const ARTIFACT_BONUS: f64 = 0.2;
const LENGTH_ADJUSTMENT: f64 = 0.1;
const LONG_MESSAGE_CHARS: usize = 500;
const SHORT_MESSAGE_CHARS: usize = 50;
const RECENCY_ADJUSTMENT: f64 = 0.1;

/// A named group of keywords sharing one per-match delta and a cap on the
/// bucket's total contribution.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct KeywordBucket {
    pub name: String,
    pub keywords: Vec<String>,
    /// Score delta per matched keyword; negative for penalizing buckets.
    pub per_match: f64,
    /// Maximum absolute contribution of the bucket.
    pub cap: f64,
}

impl KeywordBucket {
    pub fn new(name: impl Into<String>, keywords: &[&str], per_match: f64, cap: f64) -> Self {
        Self {
            name: name.into(),
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
            per_match,
            cap,
        }
    }

    /// Number of distinct keywords of this bucket present in `lowered`.
    pub fn matches(&self, lowered: &str) -> usize {
        self.keywords
            .iter()
            .filter(|k| !k.is_empty() && lowered.contains(&k.to_lowercase()))
            .count()
    }

    /// Capped score contribution for already-lowercased content.
    pub fn contribution(&self, lowered: &str) -> f64 {
        let cap = self.cap.abs();
        (self.matches(lowered) as f64 * self.per_match).clamp(-cap, cap)
    }
}

/// Keyword → bucket → delta table used by importance scoring.
///
/// Serializes as a JSON array of buckets:
///
/// ```json
/// [{"name": "high", "keywords": ["bug"], "per_match": 0.1, "cap": 0.3}]
/// ```
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(transparent)]
pub struct KeywordWeights {
    pub buckets: Vec<KeywordBucket>,
}

impl Default for KeywordWeights {
    fn default() -> Self {
        Self {
            buckets: vec![
                KeywordBucket::new(
                    "high",
                    &[
                        "important",
                        "remember",
                        "key",
                        "critical",
                        "essential",
                        "must",
                        "error",
                        "bug",
                        "issue",
                        "problem",
                        "solution",
                        "fixed",
                    ],
                    0.1,
                    0.3,
                ),
                KeywordBucket::new(
                    "medium",
                    &[
                        "please",
                        "help",
                        "question",
                        "how",
                        "what",
                        "why",
                        "when",
                        "explain",
                        "understand",
                        "clarify",
                    ],
                    0.05,
                    0.2,
                ),
                KeywordBucket::new(
                    "low",
                    &["thanks", "okay", "yes", "no", "sure", "got it", "understood"],
                    -0.02,
                    0.1,
                ),
            ],
        }
    }
}

impl KeywordWeights {
    /// A table with no buckets (keywords never affect the score).
    pub fn empty() -> Self {
        Self {
            buckets: Vec::new(),
        }
    }

    /// Parse a table from JSON.
    pub fn from_json(json: &str) -> Result<Self, String> {
        serde_json::from_str(json).map_err(|e| format!("invalid keyword weights: {e}"))
    }

    /// The bucket a keyword belongs to, if any.
    pub fn bucket_for(&self, keyword: &str) -> Option<&KeywordBucket> {
        let keyword = keyword.to_lowercase();
        self.buckets
            .iter()
            .find(|b| b.keywords.iter().any(|k| k.to_lowercase() == keyword))
    }

    /// Sum of all bucket contributions for already-lowercased content.
    pub fn score(&self, lowered: &str) -> f64 {
        self.buckets.iter().map(|b| b.contribution(lowered)).sum()
    }
}

/// Score a message's importance at time `now`. Result is clamped to `[0, 1]`.
pub fn importance(message: &Message, weights: &KeywordWeights, now: DateTime<Utc>) -> f64 {
    let content = message.content.to_lowercase();

    let mut score = match message.role {
        MessageRole::Assistant => ASSISTANT_BASE,
        MessageRole::User | MessageRole::System => USER_BASE,
    };

    if content.contains("```") {
        score += CODE_BLOCK_BONUS;
    }
    if content.contains('🔧') || content.contains("tool_use") {
        score += TOOL_USE_BONUS;
    }
    if content.contains("artifact") {
        score += ARTIFACT_BONUS;
    }

    score += weights.score(&content);

    let chars = content.chars().count();
    if chars > LONG_MESSAGE_CHARS {
        score += LENGTH_ADJUSTMENT;
    } else if chars < SHORT_MESSAGE_CHARS {
        score -= LENGTH_ADJUSTMENT;
    }

    if let Some(ts) = message.parsed_timestamp() {
        let age_hours = (now - ts).num_seconds() as f64 / 3600.0;
        if age_hours < 1.0 {
            score += RECENCY_ADJUSTMENT;
        } else if age_hours > 24.0 {
            score -= RECENCY_ADJUSTMENT;
        }
    }

    score.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn score(msg: &Message) -> f64 {
        importance(msg, &KeywordWeights::empty(), now())
    }

    fn padded(text: &str) -> String {
        // Long enough to avoid the short-message penalty, short enough to
        // avoid the long-message bonus.
        format!("{text} {}", "z".repeat(60))
    }

    #[test]
    fn base_scores_by_role() {
        assert!((score(&Message::user(padded("q"))) - 0.4).abs() < 1e-9);
        assert!((score(&Message::assistant(padded("a"))) - 0.3).abs() < 1e-9);
    }

    #[test]
    fn content_signals_add_up() {
        let code = Message::assistant(padded("```rust\nfn x() {}\n```"));
        assert!((score(&code) - 0.5).abs() < 1e-9);

        let tool = Message::assistant(padded("🔧 ran the search tool"));
        assert!((score(&tool) - 0.45).abs() < 1e-9);

        let artifact = Message::assistant(padded("Created an Artifact for you"));
        assert!((score(&artifact) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn length_adjustments() {
        assert!((score(&Message::user("short")) - 0.3).abs() < 1e-9);
        assert!((score(&Message::user("x".repeat(501))) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn keyword_buckets_are_capped() {
        let weights = KeywordWeights::default();
        let lowered = "important critical error bug fixed";
        assert!((weights.buckets[0].contribution(lowered) - 0.3).abs() < 1e-9);

        let polite = "please help";
        assert!((weights.buckets[1].contribution(polite) - 0.1).abs() < 1e-9);

        let filler = "thanks okay sure got it understood yes";
        assert!((weights.buckets[2].contribution(filler) + 0.1).abs() < 1e-9);
    }

    #[test]
    fn swapped_weight_table_changes_score() {
        let weights = KeywordWeights::from_json(
            r#"[{"name": "deploy", "keywords": ["Kubernetes"], "per_match": 0.25, "cap": 0.25}]"#,
        )
        .unwrap();
        let msg = Message::user(padded("our kubernetes cluster"));
        let scored = importance(&msg, &weights, now());
        assert!((scored - 0.65).abs() < 1e-9);
        assert_eq!(weights.bucket_for("KUBERNETES").unwrap().name, "deploy");
        assert!(weights.bucket_for("docker").is_none());
    }

    #[test]
    fn invalid_weight_json_is_an_error() {
        assert!(KeywordWeights::from_json("{not json").is_err());
    }

    #[test]
    fn recency_adjustments() {
        let aged = |age: Duration| {
            Message::user(padded("q")).with_timestamp((now() - age).to_rfc3339())
        };
        assert!((score(&aged(Duration::minutes(5))) - 0.5).abs() < 1e-9);
        assert!((score(&aged(Duration::hours(30))) - 0.3).abs() < 1e-9);
        assert!((score(&aged(Duration::hours(5))) - 0.4).abs() < 1e-9);

        let unparseable = Message::user(padded("q")).with_timestamp("not a date");
        assert!((score(&unparseable) - 0.4).abs() < 1e-9);
    }

    #[test]
    fn score_is_clamped() {
        let weights = KeywordWeights::default();
        let loaded = Message::user(format!(
            "```🔧 artifact important critical error please help explain {}",
            "x".repeat(600)
        ))
        .with_timestamp(now().to_rfc3339());
        assert_eq!(importance(&loaded, &weights, now()), 1.0);

        // 0.3 base, -0.04 filler words, -0.1 short, -0.1 stale.
        let weak = Message::assistant("ok thanks sure").with_timestamp("2020-01-01T00:00:00Z");
        assert!((importance(&weak, &weights, now()) - 0.06).abs() < 1e-9);

        let floor = Message::assistant("ok").with_timestamp("2020-01-01T00:00:00Z");
        let heavy_penalty = KeywordWeights::from_json(
            r#"[{"name": "noise", "keywords": ["ok"], "per_match": -1.0, "cap": 1.0}]"#,
        )
        .unwrap();
        assert_eq!(importance(&floor, &heavy_penalty, now()), 0.0);
    }
}
