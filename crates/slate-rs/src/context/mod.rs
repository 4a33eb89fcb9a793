//! Context window management: budgets, importance scoring, and pruning.
//!
//! The model accepts a bounded number of tokens per call, while a chat
//! session's history grows without bound. Before every call the history goes
//! through these layers:
//!
//! 1. **[`budget`]**: [`estimate_tokens`] and [`ContextConfig::state`] size
//!    the conversation and map the usage ratio onto a strategy:
//!
//!    | Usage ratio | Strategy     | Status     | Removal budget     |
//!    |-------------|--------------|------------|--------------------|
//!    | < 0.7       | `none`       | `normal`   | 0                  |
//!    | ≥ 0.7       | `light`      | `caution`  | max(2, ⌊20%⌋)      |
//!    | ≥ 0.8       | `moderate`   | `warning`  | max(4, ⌊40%⌋)      |
//!    | ≥ 0.9       | `aggressive` | `critical` | max(6, ⌊60%⌋)      |
//!
//! 2. **[`scoring`]**: heuristic importance per message, driven by a
//!    swappable [`KeywordWeights`] table.
//!
//! 3. **[`summary`]**: extractive summaries for runs of pruned messages.
//!
//! 4. **[`manager`]**: [`ContextManager`] ties the above together and never
//!    touches the four most recent messages.

pub mod budget;
pub mod manager;
pub mod scoring;
pub mod summary;

// Re-export commonly used items at the module level.
pub use budget::{
    ContextConfig, ContextSnapshot, ContextState, ContextStatus, ContextStrategy, DEFAULT_CHARS_PER_TOKEN,
    DEFAULT_CONTEXT_WINDOW, estimate_tokens,
};
pub use manager::{ContextManager, ManagementReport};
pub use scoring::{KeywordBucket, KeywordWeights};
pub use summary::summarize_messages;
