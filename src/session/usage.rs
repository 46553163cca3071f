//! Per-model usage counters.

use serde::{Deserialize, Serialize};

/// Cumulative token usage and derived cost for one model in one session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    /// Cumulative prompt tokens.
    pub prompt_tokens: u64,
    /// Cumulative completion tokens.
    pub completion_tokens: u64,
    /// Cumulative total tokens.
    pub total_tokens: u64,
    /// Cost derived from the cumulative counts.
    pub estimated_cost: f64,
}

impl UsageRecord {
    /// Whether any call has been accounted.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.total_tokens == 0 && self.prompt_tokens == 0 && self.completion_tokens == 0
    }
}
