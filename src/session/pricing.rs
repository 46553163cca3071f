//! Table-driven cost estimation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{WizardError, WizardResult};
use crate::llm::client::TokenCounts;
use crate::session::roster::ModelConfig;
use crate::session::usage::UsageRecord;

/// Price of one model.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelPricing {
    /// Separate prompt and completion rates.
    Split {
        /// USD per 1K prompt tokens.
        cost_per_1k_prompt_tokens: f64,
        /// USD per 1K completion tokens.
        cost_per_1k_completion_tokens: f64,
    },
    /// Flat rate over total tokens.
    Blended {
        /// USD per 1K total tokens.
        cost_per_1k_total_tokens: f64,
    },
}

impl ModelPricing {
    /// Cost of the cumulative counts in `record`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn cost(&self, record: &UsageRecord) -> f64 {
        match *self {
            Self::Split {
                cost_per_1k_prompt_tokens,
                cost_per_1k_completion_tokens,
            } => {
                record.prompt_tokens as f64 * cost_per_1k_prompt_tokens / 1000.0
                    + record.completion_tokens as f64 * cost_per_1k_completion_tokens / 1000.0
            }
            Self::Blended {
                cost_per_1k_total_tokens,
            } => record.total_tokens as f64 * cost_per_1k_total_tokens / 1000.0,
        }
    }

    /// Reject negative or non-finite rates.
    ///
    /// # Errors
    /// Returns `ConfigurationInvalid` for an unusable rate.
    pub fn validate(&self) -> WizardResult<()> {
        let rates = match *self {
            Self::Split {
                cost_per_1k_prompt_tokens,
                cost_per_1k_completion_tokens,
            } => vec![cost_per_1k_prompt_tokens, cost_per_1k_completion_tokens],
            Self::Blended {
                cost_per_1k_total_tokens,
            } => vec![cost_per_1k_total_tokens],
        };
        if rates.iter().all(|rate| rate.is_finite() && *rate >= 0.0) {
            Ok(())
        } else {
            Err(WizardError::invalid("pricing rates must be finite and >= 0"))
        }
    }
}

/// Pricing keyed by model identifier.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PricingTable {
    entries: BTreeMap<String, ModelPricing>,
}

impl PricingTable {
    /// Collect the priced entries of a model catalog.
    #[must_use]
    pub fn from_models(models: &[ModelConfig]) -> Self {
        let entries = models
            .iter()
            .filter_map(|m| m.pricing.map(|p| (m.identifier.clone(), p)))
            .collect();
        Self { entries }
    }

    /// Add or replace an entry.
    #[must_use]
    pub fn with_entry(mut self, model_identifier: impl Into<String>, pricing: ModelPricing) -> Self {
        self.entries.insert(model_identifier.into(), pricing);
        self
    }

    /// Pricing for one model, if configured.
    #[must_use]
    pub fn get(&self, model_identifier: &str) -> Option<&ModelPricing> {
        self.entries.get(model_identifier)
    }

    /// Fold a response's token counts into `record`.
    ///
    /// Cost is recomputed from the cumulative counts, so splitting deltas across calls
    /// never changes the result. An unpriced model costs zero and logs a warning.
    #[must_use]
    pub fn accumulate(
        &self,
        record: &UsageRecord,
        tokens: TokenCounts,
        model_identifier: &str,
    ) -> UsageRecord {
        let mut next = UsageRecord {
            prompt_tokens: record.prompt_tokens.saturating_add(tokens.prompt),
            completion_tokens: record.completion_tokens.saturating_add(tokens.completion),
            total_tokens: record.total_tokens.saturating_add(tokens.total),
            estimated_cost: 0.0,
        };

        next.estimated_cost = if let Some(pricing) = self.get(model_identifier) {
            pricing.cost(&next)
        } else {
            warn!("No pricing configured for model {model_identifier}; reporting zero cost");
            0.0
        };

        next
    }
}
