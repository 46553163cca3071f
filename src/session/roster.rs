//! Model catalog entries and credential verification.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{WizardError, WizardResult};
use crate::llm::client::ModelCatalog;
use crate::session::pricing::ModelPricing;

/// A model the wizard can dispatch to.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Identifier sent to the endpoint.
    pub identifier: String,
    /// Largest response token budget accepted for this model.
    pub token_limit: u32,
    /// Pricing entry; `None` is reported as zero cost.
    pub pricing: Option<ModelPricing>,
}

/// Models offered by the default configuration.
#[must_use]
pub fn default_catalog() -> Vec<ModelConfig> {
    vec![
        ModelConfig {
            identifier: "gpt-3.5-turbo".to_string(),
            token_limit: 4096,
            pricing: Some(ModelPricing::Split {
                cost_per_1k_prompt_tokens: 0.0005,
                cost_per_1k_completion_tokens: 0.0015,
            }),
        },
        ModelConfig {
            identifier: "gpt-4".to_string(),
            token_limit: 8000,
            pricing: Some(ModelPricing::Split {
                cost_per_1k_prompt_tokens: 0.03,
                cost_per_1k_completion_tokens: 0.06,
            }),
        },
    ]
}

/// Use the submitted key, or the configured fallback when the field was left blank.
///
/// # Errors
/// Returns `AuthenticationFailed` when neither is available.
pub fn resolve_credential(submitted: &str, fallback: Option<&str>) -> WizardResult<String> {
    let submitted = submitted.trim();
    if !submitted.is_empty() {
        return Ok(submitted.to_string());
    }
    fallback
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .map(str::to_string)
        .ok_or_else(|| WizardError::AuthenticationFailed("No API key provided".to_string()))
}

/// List the models the credential can reach and pick the roster.
///
/// The roster keeps catalog order and contains every catalog model that was requested
/// (all of them when `requested` is empty) and is listed by the endpoint.
///
/// # Errors
/// Propagates listing failures; returns `ConfigurationInvalid` for an unknown requested
/// model or when no requested model is available.
pub async fn verify_key(
    catalog: &dyn ModelCatalog,
    configured: &[ModelConfig],
    requested: &[String],
) -> WizardResult<Vec<ModelConfig>> {
    if let Some(unknown) = requested
        .iter()
        .find(|id| !configured.iter().any(|m| &m.identifier == *id))
    {
        return Err(WizardError::invalid(format!("unknown model '{unknown}'")));
    }

    let available: HashSet<String> = catalog.list_models().await?.into_iter().collect();

    let roster: Vec<ModelConfig> = configured
        .iter()
        .filter(|m| requested.is_empty() || requested.contains(&m.identifier))
        .filter(|m| available.contains(&m.identifier))
        .cloned()
        .collect();

    if roster.is_empty() {
        return Err(WizardError::invalid(
            "none of the selected models are available for this API key",
        ));
    }

    info!(
        "Model roster established: {}",
        roster
            .iter()
            .map(|m| m.identifier.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );
    Ok(roster)
}
