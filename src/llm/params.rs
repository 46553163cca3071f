//! Per-model generation parameters.

use serde::{Deserialize, Serialize};

use crate::error::{WizardError, WizardResult};
use crate::session::roster::ModelConfig;

/// Upper bound of the response token control.
pub const MAX_RESPONSE_TOKENS: u32 = 1_000;

/// Dispatch configuration for one model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenerationParameters {
    /// Model to call.
    pub model_identifier: String,
    /// Response token limit; `0` leaves the endpoint default in place.
    pub max_tokens: u32,
    /// Sampling temperature, 0.0..=1.0.
    pub temperature: f32,
    /// Nucleus sampling, 0.0..=1.0.
    pub top_p: f32,
    /// Frequency penalty, 0.0..=1.0.
    pub frequency_penalty: f32,
    /// Presence penalty, 0.0..=1.0.
    pub presence_penalty: f32,
}

/// The generation controls shared by every model in the roster.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    /// Response token limit.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
    /// Nucleus sampling.
    pub top_p: f32,
    /// Frequency penalty.
    pub frequency_penalty: f32,
    /// Presence penalty.
    pub presence_penalty: f32,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            max_tokens: MAX_RESPONSE_TOKENS,
            temperature: 0.7,
            top_p: 1.0,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
        }
    }
}

impl GenerationSettings {
    /// Validate the controls.
    ///
    /// # Errors
    /// Returns `ConfigurationInvalid` when any control is out of range.
    pub fn validate(&self) -> WizardResult<()> {
        if self.max_tokens > MAX_RESPONSE_TOKENS {
            return Err(WizardError::invalid(format!(
                "max_tokens must be at most {MAX_RESPONSE_TOKENS}, got {}",
                self.max_tokens
            )));
        }
        for (name, value) in [
            ("temperature", self.temperature),
            ("top_p", self.top_p),
            ("frequency_penalty", self.frequency_penalty),
            ("presence_penalty", self.presence_penalty),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(WizardError::invalid(format!(
                    "{name} must be between 0.0 and 1.0, got {value}"
                )));
            }
        }
        Ok(())
    }

    /// Parameters for one roster model, with `max_tokens` clamped to its limit.
    #[must_use]
    pub fn for_model(&self, model: &ModelConfig) -> GenerationParameters {
        GenerationParameters {
            model_identifier: model.identifier.clone(),
            max_tokens: self.max_tokens.min(model.token_limit),
            temperature: self.temperature,
            top_p: self.top_p,
            frequency_penalty: self.frequency_penalty,
            presence_penalty: self.presence_penalty,
        }
    }

    /// Parameters for every roster model, in roster order.
    ///
    /// # Errors
    /// Returns `ConfigurationInvalid` when the controls are out of range.
    pub fn expand<'a>(
        &self,
        roster: impl IntoIterator<Item = &'a ModelConfig>,
    ) -> WizardResult<Vec<GenerationParameters>> {
        self.validate()?;
        Ok(roster.into_iter().map(|model| self.for_model(model)).collect())
    }
}
