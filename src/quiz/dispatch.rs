//! The prompt actually dispatched: composed text or a manual override, plus the
//! moderation status attached before any model sees it.

use serde::Serialize;

use crate::error::{WizardError, WizardResult};

/// Maximum length of a manually edited prompt.
pub const MAX_OVERRIDE_CHARS: usize = 2_000;

/// Outcome of screening the prompt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ModerationStatus {
    /// Not screened yet.
    Pending,
    /// Screened and not flagged.
    Passed,
    /// The moderation call failed and dispatch continued anyway.
    Unchecked {
        /// Why screening was skipped.
        reason: String,
    },
}

/// Prompt text ready for dispatch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DispatchPrompt {
    text: String,
    edited: bool,
    moderation: ModerationStatus,
}

impl DispatchPrompt {
    /// Pick the manual override when one was supplied, else the composed prompt.
    ///
    /// # Errors
    /// Returns `ConfigurationInvalid` when the override exceeds the edit bound.
    pub fn prepare(composed: String, manual_override: Option<String>) -> WizardResult<Self> {
        match manual_override {
            Some(text) => {
                let len = text.chars().count();
                if len > MAX_OVERRIDE_CHARS {
                    return Err(WizardError::invalid(format!(
                        "edited prompt is limited to {MAX_OVERRIDE_CHARS} characters, got {len}"
                    )));
                }
                Ok(Self {
                    text,
                    edited: true,
                    moderation: ModerationStatus::Pending,
                })
            }
            None => Ok(Self {
                text: composed,
                edited: false,
                moderation: ModerationStatus::Pending,
            }),
        }
    }

    /// Attach the moderation status.
    #[must_use]
    pub fn annotate(mut self, moderation: ModerationStatus) -> Self {
        self.moderation = moderation;
        self
    }

    /// Prompt text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Whether the user edited the prompt by hand.
    #[must_use]
    pub const fn is_edited(&self) -> bool {
        self.edited
    }

    /// Moderation status.
    #[must_use]
    pub const fn moderation(&self) -> &ModerationStatus {
        &self.moderation
    }

    /// Blank prompts are never dispatched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}
