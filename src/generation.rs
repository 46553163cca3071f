//! Generation orchestration.
//!
//! The prompt is moderated once, then every roster model is called strictly in order.
//! A failing model does not stop the ones after it, and a model's usage record is only
//! touched after its call returned successfully.

use std::collections::VecDeque;

use futures::Stream;
use tracing::{debug, error, warn};

use crate::error::{WizardError, WizardResult};
use crate::llm::client::{
    ChatMessage, CompletionClient, CompletionRequest, CompletionResponse, ModerationClient,
    TokenCounts,
};
use crate::llm::params::GenerationParameters;
use crate::quiz::dispatch::{DispatchPrompt, ModerationStatus};
use crate::session::pricing::PricingTable;
use crate::session::state::SessionState;
use crate::session::usage::UsageRecord;

/// A successful call.
#[derive(Clone, Debug, PartialEq)]
pub struct ModelSuccess {
    /// Generated text.
    pub message: String,
    /// Tokens used by this call.
    pub tokens: TokenCounts,
    /// The model's cumulative usage after this call.
    pub usage: UsageRecord,
}

/// Result of calling one roster model.
#[derive(Clone, Debug, PartialEq)]
pub struct ModelOutcome {
    /// Model that was called.
    pub model_identifier: String,
    /// 1-based position in the roster.
    pub position: usize,
    /// Roster length.
    pub total: usize,
    /// Generated text or the error to render.
    pub result: Result<ModelSuccess, WizardError>,
}

impl ModelOutcome {
    /// Fraction of the roster done once this outcome is shown.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn progress(&self) -> f32 {
        if self.total == 0 {
            return 1.0;
        }
        self.position as f32 / self.total as f32
    }
}

/// Dispatch policy plus the collaborators it calls.
pub struct Orchestrator<'a> {
    completion: &'a dyn CompletionClient,
    moderation: &'a dyn ModerationClient,
    pricing: &'a PricingTable,
    moderation_required: bool,
}

impl<'a> Orchestrator<'a> {
    /// Build an orchestrator.
    ///
    /// With `moderation_required` unset, a failing moderation call is logged and
    /// generation proceeds unscreened; with it set, the failure aborts the run.
    #[must_use]
    pub const fn new(
        completion: &'a dyn CompletionClient,
        moderation: &'a dyn ModerationClient,
        pricing: &'a PricingTable,
        moderation_required: bool,
    ) -> Self {
        Self {
            completion,
            moderation,
            pricing,
            moderation_required,
        }
    }

    /// Gate and moderate the prompt, returning a run that calls each model on demand.
    ///
    /// # Errors
    /// - `ConfigurationInvalid` for an empty prompt, an empty parameter list, or a model
    ///   outside the session roster.
    /// - `ModerationFlagged` when the prompt is flagged; no model is called.
    /// - The moderation error itself when moderation is required and fails.
    pub async fn begin<'s>(
        &self,
        session: &'s mut SessionState,
        prompt: DispatchPrompt,
        parameters: Vec<GenerationParameters>,
    ) -> WizardResult<GenerationRun<'a, 's>> {
        if prompt.is_empty() {
            return Err(WizardError::invalid("prompt is empty; nothing to dispatch"));
        }
        if parameters.is_empty() {
            return Err(WizardError::invalid(
                "no models selected; verify an API key first",
            ));
        }
        if let Some(stray) = parameters
            .iter()
            .find(|p| session.slot(&p.model_identifier).is_none())
        {
            return Err(WizardError::invalid(format!(
                "model '{}' is not in the session roster",
                stray.model_identifier
            )));
        }

        let status = self.moderate(prompt.text()).await?;
        let prompt = prompt.annotate(status);

        Ok(GenerationRun {
            completion: self.completion,
            pricing: self.pricing,
            session,
            prompt,
            total: parameters.len(),
            queue: parameters.into(),
            position: 0,
        })
    }

    async fn moderate(&self, text: &str) -> WizardResult<ModerationStatus> {
        match self.moderation.check(text).await {
            Ok(verdict) if verdict.flagged => {
                let categories: Vec<String> = verdict.categories.into_iter().collect();
                warn!("Prompt flagged by moderation: {}", categories.join(", "));
                Err(WizardError::ModerationFlagged { categories })
            }
            Ok(_) => Ok(ModerationStatus::Passed),
            Err(err) if self.moderation_required => {
                error!("Moderation failed and is required: {err}");
                Err(err)
            }
            Err(err) => {
                warn!("Moderation unavailable, continuing without screening: {err}");
                Ok(ModerationStatus::Unchecked {
                    reason: err.to_string(),
                })
            }
        }
    }
}

/// A moderated prompt waiting to be sent to each roster model in turn.
pub struct GenerationRun<'a, 's> {
    completion: &'a dyn CompletionClient,
    pricing: &'a PricingTable,
    session: &'s mut SessionState,
    prompt: DispatchPrompt,
    queue: VecDeque<GenerationParameters>,
    total: usize,
    position: usize,
}

impl<'a, 's> GenerationRun<'a, 's> {
    /// The prompt being dispatched, with its moderation status.
    #[must_use]
    pub const fn prompt(&self) -> &DispatchPrompt {
        &self.prompt
    }

    /// Models not yet called.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.queue.len()
    }

    /// Call the next model. Returns `None` once every model has been called.
    pub async fn next(&mut self) -> Option<ModelOutcome> {
        let parameters = self.queue.pop_front()?;
        self.position += 1;
        let model = parameters.model_identifier.clone();

        debug!(
            "Getting {model} response ({}/{})",
            self.position, self.total
        );

        let mut messages = self
            .session
            .slot(&model)
            .map(|slot| slot.history.clone())
            .unwrap_or_default();
        messages.push(ChatMessage::user(self.prompt.text()));

        let result = match self
            .completion
            .request(CompletionRequest {
                parameters,
                messages,
            })
            .await
        {
            Ok(response) => Ok(self.record_success(&model, response)),
            Err(err) => {
                error!("Generation failed for {model}: {err}");
                Err(err)
            }
        };

        Some(ModelOutcome {
            model_identifier: model,
            position: self.position,
            total: self.total,
            result,
        })
    }

    /// Drive the run to completion.
    pub async fn collect(mut self) -> Vec<ModelOutcome> {
        let mut outcomes = Vec::with_capacity(self.remaining());
        while let Some(outcome) = self.next().await {
            outcomes.push(outcome);
        }
        outcomes
    }

    /// Expose the run as a stream of outcomes, one per model.
    pub fn into_stream(self) -> impl Stream<Item = ModelOutcome> {
        futures::stream::unfold(self, |mut run| async move {
            run.next().await.map(|outcome| (outcome, run))
        })
    }

    fn record_success(&mut self, model: &str, response: CompletionResponse) -> ModelSuccess {
        let usage = match self.session.slot_mut(model) {
            Some(slot) => {
                slot.history.push(ChatMessage::user(self.prompt.text()));
                slot.history
                    .push(ChatMessage::assistant(response.message.clone()));
                slot.usage = self.pricing.accumulate(&slot.usage, response.tokens, model);
                slot.usage
            }
            None => self
                .pricing
                .accumulate(&UsageRecord::default(), response.tokens, model),
        };

        ModelSuccess {
            message: response.message,
            tokens: response.tokens,
            usage,
        }
    }
}
