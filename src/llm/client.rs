//! Contracts for the remote collaborators: completion, moderation and model listing.

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::WizardResult;
use crate::llm::params::GenerationParameters;

/// Speaker of a chat message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// Instructions.
    System,
    /// The person using the form.
    User,
    /// Model output.
    Assistant,
}

/// One message of a model's conversation history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Speaker.
    pub role: ChatRole,
    /// Message text.
    pub content: String,
    /// When the message entered the history.
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    /// User message stamped now.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(ChatRole::User, content)
    }

    /// Assistant message stamped now.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(ChatRole::Assistant, content)
    }

    fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}

/// Token counts reported for one completion.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenCounts {
    /// Tokens in the request.
    pub prompt: u64,
    /// Tokens generated.
    pub completion: u64,
    /// Total as reported upstream.
    pub total: u64,
}

/// A completion request for one model.
#[derive(Clone, Debug, PartialEq)]
pub struct CompletionRequest {
    /// Dispatch parameters, including the model identifier.
    pub parameters: GenerationParameters,
    /// Prior history followed by the new prompt.
    pub messages: Vec<ChatMessage>,
}

/// Generated text plus accounting.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompletionResponse {
    /// Generated assistant message.
    pub message: String,
    /// Token usage.
    pub tokens: TokenCounts,
}

/// Result of screening a text.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ModerationVerdict {
    /// Whether any category was flagged.
    pub flagged: bool,
    /// Flagged category labels.
    pub categories: BTreeSet<String>,
}

/// Remote text generation.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Request a completion.
    ///
    /// # Errors
    /// `RateLimitExceeded`, `AuthenticationFailed` or `UpstreamError`.
    async fn request(&self, request: CompletionRequest) -> WizardResult<CompletionResponse>;
}

/// Remote content moderation.
#[async_trait]
pub trait ModerationClient: Send + Sync {
    /// Screen a text.
    ///
    /// # Errors
    /// Any transport or service failure.
    async fn check(&self, text: &str) -> WizardResult<ModerationVerdict>;
}

/// Remote model listing, used to verify a credential.
#[async_trait]
pub trait ModelCatalog: Send + Sync {
    /// Identifiers of the models the credential can access.
    ///
    /// # Errors
    /// `AuthenticationFailed` for a rejected credential, `UpstreamError` otherwise.
    async fn list_models(&self) -> WizardResult<Vec<String>>;
}
