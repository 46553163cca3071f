//! Remote model collaborators and their hosted implementation.

pub mod client;
pub mod openai;
pub mod params;

pub use client::{
    ChatMessage, ChatRole, CompletionClient, CompletionRequest, CompletionResponse, ModelCatalog,
    ModerationClient, ModerationVerdict, TokenCounts,
};
pub use openai::OpenAiClient;
pub use params::{GenerationParameters, GenerationSettings};
