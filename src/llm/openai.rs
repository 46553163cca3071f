//! Hosted completion, moderation and model-listing client over `reqwest`.
//!
//! Speaks the OpenAI-compatible REST surface:
//! - `GET  {base}/models`
//! - `POST {base}/chat/completions`
//! - `POST {base}/moderations`

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::error::{WizardError, WizardResult};
use crate::llm::client::{
    ChatRole, CompletionClient, CompletionRequest, CompletionResponse, ModelCatalog,
    ModerationClient, ModerationVerdict, TokenCounts,
};

/// Default API base URL.
pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1/";

/// Connection timeout. Request duration is left to the transport.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Serialize)]
struct ChatCompletionBody<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    temperature: f32,
    top_p: f32,
    frequency_penalty: f32,
    presence_penalty: f32,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: ChatRole,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatCompletionReply {
    choices: Vec<ReplyChoice>,
    usage: Option<ReplyUsage>,
}

#[derive(Deserialize)]
struct ReplyChoice {
    message: ReplyMessage,
}

#[derive(Deserialize)]
struct ReplyMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ReplyUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
    total_tokens: u64,
}

#[derive(Serialize)]
struct ModerationBody<'a> {
    input: &'a str,
}

#[derive(Deserialize)]
struct ModerationReply {
    results: Vec<ModerationResult>,
}

#[derive(Deserialize)]
struct ModerationResult {
    flagged: bool,
    #[serde(default)]
    categories: BTreeMap<String, bool>,
}

#[derive(Deserialize)]
struct ModelList {
    data: Vec<ModelEntry>,
}

#[derive(Deserialize)]
struct ModelEntry {
    id: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Client bound to one credential.
#[derive(Clone)]
pub struct OpenAiClient {
    http: Client,
    base_url: Url,
    api_key: String,
}

impl std::fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiClient")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl OpenAiClient {
    /// Build a client with its own connection pool.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: &Url, api_key: impl Into<String>) -> WizardResult<Self> {
        let http = build_http_client()?;
        Ok(Self::with_http(http, base_url, api_key))
    }

    /// Build a client over an existing connection pool.
    #[must_use]
    pub fn with_http(http: Client, base_url: &Url, api_key: impl Into<String>) -> Self {
        Self {
            http,
            base_url: normalize_base(base_url),
            api_key: api_key.into(),
        }
    }

    fn endpoint(&self, path: &str) -> WizardResult<Url> {
        Ok(self.base_url.join(path)?)
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> WizardResult<T> {
        let response = request.bearer_auth(&self.api_key).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(error_from_status(status, &body));
        }

        serde_json::from_str(&body).map_err(|e| {
            WizardError::UpstreamError(format!("malformed response from model endpoint: {e}"))
        })
    }
}

/// Build the shared HTTP client.
///
/// # Errors
/// Returns an error if the TLS backend cannot be initialized.
pub fn build_http_client() -> WizardResult<Client> {
    Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .gzip(true)
        .build()
        .map_err(|e| WizardError::UpstreamError(format!("http client error: {e}")))
}

/// Ensure the base path ends in `/` so relative joins append instead of replace.
#[must_use]
pub fn normalize_base(base_url: &Url) -> Url {
    let mut url = base_url.clone();
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

/// Map a non-success HTTP reply onto the error taxonomy.
#[must_use]
pub fn error_from_status(status: StatusCode, body: &str) -> WizardError {
    let detail = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|envelope| envelope.error.message)
        .unwrap_or_else(|_| format!("HTTP {status}: {}", body.trim()));
    let message = format!("API Error: {detail}");

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            WizardError::AuthenticationFailed(message)
        }
        StatusCode::TOO_MANY_REQUESTS => WizardError::RateLimitExceeded(message),
        _ => WizardError::UpstreamError(message),
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn request(&self, request: CompletionRequest) -> WizardResult<CompletionResponse> {
        let params = &request.parameters;
        let body = ChatCompletionBody {
            model: &params.model_identifier,
            messages: request
                .messages
                .iter()
                .map(|m| WireMessage {
                    role: m.role,
                    content: &m.content,
                })
                .collect(),
            max_tokens: (params.max_tokens > 0).then_some(params.max_tokens),
            temperature: params.temperature,
            top_p: params.top_p,
            frequency_penalty: params.frequency_penalty,
            presence_penalty: params.presence_penalty,
        };

        debug!(
            "Requesting completion from {} with {} messages",
            params.model_identifier,
            body.messages.len()
        );

        let url = self.endpoint("chat/completions")?;
        let reply: ChatCompletionReply = self.send_json(self.http.post(url).json(&body)).await?;

        let message = reply
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| WizardError::UpstreamError("No content returned from model".to_string()))?;

        let tokens = reply
            .usage
            .map(|u| TokenCounts {
                prompt: u.prompt_tokens,
                completion: u.completion_tokens,
                total: u.total_tokens,
            })
            .unwrap_or_default();

        Ok(CompletionResponse { message, tokens })
    }
}

#[async_trait]
impl ModerationClient for OpenAiClient {
    async fn check(&self, text: &str) -> WizardResult<ModerationVerdict> {
        let url = self.endpoint("moderations")?;
        let reply: ModerationReply = self
            .send_json(self.http.post(url).json(&ModerationBody { input: text }))
            .await?;

        let result = reply.results.into_iter().next().ok_or_else(|| {
            WizardError::UpstreamError("moderation endpoint returned no results".to_string())
        })?;

        Ok(ModerationVerdict {
            flagged: result.flagged,
            categories: result
                .categories
                .into_iter()
                .filter_map(|(name, hit)| hit.then_some(name))
                .collect(),
        })
    }
}

#[async_trait]
impl ModelCatalog for OpenAiClient {
    async fn list_models(&self) -> WizardResult<Vec<String>> {
        let url = self.endpoint("models")?;
        let list: ModelList = self.send_json(self.http.get(url)).await?;
        Ok(list.data.into_iter().map(|m| m.id).collect())
    }
}
