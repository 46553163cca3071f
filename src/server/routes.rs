//! HTTP route handlers for the question wizard.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::services::ServeDir;
use tracing::error;
use uuid::Uuid;

use crate::error::WizardError;
use crate::generation::{ModelOutcome, Orchestrator};
use crate::llm::client::TokenCounts;
use crate::llm::params::GenerationSettings;
use crate::quiz::dispatch::DispatchPrompt;
use crate::quiz::profile::{FormProfile, OTHER_LEVEL};
use crate::quiz::spec::{OutputFormat, QuestionForm};
use crate::quiz::compose;
use crate::session::roster::resolve_credential;
use crate::session::state::{SessionSnapshot, SharedSession};
use crate::session::usage::UsageRecord;

use super::state::AppState;

/// Directory holding the browser form.
pub const STATIC_DIR: &str = "static";

/// Create the API router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/profiles", get(list_profiles))
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/{id}", get(get_session).delete(close_session))
        .route("/api/sessions/{id}/key", post(verify_key))
        .route("/api/sessions/{id}/prompt", post(compose_prompt))
        .route("/api/sessions/{id}/generate", post(generate))
        .route("/api/sessions/{id}/reset", post(start_new_test))
        .fallback_service(ServeDir::new(STATIC_DIR))
        .with_state(state)
}

/// Error rendered as the whole response.
#[derive(Debug)]
pub enum ApiError {
    /// Any wizard failure.
    Wizard(WizardError),
    /// The session id is unknown.
    SessionNotFound(Uuid),
}

impl From<WizardError> for ApiError {
    fn from(value: WizardError) -> Self {
        Self::Wizard(value)
    }
}

/// JSON error body. The message is the error text, verbatim.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Stable error kind.
    pub error: &'static str,
    /// Message to show the user.
    pub message: String,
    /// Supplemental guidance.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<&'static str>,
    /// Flagged moderation categories.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<String>>,
}

impl From<&WizardError> for ErrorBody {
    fn from(err: &WizardError) -> Self {
        let categories = match err {
            WizardError::ModerationFlagged { categories } => Some(categories.clone()),
            _ => None,
        };
        Self {
            error: err.kind(),
            message: err.to_string(),
            hint: err.user_hint(),
            categories,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Wizard(err) => {
                let status = StatusCode::from_u16(err.status_code())
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                (status, Json(ErrorBody::from(&err))).into_response()
            }
            Self::SessionNotFound(id) => (
                StatusCode::NOT_FOUND,
                Json(ErrorBody {
                    error: "session_not_found",
                    message: format!("unknown session {id}"),
                    hint: None,
                    categories: None,
                }),
            )
                .into_response(),
        }
    }
}

fn session_handle(state: &AppState, id: Uuid) -> Result<SharedSession, ApiError> {
    state.session(&id).ok_or(ApiError::SessionNotFound(id))
}

/// Health check endpoint.
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "mcq-wizard",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Selector entry for one output format.
#[derive(Debug, Serialize)]
pub struct FormatOption {
    /// Wire value.
    pub value: OutputFormat,
    /// Display label.
    pub label: &'static str,
}

/// Form options and defaults.
#[derive(Debug, Serialize)]
pub struct ProfilesResponse {
    /// Form variants.
    pub profiles: Vec<FormProfile>,
    /// Difficulty value that switches to the free-form custom level.
    pub other_level: &'static str,
    /// Labels for every output format.
    pub output_formats: Vec<FormatOption>,
    /// Selectable model identifiers.
    pub models: Vec<String>,
    /// Default form values.
    pub form: QuestionForm,
    /// Default generation controls.
    pub settings: GenerationSettings,
    /// Whether a server-side key can stand in for an empty key field.
    pub default_key_available: bool,
}

async fn list_profiles(State(state): State<Arc<AppState>>) -> Json<ProfilesResponse> {
    Json(ProfilesResponse {
        profiles: state.config.profiles.clone(),
        other_level: OTHER_LEVEL,
        output_formats: OutputFormat::ALL
            .into_iter()
            .map(|value| FormatOption {
                value,
                label: value.label(),
            })
            .collect(),
        models: state
            .config
            .models
            .iter()
            .map(|m| m.identifier.clone())
            .collect(),
        form: QuestionForm::default(),
        settings: GenerationSettings::default(),
        default_key_available: state.config.default_api_key.is_some(),
    })
}

/// New session id.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionCreated {
    /// Id to use in later requests.
    pub session_id: Uuid,
}

async fn create_session(State(state): State<Arc<AppState>>) -> (StatusCode, Json<SessionCreated>) {
    let session_id = state.sessions.create();
    (StatusCode::CREATED, Json(SessionCreated { session_id }))
}

async fn close_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if state.sessions.remove(&id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::SessionNotFound(id))
    }
}

async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let handle = session_handle(&state, id)?;
    let session = handle.lock().await;
    Ok(Json(session.snapshot()))
}

/// Key verification request.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct KeyRequest {
    /// Submitted credential; blank falls back to the server key.
    pub api_key: String,
    /// Requested model identifiers; empty selects every available model.
    pub models: Vec<String>,
}

async fn verify_key(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(request): Json<KeyRequest>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let handle = session_handle(&state, id)?;
    let credential = resolve_credential(&request.api_key, state.config.default_api_key.as_deref())?;
    let client = state.client_for(&credential);

    let mut session = handle.lock().await;
    if let Err(err) = session
        .verify_key(&client, credential, &state.config.models, &request.models)
        .await
    {
        error!("Key verification failed: {err}");
        return Err(err.into());
    }
    Ok(Json(session.snapshot()))
}

fn default_profile() -> String {
    "general".to_string()
}

/// Prompt preview request.
#[derive(Debug, Deserialize)]
pub struct PromptRequest {
    /// Profile name.
    #[serde(default = "default_profile")]
    pub profile: String,
    /// Form values.
    #[serde(default)]
    pub form: QuestionForm,
}

/// Composed prompt.
#[derive(Debug, Serialize)]
pub struct PromptResponse {
    /// Prompt text.
    pub prompt: String,
}

async fn compose_prompt(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(request): Json<PromptRequest>,
) -> Result<Json<PromptResponse>, ApiError> {
    session_handle(&state, id)?;
    let profile = state.config.profile(&request.profile)?;
    let spec = request.form.resolve(profile)?;
    Ok(Json(PromptResponse {
        prompt: compose(&spec),
    }))
}

/// Generation request.
#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    /// Profile name.
    #[serde(default = "default_profile")]
    pub profile: String,
    /// Form values.
    #[serde(default)]
    pub form: QuestionForm,
    /// Manually edited prompt replacing the composed one.
    #[serde(default)]
    pub prompt_override: Option<String>,
    /// Generation controls applied to every roster model.
    #[serde(default)]
    pub settings: GenerationSettings,
}

/// One model's result.
#[derive(Debug, Serialize)]
pub struct OutcomeDto {
    /// Model called.
    pub model: String,
    /// 1-based roster position.
    pub position: usize,
    /// Roster length.
    pub total: usize,
    /// Completed fraction.
    pub progress: f32,
    /// Generated text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Tokens used by this call.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens: Option<TokenCounts>,
    /// Cumulative usage after this call.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<UsageRecord>,
    /// Failure for this model.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl From<ModelOutcome> for OutcomeDto {
    fn from(outcome: ModelOutcome) -> Self {
        let progress = outcome.progress();
        let (message, tokens, usage, error) = match outcome.result {
            Ok(success) => (
                Some(success.message),
                Some(success.tokens),
                Some(success.usage),
                None,
            ),
            Err(err) => (None, None, None, Some(ErrorBody::from(&err))),
        };
        Self {
            model: outcome.model_identifier,
            position: outcome.position,
            total: outcome.total,
            progress,
            message,
            tokens,
            usage,
            error,
        }
    }
}

/// Generation result.
#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    /// The prompt that was dispatched.
    pub prompt: DispatchPrompt,
    /// Outcomes in roster order.
    pub outcomes: Vec<OutcomeDto>,
}

async fn generate(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(request): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, ApiError> {
    let handle = session_handle(&state, id)?;
    let profile = state.config.profile(&request.profile)?;
    let spec = request.form.resolve(profile)?;
    let prompt = DispatchPrompt::prepare(compose(&spec), request.prompt_override)?;

    let mut session = handle.lock().await;
    let credential = session.credential().map(str::to_string).ok_or_else(|| {
        WizardError::AuthenticationFailed("Verify an API key before generating".to_string())
    })?;
    let parameters = request.settings.expand(session.roster())?;

    let client = state.client_for(&credential);
    let orchestrator = Orchestrator::new(
        &client,
        &client,
        &state.pricing,
        state.config.moderation_required,
    );

    let run = orchestrator.begin(&mut session, prompt, parameters).await?;
    let prompt = run.prompt().clone();
    let outcomes = run.collect().await;

    Ok(Json(GenerateResponse {
        prompt,
        outcomes: outcomes.into_iter().map(OutcomeDto::from).collect(),
    }))
}

async fn start_new_test(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let handle = session_handle(&state, id)?;
    let mut session = handle.lock().await;
    session.start_new_test();
    Ok(Json(session.snapshot()))
}
