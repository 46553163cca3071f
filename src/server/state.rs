//! Application state shared across all request handlers.

use std::sync::Arc;

use uuid::Uuid;

use crate::config::WizardConfig;
use crate::error::WizardResult;
use crate::llm::openai::{self, OpenAiClient};
use crate::session::pricing::PricingTable;
use crate::session::state::{SessionStore, SharedSession};

/// Shared application state.
pub struct AppState {
    /// Validated configuration.
    pub config: WizardConfig,
    /// Pricing derived from the model catalog.
    pub pricing: PricingTable,
    /// Live sessions, shared with the idle-session sweeper.
    pub sessions: Arc<SessionStore>,
    http: reqwest::Client,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid or the HTTP client cannot be built.
    pub fn new(config: WizardConfig) -> WizardResult<Arc<Self>> {
        config.validate()?;
        let http = openai::build_http_client()?;
        let pricing = config.pricing();

        Ok(Arc::new(Self {
            config,
            pricing,
            sessions: Arc::new(SessionStore::new()),
            http,
        }))
    }

    /// Model client bound to `credential`, sharing the connection pool.
    #[must_use]
    pub fn client_for(&self, credential: &str) -> OpenAiClient {
        OpenAiClient::with_http(self.http.clone(), &self.config.api_base, credential)
    }

    /// Session handle, if the id is known.
    #[must_use]
    pub fn session(&self, id: &Uuid) -> Option<SharedSession> {
        self.sessions.get(id)
    }
}
