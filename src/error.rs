//! Error taxonomy shared by every layer of the wizard.

use thiserror::Error;

/// Supplemental text shown alongside a rate-limit failure.
const RATE_LIMIT_HINT: &str = "Friendly reminder: if you are using a free-trial API key, \
this error is caused by the limited rate limits associated with the key. To optimize your \
experience, we recommend upgrading to a pay-as-you-go plan.";

/// Wizard error type.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WizardError {
    /// Bad or missing credential.
    #[error("{0}")]
    AuthenticationFailed(String),
    /// Quota or request-rate limit hit upstream.
    #[error("{0}")]
    RateLimitExceeded(String),
    /// The moderation endpoint flagged the prompt; nothing was dispatched.
    #[error(
        "Your prompt has been flagged by the content moderation endpoint due to the following categories: {}. Please modify your prompt and try again.",
        .categories.join(", ")
    )]
    ModerationFlagged {
        /// Flagged category labels, sorted.
        categories: Vec<String>,
    },
    /// Any other completion, moderation or transport failure.
    #[error("{0}")]
    UpstreamError(String),
    /// Malformed input or configuration.
    #[error("invalid configuration: {0}")]
    ConfigurationInvalid(String),
}

impl WizardError {
    /// Stable snake_case label used by the HTTP layer.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::AuthenticationFailed(_) => "authentication_failed",
            Self::RateLimitExceeded(_) => "rate_limit_exceeded",
            Self::ModerationFlagged { .. } => "moderation_flagged",
            Self::UpstreamError(_) => "upstream_error",
            Self::ConfigurationInvalid(_) => "configuration_invalid",
        }
    }

    /// Extra guidance rendered under the verbatim message, if any.
    #[must_use]
    pub const fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::RateLimitExceeded(_) => Some(RATE_LIMIT_HINT),
            _ => None,
        }
    }

    /// HTTP status used when this error is the whole response.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::AuthenticationFailed(_) => 401,
            Self::RateLimitExceeded(_) => 429,
            Self::ModerationFlagged { .. } => 422,
            Self::UpstreamError(_) => 502,
            Self::ConfigurationInvalid(_) => 400,
        }
    }

    /// Shorthand for a `ConfigurationInvalid` error.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::ConfigurationInvalid(message.into())
    }
}

impl From<reqwest::Error> for WizardError {
    fn from(value: reqwest::Error) -> Self {
        Self::UpstreamError(format!("http client error: {value}"))
    }
}

impl From<serde_json::Error> for WizardError {
    fn from(value: serde_json::Error) -> Self {
        Self::ConfigurationInvalid(format!("json error: {value}"))
    }
}

impl From<std::io::Error> for WizardError {
    fn from(value: std::io::Error) -> Self {
        Self::ConfigurationInvalid(format!("io error: {value}"))
    }
}

impl From<url::ParseError> for WizardError {
    fn from(value: url::ParseError) -> Self {
        Self::ConfigurationInvalid(format!("url parse error: {value}"))
    }
}

/// Convenience result alias.
pub type WizardResult<T> = Result<T, WizardError>;
