//! Runtime configuration for the wizard.

use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;
use url::Url;

use crate::error::{WizardError, WizardResult};
use crate::llm::openai::DEFAULT_API_BASE;
use crate::quiz::profile::{FormProfile, default_profiles};
use crate::session::pricing::PricingTable;
use crate::session::roster::{ModelConfig, default_catalog};

/// Path of an optional JSON configuration file.
pub const CONFIG_PATH_ENV: &str = "MCQ_WIZARD_CONFIG";
/// Listening address override.
pub const HOST_ENV: &str = "MCQ_WIZARD_HOST";
/// Listening port override.
pub const PORT_ENV: &str = "MCQ_WIZARD_PORT";
/// API base URL override.
pub const API_BASE_ENV: &str = "MCQ_WIZARD_API_BASE";
/// Server-side credential used when the user leaves the key field blank.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";
/// Moderation policy override (`true` blocks dispatch when moderation fails).
pub const MODERATION_REQUIRED_ENV: &str = "MCQ_WIZARD_MODERATION_REQUIRED";
/// Idle session lifetime override, in seconds.
pub const SESSION_TTL_ENV: &str = "MCQ_WIZARD_SESSION_TTL";

/// Default server port.
pub const DEFAULT_PORT: u16 = 3000;
/// Sessions idle for longer than this are evicted (4 hours).
pub const DEFAULT_SESSION_TTL_SECONDS: u64 = 4 * 60 * 60;
/// Time between eviction sweeps (5 minutes).
pub const DEFAULT_SWEEP_INTERVAL_SECONDS: u64 = 5 * 60;
/// Upper bound accepted for the session lifetime (30 days).
pub const MAX_SESSION_TTL_SECONDS: u64 = 30 * 24 * 60 * 60;

/// Top-level configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct WizardConfig {
    /// HTTP listening address.
    pub host: IpAddr,
    /// HTTP listening port.
    pub port: u16,
    /// Base URL of the completion/moderation API.
    pub api_base: Url,
    /// Fallback credential; never serialized back out.
    #[serde(skip_serializing)]
    pub default_api_key: Option<String>,
    /// Block dispatch when the moderation call itself fails.
    pub moderation_required: bool,
    /// Models the user may select, in display order.
    pub models: Vec<ModelConfig>,
    /// Form variants.
    pub profiles: Vec<FormProfile>,
    /// Idle time after which a session is dropped.
    pub session_ttl_seconds: u64,
    /// How often idle sessions are swept.
    pub sweep_interval_seconds: u64,
}

impl Default for WizardConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            api_base: default_api_base(),
            default_api_key: None,
            moderation_required: false,
            models: default_catalog(),
            profiles: default_profiles(),
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            sweep_interval_seconds: DEFAULT_SWEEP_INTERVAL_SECONDS,
        }
    }
}

#[allow(clippy::expect_used)]
fn default_api_base() -> Url {
    Url::parse(DEFAULT_API_BASE).expect("DEFAULT_API_BASE is a valid URL")
}

impl WizardConfig {
    /// Defaults, then the JSON file named by `MCQ_WIZARD_CONFIG`, then env overrides.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed, an override is malformed,
    /// or the result fails validation.
    pub fn load() -> WizardResult<Self> {
        let mut config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) if !path.trim().is_empty() => Self::from_file(Path::new(path.trim()))?,
            _ => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a JSON configuration file. Missing fields keep their defaults.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> WizardResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&raw)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Apply environment overrides through `lookup`.
    ///
    /// # Errors
    /// Returns `ConfigurationInvalid` for an unparsable override.
    pub fn apply_env<F>(&mut self, lookup: F) -> WizardResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup(HOST_ENV) {
            self.host = host
                .trim()
                .parse()
                .map_err(|_| WizardError::invalid(format!("{HOST_ENV} must be an IP address")))?;
        }
        if let Some(port) = lookup(PORT_ENV) {
            self.port = port
                .trim()
                .parse()
                .map_err(|_| WizardError::invalid(format!("{PORT_ENV} must be a port number")))?;
        }
        if let Some(base) = lookup(API_BASE_ENV) {
            self.api_base = Url::parse(base.trim())?;
        }
        if let Some(key) = lookup(API_KEY_ENV).filter(|k| !k.trim().is_empty()) {
            self.default_api_key = Some(key.trim().to_string());
        }
        if let Some(ttl) = lookup(SESSION_TTL_ENV) {
            self.session_ttl_seconds = ttl.trim().parse().map_err(|_| {
                WizardError::invalid(format!("{SESSION_TTL_ENV} must be a number of seconds"))
            })?;
        }
        if let Some(flag) = lookup(MODERATION_REQUIRED_ENV) {
            self.moderation_required = match flag.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                other => {
                    return Err(WizardError::invalid(format!(
                        "{MODERATION_REQUIRED_ENV} must be true or false, got '{other}'"
                    )));
                }
            };
        }
        Ok(())
    }

    /// Validate configuration invariants.
    ///
    /// # Errors
    /// Returns an error if any values are out of range or inconsistent.
    pub fn validate(&self) -> WizardResult<()> {
        if self.models.is_empty() {
            return Err(WizardError::invalid("models must not be empty"));
        }

        let mut seen = HashSet::new();
        for model in &self.models {
            if model.identifier.trim().is_empty() {
                return Err(WizardError::invalid("model identifier must not be empty"));
            }
            if !seen.insert(model.identifier.as_str()) {
                return Err(WizardError::invalid(format!(
                    "duplicate model identifier '{}'",
                    model.identifier
                )));
            }
            if model.token_limit == 0 {
                return Err(WizardError::invalid(format!(
                    "model '{}' token_limit must be > 0",
                    model.identifier
                )));
            }
            if let Some(pricing) = &model.pricing {
                pricing.validate()?;
            }
        }

        if self.session_ttl_seconds == 0 || self.session_ttl_seconds > MAX_SESSION_TTL_SECONDS {
            return Err(WizardError::invalid(format!(
                "session_ttl_seconds must be between 1 and {MAX_SESSION_TTL_SECONDS}"
            )));
        }
        if self.sweep_interval_seconds == 0 {
            return Err(WizardError::invalid("sweep_interval_seconds must be > 0"));
        }

        if self.profiles.is_empty() {
            return Err(WizardError::invalid("profiles must not be empty"));
        }
        for profile in &self.profiles {
            if profile.difficulty_levels.is_empty() {
                return Err(WizardError::invalid(format!(
                    "profile '{}' has no difficulty levels",
                    profile.name
                )));
            }
            if profile.output_formats.is_empty() {
                return Err(WizardError::invalid(format!(
                    "profile '{}' has no output formats",
                    profile.name
                )));
            }
        }

        Ok(())
    }

    /// Socket the HTTP server binds to.
    #[must_use]
    pub const fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Idle lifetime of a session.
    #[must_use]
    pub const fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_seconds)
    }

    /// Interval between idle-session sweeps.
    #[must_use]
    pub const fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_seconds)
    }

    /// Pricing table derived from the model catalog.
    #[must_use]
    pub fn pricing(&self) -> PricingTable {
        PricingTable::from_models(&self.models)
    }

    /// Look up a profile by name.
    ///
    /// # Errors
    /// Returns `ConfigurationInvalid` for an unknown name.
    pub fn profile(&self, name: &str) -> WizardResult<&FormProfile> {
        self.profiles
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| WizardError::invalid(format!("unknown form profile '{name}'")))
    }
}
