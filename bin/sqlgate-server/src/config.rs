//! Server configuration, loaded from environment variables at startup.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, bail};
use sqlgate_agent::provider::openai::{ApiFlavor, Endpoint, ProviderConfig};
use sqlgate_agent::{AgentSettings, DEFAULT_RELEVANCE_THRESHOLD, RefusalMode};

/// A credential that never shows up in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(<redacted>)")
    }
}

/// Runtime configuration for sqlgate-server.
///
/// Every field has a default so the server starts without any environment
/// variables except the provider credentials.
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP address to bind (default: `"0.0.0.0:3000"`).
    pub bind_address: String,

    /// `tracing` filter string, e.g. `"info"` or `"debug,tower_http=warn"`.
    pub log_level: String,

    /// When `true`, emit log records as newline-delimited JSON.
    pub log_json: bool,

    /// Also write daily-rolling log files into this directory.
    pub log_dir: Option<PathBuf>,

    /// Comma-separated allowed origins; `None` allows any origin.
    pub cors_allowed_origins: Option<String>,

    /// Mount Swagger UI and the OpenAPI document.
    pub enable_swagger: bool,

    /// Deadline for one chat request, streaming included.
    pub max_duration: Duration,

    pub relevance_threshold: f64,
    pub refusal_mode: RefusalMode,

    /// TOML file overriding the built-in prompts.
    pub prompts_file: Option<PathBuf>,

    pub provider: ApiFlavor,
    pub classifier_model: String,
    pub chat_model: String,

    pub azure_resource_name: Option<String>,
    pub azure_api_key: Option<Secret>,
    pub azure_api_version: String,

    pub openai_base_url: String,
    pub openai_api_key: Option<Secret>,
}

impl Config {
    /// Build [`Config`] from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build [`Config`] from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            bind_address: env_or(&var, "SQLGATE_BIND", "0.0.0.0:3000"),
            log_level: env_or(&var, "SQLGATE_LOG", "info"),
            log_json: parse_bool(&var, "SQLGATE_LOG_JSON", false),
            log_dir: var("SQLGATE_LOG_DIR").map(PathBuf::from),
            cors_allowed_origins: var("SQLGATE_CORS_ORIGINS"),
            enable_swagger: parse_bool(&var, "SQLGATE_ENABLE_SWAGGER", true),
            max_duration: Duration::from_secs(parse_env(&var, "SQLGATE_MAX_DURATION_SECS", 30)),
            relevance_threshold: parse_env(&var, "SQLGATE_RELEVANCE_THRESHOLD", DEFAULT_RELEVANCE_THRESHOLD),
            refusal_mode: parse_env(&var, "SQLGATE_REFUSAL_MODE", RefusalMode::Static),
            prompts_file: var("SQLGATE_PROMPTS_FILE").map(PathBuf::from),
            provider: parse_env(&var, "SQLGATE_PROVIDER", ApiFlavor::Azure),
            classifier_model: env_or(&var, "SQLGATE_CLASSIFIER_MODEL", "gpt-4o-mini"),
            chat_model: env_or(&var, "SQLGATE_CHAT_MODEL", "gpt-4o"),
            azure_resource_name: var("AZURE_RESOURCE_NAME"),
            azure_api_key: var("AZURE_API_KEY").map(Secret),
            azure_api_version: env_or(&var, "AZURE_API_VERSION", "2024-10-21"),
            openai_base_url: env_or(&var, "OPENAI_BASE_URL", "https://api.openai.com/v1"),
            openai_api_key: var("OPENAI_API_KEY").map(Secret),
        }
    }

    /// Provider settings for the selected flavor. Missing credentials are a
    /// startup error.
    pub fn provider_config(&self) -> anyhow::Result<ProviderConfig> {
        let (endpoint, api_key) = match self.provider {
            ApiFlavor::Azure => {
                let resource_name = self
                    .azure_resource_name
                    .clone()
                    .context("AZURE_RESOURCE_NAME must be set when SQLGATE_PROVIDER=azure")?;
                let api_key = self
                    .azure_api_key
                    .as_ref()
                    .context("AZURE_API_KEY must be set when SQLGATE_PROVIDER=azure")?;
                (
                    Endpoint::Azure { resource_name, api_version: self.azure_api_version.clone() },
                    api_key.expose().to_owned(),
                )
            }
            ApiFlavor::OpenAi => {
                let api_key = self
                    .openai_api_key
                    .as_ref()
                    .context("OPENAI_API_KEY must be set when SQLGATE_PROVIDER=openai")?;
                (Endpoint::OpenAi { base_url: self.openai_base_url.clone() }, api_key.expose().to_owned())
            }
        };
        Ok(ProviderConfig {
            endpoint,
            api_key,
            classifier_model: self.classifier_model.clone(),
            chat_model: self.chat_model.clone(),
            timeout: self.max_duration,
        })
    }

    pub fn agent_settings(&self) -> anyhow::Result<AgentSettings> {
        if !(0.0..=1.0).contains(&self.relevance_threshold) {
            bail!("SQLGATE_RELEVANCE_THRESHOLD must lie in [0, 1], got {}", self.relevance_threshold);
        }
        Ok(AgentSettings { relevance_threshold: self.relevance_threshold, refusal_mode: self.refusal_mode })
    }
}

// ── private helpers ──────────────────────────────────────────────────────────

fn env_or(var: impl Fn(&str) -> Option<String>, key: &str, default: &str) -> String {
    var(key).unwrap_or_else(|| default.to_owned())
}

fn parse_env<T: std::str::FromStr>(var: impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    var(key).and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

fn parse_bool(var: impl Fn(&str) -> Option<String>, key: &str, default: bool) -> bool {
    var(key).map(|v| v == "1" || v.eq_ignore_ascii_case("true")).unwrap_or(default)
}
