//! Configuration types.
//!
//! Everything is read from the environment once at startup. Absent
//! provider keys simply disable that provider; the scripted fallback
//! keeps the reply chain total regardless.

use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Honeypot service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Bind address for the HTTP server.
    pub bind_addr: String,
    /// Key callers must present on message-processing endpoints.
    pub api_key: SecretString,
    /// Key callers must present on dashboard endpoints.
    pub dashboard_key: SecretString,
    /// Evaluation endpoint the final callback is POSTed to.
    pub callback_url: String,
    /// Attempts for callback delivery before recording a terminal failure.
    pub callback_attempts: u32,
    /// Base backoff between callback attempts (doubled each retry).
    pub callback_backoff: Duration,
    /// Per-attempt timeout for the callback POST.
    pub callback_timeout: Duration,
    /// Per reply-provider request timeout.
    pub provider_timeout: Duration,
    /// How many trailing messages of history reply providers see.
    pub history_window: usize,
    /// Hard stop: agent turns before forced engagement completion.
    pub max_agent_turns: u32,
    /// Distinct populated intelligence categories that qualify a
    /// session for completion.
    pub intel_category_threshold: usize,
    /// Include scam/intelligence fields in the message response.
    pub extended_response: bool,
    /// Emit a neutral closing line on the completing turn.
    pub closing_reply: bool,
    /// OpenAI API key; `None` disables the OpenAI provider.
    pub openai_api_key: Option<SecretString>,
    /// OpenAI model name.
    pub openai_model: String,
    /// Gemini API key; `None` disables the Gemini provider.
    pub gemini_api_key: Option<SecretString>,
    /// Gemini model name.
    pub gemini_model: String,
    /// Whether the LLM rate gate is enforced.
    pub gate_enabled: bool,
    /// Global LLM calls allowed per minute.
    pub gate_global_rpm: u32,
    /// Reply-stage LLM calls allowed per minute.
    pub gate_reply_rpm: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            api_key: SecretString::from("change-me"),
            dashboard_key: SecretString::from("change-me-too"),
            callback_url: "http://localhost:9000/evaluate".to_string(),
            callback_attempts: 3,
            callback_backoff: Duration::from_millis(500),
            callback_timeout: Duration::from_secs(5),
            provider_timeout: Duration::from_secs(8),
            history_window: 12,
            max_agent_turns: 12,
            intel_category_threshold: 2,
            extended_response: true,
            closing_reply: true,
            openai_api_key: None,
            openai_model: "gpt-4o-mini".to_string(),
            gemini_api_key: None,
            gemini_model: "gemini-2.0-flash".to_string(),
            gate_enabled: true,
            gate_global_rpm: 60,
            gate_reply_rpm: 30,
        }
    }
}

impl Config {
    /// Load configuration from the environment.
    ///
    /// `SCAMBAIT_API_KEY`, `SCAMBAIT_DASHBOARD_KEY` and
    /// `SCAMBAIT_CALLBACK_URL` are required; everything else falls
    /// back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let api_key = require_env("SCAMBAIT_API_KEY")?;
        let dashboard_key = require_env("SCAMBAIT_DASHBOARD_KEY")?;
        let callback_url = require_env("SCAMBAIT_CALLBACK_URL")?;

        Ok(Self {
            bind_addr: env_or("SCAMBAIT_BIND_ADDR", defaults.bind_addr),
            api_key: SecretString::from(api_key),
            dashboard_key: SecretString::from(dashboard_key),
            callback_url,
            callback_attempts: parse_env("SCAMBAIT_CALLBACK_ATTEMPTS", defaults.callback_attempts)?,
            callback_backoff: Duration::from_millis(parse_env(
                "SCAMBAIT_CALLBACK_BACKOFF_MS",
                defaults.callback_backoff.as_millis() as u64,
            )?),
            callback_timeout: Duration::from_millis(parse_env(
                "SCAMBAIT_CALLBACK_TIMEOUT_MS",
                defaults.callback_timeout.as_millis() as u64,
            )?),
            provider_timeout: Duration::from_millis(parse_env(
                "SCAMBAIT_PROVIDER_TIMEOUT_MS",
                defaults.provider_timeout.as_millis() as u64,
            )?),
            history_window: parse_env("SCAMBAIT_HISTORY_WINDOW", defaults.history_window)?,
            max_agent_turns: parse_env("SCAMBAIT_MAX_AGENT_TURNS", defaults.max_agent_turns)?,
            intel_category_threshold: parse_env(
                "SCAMBAIT_INTEL_CATEGORIES",
                defaults.intel_category_threshold,
            )?,
            extended_response: parse_env("SCAMBAIT_EXTENDED_RESPONSE", defaults.extended_response)?,
            closing_reply: parse_env("SCAMBAIT_CLOSING_REPLY", defaults.closing_reply)?,
            openai_api_key: std::env::var("OPENAI_API_KEY").ok().map(SecretString::from),
            openai_model: env_or("SCAMBAIT_OPENAI_MODEL", defaults.openai_model),
            gemini_api_key: std::env::var("GEMINI_API_KEY").ok().map(SecretString::from),
            gemini_model: env_or("SCAMBAIT_GEMINI_MODEL", defaults.gemini_model),
            gate_enabled: parse_env("SCAMBAIT_GATE_ENABLED", defaults.gate_enabled)?,
            gate_global_rpm: parse_env("SCAMBAIT_GATE_GLOBAL_RPM", defaults.gate_global_rpm)?,
            gate_reply_rpm: parse_env("SCAMBAIT_GATE_REPLY_RPM", defaults.gate_reply_rpm)?,
        })
    }
}

fn require_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

fn env_or(key: &str, default: String) -> String {
    std::env::var(key).unwrap_or(default)
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("could not parse {raw:?}"),
        }),
        Err(_) => Ok(default),
    }
}
