//! Error types for the honeypot core.

use std::time::Duration;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Session store error: {0}")]
    Store(#[from] StoreError),

    #[error("Reply provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Callback error: {0}")]
    Callback(#[from] CallbackError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Session store errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Session not found: {0}")]
    NotFound(String),
}

/// Reply provider errors. Any of these advances the provider chain.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Provider {provider} timed out after {elapsed:?}")]
    Timeout { provider: String, elapsed: Duration },

    #[error("Provider {provider} returned error status {status}")]
    ErrorStatus { provider: String, status: u16 },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Provider {provider} call dropped by rate gate")]
    Gated { provider: String },
}

/// Callback dispatch errors. Recorded on the session for
/// observability, never surfaced to the inbound caller.
#[derive(Debug, thiserror::Error)]
pub enum CallbackError {
    #[error("Callback POST failed: {0}")]
    Transport(String),

    #[error("Callback endpoint returned status {0}")]
    ErrorStatus(u16),

    #[error("All {attempts} callback attempts failed, last error: {last}")]
    Exhausted { attempts: u32, last: String },
}
