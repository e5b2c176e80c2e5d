//! Error types for the poker bot.

/// Top-level error type for the bot.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Advice error: {0}")]
    Advice(#[from] AdviceError),

    #[error("Credential error: {0}")]
    Credential(#[from] CredentialError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Channel-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Channel {name} failed to start: {reason}")]
    StartupFailed { name: String, reason: String },

    #[error("Failed to send response on channel {name}: {reason}")]
    SendFailed { name: String, reason: String },
}

/// Hand history parse errors. Only the blinds line is mandatory.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("blinds unparsable")]
    BlindsUnparsable,
}

/// Token exchange / refresh errors.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("token exchange request failed: {0}")]
    Transport(String),

    #[error("token exchange returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("token exchange decode error: {0}")]
    Decode(String),

    #[error("token refresh failed after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: Box<CredentialError>,
    },
}

/// Advice provider errors.
#[derive(Debug, thiserror::Error)]
pub enum AdviceError {
    #[error("Provider {provider} request failed: {reason}")]
    Transport { provider: String, reason: String },

    #[error("Provider {provider} returned status {status}, body: {body}")]
    Status {
        provider: String,
        status: u16,
        body: String,
    },

    #[error("Invalid response from {provider}: {reason}")]
    Decode { provider: String, reason: String },

    #[error("{reason}")]
    EmptyResult { provider: String, reason: String },

    #[error("token validation failed: {0}")]
    Credential(#[from] CredentialError),
}

/// Persistence errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Query failed: {0}")]
    Query(String),
}

/// Result type alias for the bot.
pub type Result<T> = std::result::Result<T, Error>;
