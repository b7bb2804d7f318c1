use miette::{Diagnostic, Result};
use thiserror::Error;

/// Main error type for the application
#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error("Fetch error: {0}")]
    #[diagnostic(code(recwell_sync::fetch), help("the published schedule could not be retrieved; nothing was written to the calendar"))]
    Fetch(String),

    #[error("Authentication error: {0}")]
    #[diagnostic(code(recwell_sync::auth), help("run get_calendar_token to create a fresh token file"))]
    Auth(String),

    #[error("Calendar store error: {0}")]
    #[diagnostic(code(recwell_sync::store))]
    Store(String),

    #[error("Environment error: {0}")]
    #[diagnostic(code(recwell_sync::environment))]
    Environment(String),

    #[error("Configuration error: {0}")]
    #[diagnostic(code(recwell_sync::config))]
    Config(String),

    #[error(transparent)]
    #[diagnostic(code(recwell_sync::io))]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    #[diagnostic(code(recwell_sync::serialization))]
    Serialization(String),

    #[error("Other error: {0}")]
    #[diagnostic(code(recwell_sync::other))]
    Other(String),
}

impl Error {
    /// Name of the pipeline stage that produced this error
    pub fn stage(&self) -> &'static str {
        match self {
            Error::Fetch(_) => "fetch",
            Error::Auth(_) => "auth",
            Error::Store(_) => "store",
            Error::Environment(_) | Error::Config(_) => "config",
            Error::Io(_) | Error::Serialization(_) | Error::Other(_) => "internal",
        }
    }
}

// Implement From for TOML deserialization errors
impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

/// Type alias for Result with our Error type
pub type SyncResult<T> = Result<T, Error>;

/// Helper to create environment errors
pub fn env_error(var: &str) -> Error {
    Error::Environment(format!("Missing environment variable: {}", var))
}

/// Helper to create configuration errors
pub fn config_error(message: &str) -> Error {
    Error::Config(message.to_string())
}

/// Helper to create fetch errors
pub fn fetch_error(message: &str) -> Error {
    Error::Fetch(message.to_string())
}

/// Helper to create authentication errors
pub fn auth_error(message: &str) -> Error {
    Error::Auth(message.to_string())
}

/// Helper to create calendar store errors
pub fn store_error(message: &str) -> Error {
    Error::Store(message.to_string())
}

/// Helper to create other errors
pub fn other_error(message: &str) -> Error {
    Error::Other(message.to_string())
}
