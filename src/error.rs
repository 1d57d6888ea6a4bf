use miette::{Diagnostic, Result};
use thiserror::Error;

/// Main error type for the application
#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error("Calendar ID undefined or empty")]
    #[diagnostic(code(hackboard::calendar_id_missing))]
    CalendarIdentifierMissing,

    #[error("Could not fetch calendar at URL: {url}; Error: {cause}")]
    #[diagnostic(code(hackboard::calendar_fetch))]
    CalendarFetch { url: String, cause: String },

    #[error("Could not parse calendar at URL: {url}; Error: {cause}")]
    #[diagnostic(code(hackboard::calendar_parse))]
    CalendarParse { url: String, cause: String },

    #[error("Calendar event did not contain start or end timestamp")]
    #[diagnostic(code(hackboard::missing_timestamp))]
    MissingTimestamp,

    #[error("Event update request must contain either its database ID or GCal uid")]
    #[diagnostic(code(hackboard::missing_key))]
    MissingKey,

    #[error("Event {name} upsert unsuccessful: {detail}")]
    #[diagnostic(code(hackboard::upsert_failed))]
    UpsertFailed { name: String, detail: String },

    #[error("Storage error: {0}")]
    #[diagnostic(code(hackboard::storage))]
    Storage(String),

    #[error("Not found: {0}")]
    #[diagnostic(code(hackboard::not_found))]
    NotFound(String),

    #[error("Invalid input: {0}")]
    #[diagnostic(code(hackboard::invalid_input))]
    InvalidInput(String),

    #[error("Application form error: {0}")]
    #[diagnostic(code(hackboard::form))]
    Form(String),

    #[error("Environment error: {0}")]
    #[diagnostic(code(hackboard::environment))]
    Environment(String),

    #[error("Configuration error: {0}")]
    #[diagnostic(code(hackboard::config))]
    Config(String),

    #[error("Component error: {0}")]
    #[diagnostic(code(hackboard::component))]
    Component(String),

    #[error(transparent)]
    #[diagnostic(code(hackboard::io))]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    #[diagnostic(code(hackboard::serialization))]
    Serialization(String),

    #[error("Render error: {0}")]
    #[diagnostic(code(hackboard::render))]
    Render(String),

    #[error("Other error: {0}")]
    #[diagnostic(code(hackboard::other))]
    Other(String),
}

impl Error {
    /// Whether the caller supplied bad or missing data
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Error::CalendarIdentifierMissing
                | Error::MissingTimestamp
                | Error::MissingKey
                | Error::InvalidInput(_)
                | Error::Form(_)
        )
    }
}

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

impl From<redis::RedisError> for Error {
    fn from(err: redis::RedisError) -> Self {
        Error::Storage(err.to_string())
    }
}

impl From<askama::Error> for Error {
    fn from(err: askama::Error) -> Self {
        Error::Render(err.to_string())
    }
}

/// Type alias for Result with our Error type
pub type AppResult<T> = Result<T, Error>;

/// Helper to create environment errors
pub fn env_error(var: &str) -> Error {
    Error::Environment(format!("Missing environment variable: {}", var))
}

/// Helper to create configuration errors
pub fn config_error(message: &str) -> Error {
    Error::Config(message.to_string())
}

/// Helper to create component errors
pub fn component_error(message: &str) -> Error {
    Error::Component(message.to_string())
}

/// Helper to create storage errors
pub fn storage_error(message: &str) -> Error {
    Error::Storage(message.to_string())
}

/// Helper to create form errors
pub fn form_error(message: &str) -> Error {
    Error::Form(message.to_string())
}

/// Helper to create input validation errors
pub fn input_error(message: &str) -> Error {
    Error::InvalidInput(message.to_string())
}
