use serde::Serialize;
use thiserror::Error;

/// Main library error type.
///
/// Only precondition failures surface through `Err`; transport failures
/// during a check are turned into notifications instead.
#[derive(Error, Debug)]
pub enum AutoCheckError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("auto-check element has no attached input")]
    NotConnected,

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),
}

/// Configuration-specific error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing src")]
    MissingSrc,

    #[error("missing csrf")]
    MissingCsrf,

    #[error("Invalid base URL: {url} - {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),

    #[error("JSON parsing error: {0}")]
    JsonParsing(#[from] serde_json::Error),

    #[error("Configuration validation error: {0}")]
    Validation(String),

    #[error("Environment variable error: {0}")]
    Environment(String),

    #[error("Unsupported configuration file format: {0}")]
    UnsupportedFormat(String),
}

/// How a validation request failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    /// The server answered with a non-2xx status.
    Status,
    /// The request never produced a response.
    Network,
    /// The request was superseded or canceled before it settled.
    Aborted,
}

/// Descriptor of a failed validation request.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("validation request failed ({kind:?}) with status {status_code}")]
pub struct TransportError {
    pub status_code: u16,
    pub response_text: String,
    pub content_type: String,
    pub kind: FailureKind,
}

impl TransportError {
    pub fn status(
        status_code: u16,
        response_text: impl Into<String>,
        content_type: impl Into<String>,
    ) -> Self {
        Self {
            status_code,
            response_text: response_text.into(),
            content_type: content_type.into(),
            kind: FailureKind::Status,
        }
    }

    pub fn network(status_code: u16) -> Self {
        Self {
            status_code,
            response_text: String::new(),
            content_type: String::new(),
            kind: FailureKind::Network,
        }
    }

    pub fn aborted() -> Self {
        Self {
            status_code: 0,
            response_text: String::new(),
            content_type: String::new(),
            kind: FailureKind::Aborted,
        }
    }

    pub fn is_aborted(&self) -> bool {
        self.kind == FailureKind::Aborted
    }
}

/// Element registry errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("element name already defined: {0}")]
    AlreadyDefined(String),

    #[error("no element defined for name: {0}")]
    Undefined(String),
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AutoCheckError>;

/// Configuration result type alias
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
