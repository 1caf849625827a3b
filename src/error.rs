//! Error types for the Buddy conversation core

use thiserror::Error;

/// Result type alias for Buddy operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the conversation core
#[derive(Debug, Error)]
pub enum Error {
    /// Missing or out-of-range input
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Session or other reference is absent or expired
    #[error("not found: {0}")]
    NotFound(String),

    /// Wake word listener is already running
    #[error("already active: {0}")]
    AlreadyActive(String),

    /// Wake word listener is not running
    #[error("not active: {0}")]
    NotActive(String),

    /// External dependency unconfigured or failing
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Unexpected internal condition
    #[error("internal error: {0}")]
    Internal(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Stable error kind exposed to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidArgument,
    NotFound,
    AlreadyActive,
    NotActive,
    ServiceUnavailable,
    Internal,
}

impl ErrorKind {
    /// Stable string form for wire payloads
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidArgument => "invalid_argument",
            Self::NotFound => "not_found",
            Self::AlreadyActive => "already_active",
            Self::NotActive => "not_active",
            Self::ServiceUnavailable => "service_unavailable",
            Self::Internal => "internal",
        }
    }
}

impl Error {
    /// Classify this error into its stable kind
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::AlreadyActive(_) => ErrorKind::AlreadyActive,
            Self::NotActive(_) => ErrorKind::NotActive,
            Self::ServiceUnavailable(_) | Self::Http(_) => ErrorKind::ServiceUnavailable,
            Self::Internal(_)
            | Self::Config(_)
            | Self::Io(_)
            | Self::Serialization(_)
            | Self::Toml(_) => ErrorKind::Internal,
        }
    }

    /// HTTP status code for the transport layer sitting above this crate
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self.kind() {
            ErrorKind::InvalidArgument => 400,
            ErrorKind::NotFound => 404,
            ErrorKind::AlreadyActive | ErrorKind::NotActive => 409,
            ErrorKind::ServiceUnavailable => 503,
            ErrorKind::Internal => 500,
        }
    }
}
