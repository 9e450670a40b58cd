//! Error taxonomy shared by every connection.
//!
//! Validation failures (`UnknownAction`, `InvalidParameters`) are raised before
//! any platform call is attempted. Platform and transport failures are passed
//! through unchanged; the dispatcher never retries or rewrites them.

use thiserror::Error;

/// Errors produced by the action registry, the dispatcher, and the adapters.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// The requested action is not registered on the connection.
    #[error("Unknown action: {0}")]
    UnknownAction(String),

    /// One or more declared parameters failed validation. Every violation
    /// found is listed, in parameter declaration order.
    #[error("Invalid parameters: {}", .0.join(", "))]
    InvalidParameters(Vec<String>),

    /// An action definition is malformed (empty or duplicate parameter names).
    #[error("Invalid action definition: {0}")]
    InvalidActionSpec(String),

    /// Connection configuration or credentials are missing or malformed.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The platform answered with a non-success outcome.
    #[error("Platform API error ({status}): {message}")]
    PlatformApi { status: u16, message: String },

    /// A registered action has no operation behind it.
    #[error("Internal routing error: {0}")]
    InternalRouting(String),

    /// The request never produced a platform response (DNS, TLS, timeout...).
    #[error("Transport error: {0}")]
    Transport(String),

    /// Reading or writing the credential store failed.
    #[error("Credential store error: {0}")]
    Credential(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConnectionError {
    /// Whether the error was raised by request validation, i.e. before any
    /// platform call could have happened.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ConnectionError::UnknownAction(_) | ConnectionError::InvalidParameters(_)
        )
    }

    /// Build a `PlatformApi` error from a status code and response text.
    pub fn platform(status: u16, message: impl Into<String>) -> Self {
        ConnectionError::PlatformApi {
            status,
            message: message.into(),
        }
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, ConnectionError>;
