//! Error types for the consultation engine.

use thiserror::Error;

/// Result type alias using the engine's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the consultation engine.
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Admission Errors
    // =========================================================================
    #[error("Rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Invalid request: {0}")]
    Validation(String),

    // =========================================================================
    // Model Resolution Errors
    // =========================================================================
    /// Never surfaced by the orchestrator; unknown ids degrade to
    /// auto-selection.
    #[error("Model not found: {0}")]
    ModelNotFound(String),

    // =========================================================================
    // Upstream Errors
    // =========================================================================
    #[error("Upstream error: {message}")]
    Upstream {
        message: String,
        status: Option<u16>,
    },

    #[error("Circuit breaker open: {0}")]
    CircuitOpen(String),

    // =========================================================================
    // Generic Errors
    // =========================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create an upstream error without a status code (network, timeout).
    pub fn upstream(msg: impl Into<String>) -> Self {
        Self::Upstream {
            message: msg.into(),
            status: None,
        }
    }

    /// Create an upstream error carrying an HTTP status code.
    pub fn upstream_status(msg: impl Into<String>, status: u16) -> Self {
        Self::Upstream {
            message: msg.into(),
            status: Some(status),
        }
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether a retry of the same upstream call may succeed.
    ///
    /// Only network-level failures and 5xx responses qualify.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Upstream { status: None, .. } => true,
            Self::Upstream {
                status: Some(code), ..
            } => (500..600).contains(code),
            _ => false,
        }
    }

    /// Stable machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::RateLimited { .. } => "RATE_LIMITED",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::ModelNotFound(_) => "MODEL_NOT_FOUND",
            Self::Upstream { .. } => "UPSTREAM_ERROR",
            Self::CircuitOpen(_) => "CIRCUIT_OPEN",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}
