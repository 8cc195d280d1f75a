//! Error types for broker operations.
//!
//! Components never turn an error into a response themselves. Errors
//! propagate with `?` up to [`Broker::process`](crate::broker::Broker::process),
//! which hands them to the configured error callback.

/// Error type for spapi operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    // Auth errors
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Token expired")]
    TokenExpired,

    // Request errors
    #[error("Invalid request body: {0}")]
    Decode(String),

    // Invocation errors
    #[error("Procedure not found: {0}")]
    ProcedureNotFound(String),

    #[error("Procedure {procedure} timed out after {seconds}s")]
    Timeout { procedure: String, seconds: u64 },

    // Config errors
    #[error("Configuration error: {0}")]
    Config(String),

    // System errors
    #[error("Invalid address: {0}")]
    AddrParse(#[from] std::net::AddrParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] libsql::Error),

    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether the error was caused by the caller's input rather than the
    /// server or database.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::Unauthorized | Error::TokenExpired | Error::Decode(_)
        )
    }
}

/// Result type alias using spapi's Error.
pub type Result<T> = std::result::Result<T, Error>;
