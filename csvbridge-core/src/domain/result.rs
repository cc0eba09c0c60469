//! Result and error types for the core library

use thiserror::Error;

/// Core library error type
#[derive(Error, Debug)]
pub enum Error {
    /// Raised when the import cannot start because its configuration points
    /// at remote data that cannot be loaded.
    #[error("{0}")]
    Importer(String),

    #[error("API error: {message}")]
    Api {
        status: Option<u16>,
        message: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create an importer error
    pub fn importer(msg: impl Into<String>) -> Self {
        Self::Importer(msg.into())
    }

    /// Create an API error without an HTTP status (transport failures)
    pub fn api(msg: impl Into<String>) -> Self {
        Self::Api {
            status: None,
            message: msg.into(),
        }
    }

    /// Create an API error for a non-success HTTP status
    pub fn api_status(status: u16, msg: impl Into<String>) -> Self {
        Self::Api {
            status: Some(status),
            message: msg.into(),
        }
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// HTTP status of an API error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => *status,
            _ => None,
        }
    }
}

impl From<duckdb::Error> for Error {
    fn from(e: duckdb::Error) -> Self {
        Self::Database(e.to_string())
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_importer_error_message_is_verbatim() {
        let err = Error::importer("Could not load the users currency preference.");
        assert_eq!(err.to_string(), "Could not load the users currency preference.");
    }

    #[test]
    fn test_api_status() {
        assert_eq!(Error::api_status(404, "gone").status(), Some(404));
        assert_eq!(Error::api("timeout").status(), None);
        assert_eq!(Error::validation("x").status(), None);
    }

    #[test]
    fn test_api_error_display() {
        let err = Error::api_status(422, "amount is required");
        assert!(err.to_string().contains("amount is required"));
    }
}
