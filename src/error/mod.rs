use thiserror::Error;

pub mod logging;

pub type Result<T> = std::result::Result<T, Error>;

// Re-export logging types for easy access
pub use logging::QueryLog;

/// Main error type for sqlbridge
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Connection not found: {0}")]
    ConnectionNotFound(String),

    #[error("Database connection error: {0}")]
    Connection(String),

    /// Raised in place of the failure sentinel when the manager is in throw mode
    #[error("Query failed: {message}")]
    QueryFailed { message: String },

    #[error("Operation not supported by {backend}: {operation}")]
    Unsupported { backend: String, operation: String },

    /// Text reported by the database driver or server
    #[error("Database driver error: {0}")]
    Driver(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "config")]
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        match err.as_database_error() {
            Some(db_err) => Self::Driver(db_err.message().to_string()),
            None => Self::Driver(err.to_string()),
        }
    }
}

impl From<tiberius::error::Error> for Error {
    fn from(err: tiberius::error::Error) -> Self {
        match err {
            tiberius::error::Error::Server(token) => Self::Driver(token.message().to_string()),
            other => Self::Driver(other.to_string()),
        }
    }
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn connection_not_found(name: impl Into<String>) -> Self {
        Self::ConnectionNotFound(name.into())
    }

    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    pub fn query_failed(message: impl Into<String>) -> Self {
        Self::QueryFailed {
            message: message.into(),
        }
    }

    pub fn unsupported(backend: impl Into<String>, operation: impl Into<String>) -> Self {
        Self::Unsupported {
            backend: backend.into(),
            operation: operation.into(),
        }
    }

    pub fn driver(msg: impl Into<String>) -> Self {
        Self::Driver(msg.into())
    }

    /// Message suitable for `SqlManager::error`: the raw driver text when there is one
    pub fn backend_message(&self) -> String {
        match self {
            Error::Driver(msg) | Error::Connection(msg) => msg.clone(),
            Error::QueryFailed { message } => message.clone(),
            other => other.to_string(),
        }
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, Error::Unsupported { .. })
    }

    /// Get error code for log lines
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Config(_) => "E_CONFIG",
            Error::ConnectionNotFound(_) => "E_CONNECTION_NOT_FOUND",
            Error::Connection(_) => "E_DB_CONNECTION",
            Error::QueryFailed { .. } => "E_QUERY_FAILED",
            Error::Unsupported { .. } => "E_UNSUPPORTED",
            Error::Driver(_) => "E_DRIVER",
            Error::Json(_) => "E_JSON",
            Error::Io(_) => "E_IO",
            #[cfg(feature = "config")]
            Error::Toml(_) => "E_TOML",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_message_strips_prefix() {
        let err = Error::driver("no such table: missing");
        assert_eq!(err.backend_message(), "no such table: missing");
        assert_eq!(err.to_string(), "Database driver error: no such table: missing");
    }

    #[test]
    fn test_unsupported_display() {
        let err = Error::unsupported("mssql", "data_seek");
        assert!(err.is_unsupported());
        assert_eq!(err.error_code(), "E_UNSUPPORTED");
        assert_eq!(err.to_string(), "Operation not supported by mssql: data_seek");
    }

    #[test]
    fn test_query_failed_carries_message() {
        let err = Error::query_failed("app: date: DO NOT SELECT 1");
        assert!(matches!(err, Error::QueryFailed { .. }));
        assert_eq!(err.backend_message(), "app: date: DO NOT SELECT 1");
    }
}
