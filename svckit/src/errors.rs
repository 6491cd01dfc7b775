use thiserror::Error;

#[derive(Error, Debug)]
pub enum DataError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Read error on {table} ({operation}): {message}")]
    ReadError {
        table: String,
        operation: &'static str,
        message: String,
    },

    #[error("Write error on {table} ({operation}): {message}")]
    WriteError {
        table: String,
        operation: &'static str,
        message: String,
    },

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Decode error: {0}")]
    DecodeError(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("Session already closed")]
    AlreadyClosed,
}

impl DataError {
    pub fn read(table: &str, operation: &'static str, err: impl std::fmt::Display) -> Self {
        DataError::ReadError {
            table: table.to_string(),
            operation,
            message: err.to_string(),
        }
    }

    pub fn write(table: &str, operation: &'static str, err: impl std::fmt::Display) -> Self {
        DataError::WriteError {
            table: table.to_string(),
            operation,
            message: err.to_string(),
        }
    }

    /// Startup failures that must abort the process
    pub fn is_fatal(&self) -> bool {
        matches!(self, DataError::ConfigError(_) | DataError::ConnectionError(_))
    }
}

impl From<scylla::transport::errors::QueryError> for DataError {
    fn from(err: scylla::transport::errors::QueryError) -> Self {
        DataError::DatabaseError(err.to_string())
    }
}

impl From<scylla::transport::errors::NewSessionError> for DataError {
    fn from(err: scylla::transport::errors::NewSessionError) -> Self {
        DataError::ConnectionError(err.to_string())
    }
}
