//! Error types for the sync library.

use thiserror::Error;

/// Exit code for a run that completed successfully.
pub const EXIT_SUCCESS: u8 = 0;
/// Exit code for configuration problems and malformed requests.
pub const EXIT_CONFIG_ERROR: u8 = 1;
/// Exit code when a connection could not be established.
pub const EXIT_CONNECTION_ERROR: u8 = 2;
/// Exit code when one or more tables failed to sync.
pub const EXIT_TRANSFER_ERROR: u8 = 4;
/// Exit code for filesystem errors.
pub const EXIT_IO_ERROR: u8 = 7;

/// Main error type for sync operations.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Configuration error (missing environment variable, invalid registry, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// A table name that is not part of the registry.
    #[error("Unknown table: {name} (available: {available})")]
    UnknownTable { name: String, available: String },

    /// Source database driver error
    #[error("Source database error: {0}")]
    Source(#[from] tiberius::error::Error),

    /// Destination database driver error
    #[error("Destination database error: {0}")]
    Destination(#[from] tokio_postgres::Error),

    /// Connection could not be opened
    #[error("{side} connection failed: {message}")]
    Connection { side: &'static str, message: String },

    /// Read query failed after the source connection was established
    #[error("Extraction failed for {table}: {message}")]
    Extraction { table: String, message: String },

    /// Truncate, insert or commit failed on the destination
    #[error("Load failed for {table}: {message}")]
    Load { table: String, message: String },

    /// A driver call did not return within its configured timeout
    #[error("{operation} timed out after {seconds}s")]
    Timeout { operation: String, seconds: u64 },

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SyncError {
    /// Create a Connection error for one side of the sync.
    pub fn connection(side: &'static str, message: impl Into<String>) -> Self {
        SyncError::Connection {
            side,
            message: message.into(),
        }
    }

    /// Create an Extraction error.
    pub fn extraction(table: impl Into<String>, message: impl Into<String>) -> Self {
        SyncError::Extraction {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Create a Load error.
    pub fn load(table: impl Into<String>, message: impl Into<String>) -> Self {
        SyncError::Load {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Create a Timeout error.
    pub fn timeout(operation: impl Into<String>, seconds: u64) -> Self {
        SyncError::Timeout {
            operation: operation.into(),
            seconds,
        }
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            SyncError::Config(_) | SyncError::UnknownTable { .. } | SyncError::Yaml(_) => {
                EXIT_CONFIG_ERROR
            }
            SyncError::Connection { .. } | SyncError::Timeout { .. } => EXIT_CONNECTION_ERROR,
            SyncError::Io(_) => EXIT_IO_ERROR,
            _ => EXIT_TRANSFER_ERROR,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(SyncError::Config("x".into()).exit_code(), EXIT_CONFIG_ERROR);
        assert_eq!(
            SyncError::UnknownTable {
                name: "a".into(),
                available: "b".into()
            }
            .exit_code(),
            EXIT_CONFIG_ERROR
        );
        assert_eq!(
            SyncError::connection("source", "refused").exit_code(),
            EXIT_CONNECTION_ERROR
        );
        assert_eq!(
            SyncError::load("t", "boom").exit_code(),
            EXIT_TRANSFER_ERROR
        );
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        assert_eq!(SyncError::from(io).exit_code(), EXIT_IO_ERROR);
    }

    #[test]
    fn test_connection_message_keeps_driver_text() {
        let err = SyncError::connection("source", "Login failed for user 'sa'.");
        assert_eq!(
            err.to_string(),
            "source connection failed: Login failed for user 'sa'."
        );
    }

    #[test]
    fn test_format_detailed_includes_chain() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "registry.yaml");
        let err = SyncError::from(io);
        let detailed = err.format_detailed();
        assert!(detailed.starts_with("Error: IO error: registry.yaml"));
    }
}
