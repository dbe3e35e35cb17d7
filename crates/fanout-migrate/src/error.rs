//! Error types for the migration library.

use thiserror::Error;

/// Main error type for migration operations.
#[derive(Error, Debug)]
pub enum MigrateError {
    /// Configuration error (invalid YAML, missing fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// A store connection could not be established. Fatal for the whole run.
    #[error("Connection to {store} failed: {message}")]
    Connection { store: String, message: String },

    /// Reading a table from the source failed (metadata or a malformed row).
    #[error("Read failed for table {table}: {message}")]
    TableRead { table: String, message: String },

    /// The column-family destination schema could not be synthesized or created.
    #[error("Schema creation failed for table {table}: {message}")]
    SchemaSynthesis { table: String, message: String },

    /// A single record could not be written to a destination.
    #[error("Write failed for table {table}: {message}")]
    RecordWrite { table: String, message: String },

    /// A destination handle rejected a request.
    #[error("Store error: {0}")]
    Store(String),

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Migration was cancelled (SIGINT, etc.)
    #[error("Migration cancelled")]
    Cancelled,
}

impl MigrateError {
    /// Create a Connection error for the named store.
    pub fn connection(store: impl Into<String>, message: impl std::fmt::Display) -> Self {
        MigrateError::Connection {
            store: store.into(),
            message: message.to_string(),
        }
    }

    /// Create a TableRead error.
    pub fn table_read(table: impl Into<String>, message: impl std::fmt::Display) -> Self {
        MigrateError::TableRead {
            table: table.into(),
            message: message.to_string(),
        }
    }

    /// Create a SchemaSynthesis error.
    pub fn schema_synthesis(table: impl Into<String>, message: impl std::fmt::Display) -> Self {
        MigrateError::SchemaSynthesis {
            table: table.into(),
            message: message.to_string(),
        }
    }

    /// Create a RecordWrite error.
    pub fn record_write(table: impl Into<String>, message: impl std::fmt::Display) -> Self {
        MigrateError::RecordWrite {
            table: table.into(),
            message: message.to_string(),
        }
    }

    /// Create a Store error from anything displayable.
    pub fn store(message: impl std::fmt::Display) -> Self {
        MigrateError::Store(message.to_string())
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            MigrateError::Config(_) | MigrateError::Yaml(_) => 2,
            MigrateError::Connection { .. } => 3,
            MigrateError::Cancelled => 130,
            _ => 1,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        // Add error chain for wrapped errors
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

/// Result type alias for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors_carry_table_name() {
        let err = MigrateError::table_read("users", "malformed row");
        assert_eq!(err.to_string(), "Read failed for table users: malformed row");

        let err = MigrateError::schema_synthesis("orders", "no primary key");
        assert!(err.to_string().contains("orders"));
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(MigrateError::Config("x".into()).exit_code(), 2);
        assert_eq!(MigrateError::connection("mysql", "refused").exit_code(), 3);
        assert_eq!(MigrateError::Cancelled.exit_code(), 130);
        assert_eq!(MigrateError::store("boom").exit_code(), 1);
    }

    #[test]
    fn test_format_detailed_includes_cause() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err = MigrateError::from(io);
        let detailed = err.format_detailed();
        assert!(detailed.starts_with("Error: IO error: missing"));
    }
}
