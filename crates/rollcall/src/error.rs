//! Error types for rollcall.
//!
//! Scan results, unparseable locations and skipped import rows are ordinary
//! values, not errors. This type covers the surrounding machinery: storage,
//! configuration, files and serialization, plus lookups and confirmation
//! checks made on behalf of the command line.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for rollcall operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    /// A stored row could not be turned back into a record.
    #[error("corrupt record in {table}: {message}")]
    CorruptRecord {
        /// Table the row came from.
        table: &'static str,
        /// Description of the problem.
        message: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Lookup Errors ===
    /// No participant has the given id.
    #[error("participant {id} not found")]
    ParticipantNotFound {
        /// The id that was looked up.
        id: u64,
    },

    /// No event has the given id.
    #[error("event {id} not found")]
    EventNotFound {
        /// The id that was looked up.
        id: i64,
    },

    /// A destructive operation was attempted without confirmation.
    #[error("{operation} requires confirmation (pass --yes)")]
    ConfirmationRequired {
        /// Name of the operation.
        operation: &'static str,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to read an input file.
    #[error("failed to read {path}: {source}")]
    FileRead {
        /// Path that couldn't be read.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to write an output file.
    #[error("failed to write {path}: {source}")]
    FileWrite {
        /// Path that couldn't be written.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV serialization failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// A specialized Result type for rollcall operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a corrupt record error.
    #[must_use]
    pub fn corrupt_record(table: &'static str, message: impl Into<String>) -> Self {
        Self::CorruptRecord {
            table,
            message: message.into(),
        }
    }

    /// Check if this error is a failed lookup.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::ParticipantNotFound { .. } | Self::EventNotFound { .. }
        )
    }

    /// Check if this error asks the caller to confirm.
    #[must_use]
    pub fn is_confirmation_required(&self) -> bool {
        matches!(self, Self::ConfirmationRequired { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::ParticipantNotFound { id: 7 };
        assert_eq!(err.to_string(), "participant 7 not found");

        let err = Error::EventNotFound { id: 3 };
        assert_eq!(err.to_string(), "event 3 not found");
    }

    #[test]
    fn test_error_is_not_found() {
        assert!(Error::ParticipantNotFound { id: 1 }.is_not_found());
        assert!(Error::EventNotFound { id: 1 }.is_not_found());
        assert!(!Error::ConfirmationRequired { operation: "reset" }.is_not_found());
    }

    #[test]
    fn test_confirmation_required_display() {
        let err = Error::ConfirmationRequired { operation: "clear" };
        assert!(err.is_confirmation_required());
        assert_eq!(err.to_string(), "clear requires confirmation (pass --yes)");
    }

    #[test]
    fn test_corrupt_record_display() {
        let err = Error::corrupt_record("participants", "unknown status: present");
        let msg = err.to_string();
        assert!(msg.contains("participants"));
        assert!(msg.contains("present"));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_from_rusqlite_error() {
        let result = rusqlite::Connection::open_with_flags(
            "/nonexistent/path/db.sqlite",
            rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY,
        );
        if let Err(sqlite_err) = result {
            let err: Error = sqlite_err.into();
            assert!(matches!(err, Error::DatabaseQuery(_)));
        }
    }

    #[test]
    fn test_from_json_error() {
        let json_result: std::result::Result<i32, serde_json::Error> =
            serde_json::from_str("not valid json");
        if let Err(json_err) = json_result {
            let err: Error = json_err.into();
            assert!(matches!(err, Error::Json(_)));
        }
    }

    #[test]
    fn test_database_migration_error_display() {
        let err = Error::DatabaseMigration {
            message: "version mismatch".to_string(),
        };
        assert!(err.to_string().contains("version mismatch"));
    }

    #[test]
    fn test_config_validation_error_display() {
        let err = Error::ConfigValidation {
            message: "invalid padding".to_string(),
        };
        assert!(err.to_string().contains("invalid padding"));
    }

    #[test]
    fn test_file_read_error_display() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err = Error::FileRead {
            path: PathBuf::from("/tmp/people.csv"),
            source: io_err,
        };
        assert!(err.to_string().contains("/tmp/people.csv"));
    }

    #[test]
    fn test_directory_create_error_display() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err = Error::DirectoryCreate {
            path: PathBuf::from("/root/forbidden"),
            source: io_err,
        };
        assert!(err.to_string().contains("/root/forbidden"));
    }
}
