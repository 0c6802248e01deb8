/// Cerberus DB Error Module
///
/// This module defines the error types of the data-access layer. Executor
/// failures are always reported as a [`DataAccessError`], which is one of
/// exactly two kinds: a duplicate entry or a generic data operation failure.
/// The low-level reason is kept as a [`FailureCause`] for diagnostics.
use std::time::Duration;

use thiserror::Error;

use super::db::classify::ErrorKind;
use super::message::Message;

/// Low-level reason an executor call failed.
#[derive(Error, Debug)]
pub enum FailureCause {
    /// Error reported by SQLite or by the rusqlite driver
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    /// No pooled connection became available in time
    #[error("no connection available after waiting {timeout:?}: {source}")]
    PoolExhausted {
        timeout: Duration,
        source: r2d2::Error,
    },

    /// The binder left a placeholder without a value
    #[error("parameter {index} of {count} was not bound")]
    UnboundParameter { index: usize, count: usize },
}

impl FailureCause {
    /// Extended SQLite result code, when the cause carries one.
    pub fn sqlite_code(&self) -> Option<i32> {
        match self {
            FailureCause::Sqlite(rusqlite::Error::SqliteFailure(err, _)) => Some(err.extended_code),
            _ => None,
        }
    }
}

/// Classified outcome of a failed executor call.
#[derive(Error, Debug)]
pub enum DataAccessError {
    /// A write was rejected by a uniqueness constraint
    #[error("{}", .message.description)]
    DuplicateEntry {
        message: Message,
        query: String,
        code: Option<i32>,
        #[source]
        source: FailureCause,
    },

    /// Any other failure: malformed SQL, connectivity, driver I/O, mapping
    #[error("{}", .message.description)]
    DataOperation {
        message: Message,
        query: Option<String>,
        #[source]
        source: FailureCause,
    },
}

impl DataAccessError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DataAccessError::DuplicateEntry { .. } => ErrorKind::DuplicateEntry,
            DataAccessError::DataOperation { .. } => ErrorKind::DataOperation,
        }
    }

    pub fn is_duplicate(&self) -> bool {
        self.kind() == ErrorKind::DuplicateEntry
    }

    /// Query text attached for diagnostics, if the executor recorded it.
    pub fn query(&self) -> Option<&str> {
        match self {
            DataAccessError::DuplicateEntry { query, .. } => Some(query),
            DataAccessError::DataOperation { query, .. } => query.as_deref(),
        }
    }

    /// User-facing message built from the matching template.
    pub fn message(&self) -> &Message {
        match self {
            DataAccessError::DuplicateEntry { message, .. } => message,
            DataAccessError::DataOperation { message, .. } => message,
        }
    }

    pub fn cause(&self) -> &FailureCause {
        match self {
            DataAccessError::DuplicateEntry { source, .. } => source,
            DataAccessError::DataOperation { source, .. } => source,
        }
    }
}

/// Crate-level error type.
///
/// Covers everything outside the executors themselves:
/// configuration loading, JSON rendering and the command-line front end.
#[derive(Error, Debug)]
pub enum CerberusError {
    /// Raw SQLite errors outside of an executor call (schema setup, pragmas)
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Classified executor failures
    #[error("Data access error: {0}")]
    DataAccess(#[from] DataAccessError),

    /// Configuration loading and validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// TOML parsing errors
    #[error("Configuration error: {0}")]
    Toml(#[from] toml::de::Error),

    /// File system and I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON rendering errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Command-line usage errors
    #[error("Command error: {0}")]
    Command(String),
}

/// Type alias for Result to use CerberusError as the error type.
pub type Result<T> = std::result::Result<T, CerberusError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::message::MessageGeneral;
    use rusqlite::ffi;

    fn unique_violation() -> rusqlite::Error {
        rusqlite::Error::SqliteFailure(
            ffi::Error::new(ffi::SQLITE_CONSTRAINT_UNIQUE),
            Some("UNIQUE constraint failed: robot.robot".to_string()),
        )
    }

    #[test]
    fn test_sqlite_code_extraction() {
        let cause = FailureCause::Sqlite(unique_violation());
        assert_eq!(cause.sqlite_code(), Some(2067));

        let cause = crate::test_utils::pool_timeout();
        assert_eq!(cause.sqlite_code(), None);
        assert!(cause.to_string().starts_with("no connection available after waiting 10ms"));

        let cause = FailureCause::Sqlite(rusqlite::Error::QueryReturnedNoRows);
        assert_eq!(cause.sqlite_code(), None);
    }

    #[test]
    fn test_data_access_accessors() {
        let err = DataAccessError::DuplicateEntry {
            message: MessageGeneral::DataOperationErrorDuplicate.message(),
            query: "INSERT INTO robot (robot) VALUES (?1)".to_string(),
            code: Some(2067),
            source: FailureCause::Sqlite(unique_violation()),
        };
        assert!(err.is_duplicate());
        assert_eq!(err.kind(), ErrorKind::DuplicateEntry);
        assert_eq!(err.query(), Some("INSERT INTO robot (robot) VALUES (?1)"));
        assert_eq!(err.to_string(), err.message().description);

        let err = DataAccessError::DataOperation {
            message: MessageGeneral::DataOperationError.message(),
            query: None,
            source: FailureCause::UnboundParameter { index: 2, count: 2 },
        };
        assert!(!err.is_duplicate());
        assert_eq!(err.query(), None);
        assert!(std::error::Error::source(&err)
            .map(|s| s.to_string().contains("parameter 2 of 2"))
            .unwrap_or(false));
    }

    #[test]
    fn test_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: CerberusError = io_err.into();
        match err {
            CerberusError::Io(_) => {}
            _ => panic!("Expected IO error"),
        }

        let json_err = serde_json::from_str::<serde_json::Value>("{ invalid json }").unwrap_err();
        let err: CerberusError = json_err.into();
        assert!(err.to_string().contains("JSON error"));
    }
}
