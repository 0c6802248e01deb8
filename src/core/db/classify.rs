/// Error Classification Module
///
/// Maps the error code reported by SQLite to the semantic kind callers
/// branch on. This is the only place that knows database-specific codes.

use std::collections::HashMap;

use rusqlite::ffi;

use crate::core::error::FailureCause;

/// Semantic kinds a failed data operation can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A uniqueness constraint rejected the write
    DuplicateEntry,
    /// Anything else
    DataOperation,
}

/// Extended SQLite result codes reported for duplicate keys.
pub const DEFAULT_DUPLICATE_CODES: [i32; 2] = [
    ffi::SQLITE_CONSTRAINT_UNIQUE,
    ffi::SQLITE_CONSTRAINT_PRIMARYKEY,
];

/// Lookup table from extended result code to [`ErrorKind`].
///
/// Codes missing from the table classify as [`ErrorKind::DataOperation`].
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorClassifier {
    rules: HashMap<i32, ErrorKind>,
}

impl Default for ErrorClassifier {
    fn default() -> Self {
        ErrorClassifier::from_codes(DEFAULT_DUPLICATE_CODES)
    }
}

impl ErrorClassifier {
    /// A classifier with no rules; every failure is a data operation error.
    pub fn empty() -> Self {
        ErrorClassifier {
            rules: HashMap::new(),
        }
    }

    /// A classifier treating each of `codes` as a duplicate entry.
    pub fn from_codes<I>(codes: I) -> Self
    where
        I: IntoIterator<Item = i32>,
    {
        ErrorClassifier {
            rules: codes
                .into_iter()
                .map(|code| (code, ErrorKind::DuplicateEntry))
                .collect(),
        }
    }

    pub fn with_rule(mut self, code: i32, kind: ErrorKind) -> Self {
        self.rules.insert(code, kind);
        self
    }

    pub fn classify_code(&self, code: i32) -> ErrorKind {
        self.rules
            .get(&code)
            .copied()
            .unwrap_or(ErrorKind::DataOperation)
    }

    pub fn classify(&self, cause: &FailureCause) -> ErrorKind {
        cause
            .sqlite_code()
            .map(|code| self.classify_code(code))
            .unwrap_or(ErrorKind::DataOperation)
    }
}
