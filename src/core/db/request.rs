/// Request Execution Module
///
/// This module provides the three generic executors every data-access object
/// is built on: a single-row query, a list query and an update. Each call
/// borrows one connection from the provider, prepares the statement, lets
/// the caller bind parameters and map rows, and releases the cursor, the
/// statement and the connection (in that order) before returning.
///
/// Failures are reported as a [`DataAccessError`]. Only updates are
/// classified; reads always fail as a generic data operation error.

use rusqlite::types::ValueRef;
use rusqlite::Row;
use serde_json::{Map, Number, Value as JsonValue};

use super::binder::{self, Bindings};
use super::classify::{ErrorClassifier, ErrorKind};
use super::logger::{QueryLogger, TracingLogger};
use super::pool::ConnectionProvider;
use crate::core::error::{DataAccessError, FailureCause};
use crate::core::message::MessageGeneral;

/// Executes parameterized SQL requests against a connection provider.
#[derive(Debug, Clone)]
pub struct RequestExecutor<P, L = TracingLogger> {
    provider: P,
    classifier: ErrorClassifier,
    logger: L,
}

impl<P: ConnectionProvider> RequestExecutor<P, TracingLogger> {
    /// Creates an executor with the default classifier, logging via `tracing`.
    pub fn new(provider: P) -> Self {
        RequestExecutor {
            provider,
            classifier: ErrorClassifier::default(),
            logger: TracingLogger,
        }
    }
}

impl<P: ConnectionProvider, L: QueryLogger> RequestExecutor<P, L> {
    /// Replaces the logger.
    pub fn with_logger<M: QueryLogger>(self, logger: M) -> RequestExecutor<P, M> {
        RequestExecutor {
            provider: self.provider,
            classifier: self.classifier,
            logger,
        }
    }

    /// Replaces the error classifier used by [`execute_update`](Self::execute_update).
    pub fn with_classifier(mut self, classifier: ErrorClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn classifier(&self) -> &ErrorClassifier {
        &self.classifier
    }

    pub fn logger(&self) -> &L {
        &self.logger
    }

    /// Runs a read and maps its first row.
    ///
    /// Returns `Ok(None)` when the query matches nothing. Rows after the
    /// first one are never fetched.
    ///
    /// # Errors
    ///
    /// Any failure, including one raised by `bind` or `map`, is returned as
    /// [`DataAccessError::DataOperation`] without the query text.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use cerberus_db::config::DatabaseConfig;
    /// use cerberus_db::core::db::{RequestExecutor, SqlitePool};
    ///
    /// let executor = RequestExecutor::new(SqlitePool::new(DatabaseConfig::new("cerberus.db")));
    /// let host: Option<String> = executor.execute_query(
    ///     "SELECT host FROM robot WHERE robotID = ?1",
    ///     |b| b.bind(1, 7),
    ///     |row| row.get(0),
    /// )?;
    /// # Ok::<(), cerberus_db::core::DataAccessError>(())
    /// ```
    pub fn execute_query<T, B, M>(&self, sql: &str, bind: B, map: M) -> Result<Option<T>, DataAccessError>
    where
        B: FnOnce(&mut Bindings<'_, '_>) -> rusqlite::Result<()>,
        M: FnOnce(&Row<'_>) -> rusqlite::Result<T>,
    {
        self.logger.sql(sql);
        self.query_first(sql, bind, map).map_err(|source| {
            let error = DataAccessError::DataOperation {
                message: MessageGeneral::DataOperationError.message(),
                query: None,
                source,
            };
            self.logger.failure(sql, &error);
            error
        })
    }

    /// Runs a read and maps every row, in cursor order.
    ///
    /// Zero matching rows yield an empty vector.
    ///
    /// # Errors
    ///
    /// Any failure is returned as [`DataAccessError::DataOperation`] carrying
    /// the query text.
    pub fn execute_query_list<T, B, M>(&self, sql: &str, bind: B, map: M) -> Result<Vec<T>, DataAccessError>
    where
        B: FnOnce(&mut Bindings<'_, '_>) -> rusqlite::Result<()>,
        M: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        self.logger.sql(sql);
        self.query_all(sql, bind, map).map_err(|source| {
            let error = DataAccessError::DataOperation {
                message: MessageGeneral::DataOperationErrorWithRequest
                    .message()
                    .resolve("REQUEST", sql),
                query: Some(sql.to_string()),
                source,
            };
            self.logger.failure(sql, &error);
            error
        })
    }

    /// Runs a write (insert, update, delete) and returns the affected row count.
    ///
    /// # Errors
    ///
    /// A failure the classifier recognizes as a duplicate key is returned as
    /// [`DataAccessError::DuplicateEntry`]; anything else as
    /// [`DataAccessError::DataOperation`]. Both carry the query text.
    pub fn execute_update<B>(&self, sql: &str, bind: B) -> Result<usize, DataAccessError>
    where
        B: FnOnce(&mut Bindings<'_, '_>) -> rusqlite::Result<()>,
    {
        self.logger.sql(sql);
        self.update(sql, bind).map_err(|source| {
            let error = self.classify_update_failure(sql, source);
            self.logger.failure(sql, &error);
            error
        })
    }

    fn query_first<T, B, M>(&self, sql: &str, bind: B, map: M) -> Result<Option<T>, FailureCause>
    where
        B: FnOnce(&mut Bindings<'_, '_>) -> rusqlite::Result<()>,
        M: FnOnce(&Row<'_>) -> rusqlite::Result<T>,
    {
        let conn = self.provider.connect()?;
        let mut stmt = conn.prepare(sql)?;
        binder::apply(&mut stmt, bind)?;

        let mut rows = stmt.raw_query();
        let first = match rows.next()? {
            Some(row) => Some(map(row)?),
            None => None,
        };
        Ok(first)
    }

    fn query_all<T, B, M>(&self, sql: &str, bind: B, mut map: M) -> Result<Vec<T>, FailureCause>
    where
        B: FnOnce(&mut Bindings<'_, '_>) -> rusqlite::Result<()>,
        M: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        let conn = self.provider.connect()?;
        let mut stmt = conn.prepare(sql)?;
        binder::apply(&mut stmt, bind)?;

        let mut rows = stmt.raw_query();
        let mut result = Vec::new();
        while let Some(row) = rows.next()? {
            result.push(map(row)?);
        }
        Ok(result)
    }

    fn update<B>(&self, sql: &str, bind: B) -> Result<usize, FailureCause>
    where
        B: FnOnce(&mut Bindings<'_, '_>) -> rusqlite::Result<()>,
    {
        let conn = self.provider.connect()?;
        let mut stmt = conn.prepare(sql)?;
        binder::apply(&mut stmt, bind)?;
        Ok(stmt.raw_execute()?)
    }

    fn classify_update_failure(&self, sql: &str, source: FailureCause) -> DataAccessError {
        let operation = StatementType::from_sql(sql).as_str();
        match self.classifier.classify(&source) {
            ErrorKind::DuplicateEntry => DataAccessError::DuplicateEntry {
                message: MessageGeneral::DataOperationErrorDuplicate
                    .message()
                    .resolve_with(|name| match name {
                        "ITEM" => Some(sql.to_string()),
                        "OPERATION" => Some(operation.to_string()),
                        _ => None,
                    }),
                query: sql.to_string(),
                code: source.sqlite_code(),
                source,
            },
            ErrorKind::DataOperation => {
                let reason = source.to_string();
                DataAccessError::DataOperation {
                    message: MessageGeneral::DataOperationErrorItem
                        .message()
                        .resolve_with(|name| match name {
                            "ITEM" => Some(sql.to_string()),
                            "OPERATION" => Some(operation.to_string()),
                            "REASON" => Some(reason.clone()),
                            _ => None,
                        }),
                    query: Some(sql.to_string()),
                    source,
                }
            }
        }
    }
}

/// Runs [`RequestExecutor::execute_query`] with a default executor over `provider`.
pub fn execute_query<P, T, B, M>(provider: &P, sql: &str, bind: B, map: M) -> Result<Option<T>, DataAccessError>
where
    P: ConnectionProvider,
    B: FnOnce(&mut Bindings<'_, '_>) -> rusqlite::Result<()>,
    M: FnOnce(&Row<'_>) -> rusqlite::Result<T>,
{
    RequestExecutor::new(provider).execute_query(sql, bind, map)
}

/// Runs [`RequestExecutor::execute_query_list`] with a default executor over `provider`.
pub fn execute_query_list<P, T, B, M>(provider: &P, sql: &str, bind: B, map: M) -> Result<Vec<T>, DataAccessError>
where
    P: ConnectionProvider,
    B: FnOnce(&mut Bindings<'_, '_>) -> rusqlite::Result<()>,
    M: FnMut(&Row<'_>) -> rusqlite::Result<T>,
{
    RequestExecutor::new(provider).execute_query_list(sql, bind, map)
}

/// Runs [`RequestExecutor::execute_update`] with a default executor over `provider`.
pub fn execute_update<P, B>(provider: &P, sql: &str, bind: B) -> Result<usize, DataAccessError>
where
    P: ConnectionProvider,
    B: FnOnce(&mut Bindings<'_, '_>) -> rusqlite::Result<()>,
{
    RequestExecutor::new(provider).execute_update(sql, bind)
}

/// Row mapper producing a JSON object keyed by column name.
pub fn row_to_json(row: &Row<'_>) -> rusqlite::Result<JsonValue> {
    let stmt: &rusqlite::Statement<'_> = row.as_ref();
    let mut object = Map::new();
    for index in 0..stmt.column_count() {
        let name = stmt.column_name(index)?.to_string();
        object.insert(name, value_to_json(row.get_ref(index)?));
    }
    Ok(JsonValue::Object(object))
}

/// Converts a SQLite value to JSON. Blobs are summarized, not encoded.
fn value_to_json(value: ValueRef<'_>) -> JsonValue {
    match value {
        ValueRef::Null => JsonValue::Null,
        ValueRef::Integer(i) => JsonValue::from(i),
        ValueRef::Real(f) => Number::from_f64(f).map(JsonValue::Number).unwrap_or(JsonValue::Null),
        ValueRef::Text(t) => JsonValue::String(String::from_utf8_lossy(t).to_string()),
        ValueRef::Blob(b) => JsonValue::String(format!("<BLOB: {} bytes>", b.len())),
    }
}

/// Represents different SQL statement types for introspection
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StatementType {
    /// SELECT statement
    Select,
    /// INSERT statement
    Insert,
    /// UPDATE statement
    Update,
    /// DELETE statement
    Delete,
    /// REPLACE statement
    Replace,
    /// CREATE statement
    Create,
    /// DROP statement
    Drop,
    /// ALTER statement
    Alter,
    /// Other statement types
    Other,
}

impl StatementType {
    /// Determines the statement type from the leading keyword of `sql`.
    ///
    /// Comments and opening parentheses are skipped. A `WITH` clause is
    /// resolved to the statement following its common table expressions.
    pub fn from_sql(sql: &str) -> Self {
        let words = keywords(sql);
        let (depth, first) = match words.first() {
            Some((depth, word)) => (*depth, word.as_str()),
            None => return StatementType::Other,
        };

        if first == "WITH" {
            return words
                .iter()
                .skip(1)
                .filter(|(word_depth, _)| *word_depth == depth)
                .find_map(|(_, word)| StatementType::from_keyword(word).filter(|kind| kind.is_dml()))
                .unwrap_or(StatementType::Select);
        }
        StatementType::from_keyword(first).unwrap_or(StatementType::Other)
    }

    fn is_dml(self) -> bool {
        matches!(
            self,
            StatementType::Select
                | StatementType::Insert
                | StatementType::Update
                | StatementType::Delete
                | StatementType::Replace
        )
    }

    fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "SELECT" | "VALUES" => Some(StatementType::Select),
            "INSERT" => Some(StatementType::Insert),
            "UPDATE" => Some(StatementType::Update),
            "DELETE" => Some(StatementType::Delete),
            "REPLACE" => Some(StatementType::Replace),
            "CREATE" => Some(StatementType::Create),
            "DROP" => Some(StatementType::Drop),
            "ALTER" => Some(StatementType::Alter),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StatementType::Select => "SELECT",
            StatementType::Insert => "INSERT",
            StatementType::Update => "UPDATE",
            StatementType::Delete => "DELETE",
            StatementType::Replace => "REPLACE",
            StatementType::Create => "CREATE",
            StatementType::Drop => "DROP",
            StatementType::Alter => "ALTER",
            StatementType::Other => "EXECUTE",
        }
    }
}

/// Upper-cased words of `sql` paired with their parenthesis depth.
///
/// Comments and quoted literals or identifiers are skipped.
fn keywords(sql: &str) -> Vec<(usize, String)> {
    let mut words = Vec::new();
    let mut depth = 0usize;
    let mut word = String::new();
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        if c.is_alphanumeric() || c == '_' {
            word.push(c.to_ascii_uppercase());
            continue;
        }
        if !word.is_empty() {
            words.push((depth, std::mem::take(&mut word)));
        }
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            '-' if chars.peek() == Some(&'-') => {
                for skipped in chars.by_ref() {
                    if skipped == '\n' {
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut previous = ' ';
                for skipped in chars.by_ref() {
                    if previous == '*' && skipped == '/' {
                        break;
                    }
                    previous = skipped;
                }
            }
            '\'' | '"' | '`' => {
                for skipped in chars.by_ref() {
                    if skipped == c {
                        break;
                    }
                }
            }
            '[' => {
                for skipped in chars.by_ref() {
                    if skipped == ']' {
                        break;
                    }
                }
            }
            _ => {}
        }
    }
    if !word.is_empty() {
        words.push((depth, word));
    }
    words
}
