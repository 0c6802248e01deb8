/// Query Logging Module
///
/// Executors report through an injected [`QueryLogger`] rather than a
/// global logger so that callers and tests can capture diagnostics. Logging
/// never influences the outcome of a call.

use std::sync::Arc;

use tracing::debug;

use crate::core::error::DataAccessError;

/// Target used for every SQL diagnostic event.
pub const SQL_TARGET: &str = "cerberus_db::sql";

pub trait QueryLogger {
    /// Called with the raw SQL text before it is executed.
    fn sql(&self, sql: &str);

    /// Called once when an executor call fails.
    fn failure(&self, sql: &str, error: &DataAccessError);
}

/// Logger forwarding to `tracing` at debug level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl QueryLogger for TracingLogger {
    fn sql(&self, sql: &str) {
        debug!(target: SQL_TARGET, "SQL : {}", sql);
    }

    fn failure(&self, sql: &str, error: &DataAccessError) {
        debug!(
            target: SQL_TARGET,
            kind = ?error.kind(),
            cause = %error.cause(),
            "SQL failed : {}",
            sql
        );
    }
}

/// Logger that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentLogger;

impl QueryLogger for SilentLogger {
    fn sql(&self, _sql: &str) {}

    fn failure(&self, _sql: &str, _error: &DataAccessError) {}
}

impl<L: QueryLogger + ?Sized> QueryLogger for &L {
    fn sql(&self, sql: &str) {
        (**self).sql(sql)
    }

    fn failure(&self, sql: &str, error: &DataAccessError) {
        (**self).failure(sql, error)
    }
}

impl<L: QueryLogger + ?Sized> QueryLogger for Arc<L> {
    fn sql(&self, sql: &str) {
        (**self).sql(sql)
    }

    fn failure(&self, sql: &str, error: &DataAccessError) {
        (**self).failure(sql, error)
    }
}
