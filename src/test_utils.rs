/// # Test Utilities Module
///
/// Shared fixtures for unit tests:
/// - In-memory and temp-file connection pools
/// - A connection provider that keeps an acquire/release ledger
/// - A logger that records what the executors reported

use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rusqlite::Connection;
use tempfile::NamedTempFile;

use crate::config::DatabaseConfig;
use crate::core::db::logger::QueryLogger;
use crate::core::db::pool::{ConnectionProvider, SqlitePool};
use crate::core::error::{DataAccessError, FailureCause};

/// Single-connection pool over a private in-memory database.
pub fn memory_pool() -> SqlitePool {
    SqlitePool::new(DatabaseConfig::new(":memory:"))
}

/// Pool over a fresh temporary database file.
///
/// The file lives as long as the returned `NamedTempFile`.
pub fn file_pool(pool_size: usize) -> (NamedTempFile, SqlitePool) {
    let file = NamedTempFile::new().unwrap();
    let pool = SqlitePool::new(DatabaseConfig {
        pool_size,
        ..DatabaseConfig::new(file.path())
    });
    (file, pool)
}

/// Cause reported when the only connection of a pool is already lent out.
pub fn pool_timeout() -> FailureCause {
    let pool = memory_pool();
    let _held = pool.connect().unwrap();
    match pool.connect_timeout(Duration::from_millis(10)) {
        Err(cause) => cause,
        Ok(_) => panic!("a pool of one lent out two connections"),
    }
}

#[derive(Debug, Default)]
struct Ledger {
    acquired: AtomicUsize,
    released: AtomicUsize,
}

/// Provider wrapper that counts every acquired and released connection.
pub struct TrackingProvider<P> {
    inner: P,
    ledger: Arc<Ledger>,
}

impl<P: ConnectionProvider> TrackingProvider<P> {
    pub fn new(inner: P) -> Self {
        TrackingProvider {
            inner,
            ledger: Arc::new(Ledger::default()),
        }
    }

    pub fn acquired(&self) -> usize {
        self.ledger.acquired.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.ledger.released.load(Ordering::SeqCst)
    }
}

pub struct TrackedHandle<H> {
    handle: H,
    ledger: Arc<Ledger>,
}

impl<H: DerefMut<Target = Connection>> Deref for TrackedHandle<H> {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        &self.handle
    }
}

impl<H: DerefMut<Target = Connection>> DerefMut for TrackedHandle<H> {
    fn deref_mut(&mut self) -> &mut Connection {
        &mut self.handle
    }
}

impl<H> Drop for TrackedHandle<H> {
    fn drop(&mut self) {
        self.ledger.released.fetch_add(1, Ordering::SeqCst);
    }
}

impl<P: ConnectionProvider> ConnectionProvider for TrackingProvider<P> {
    type Handle = TrackedHandle<P::Handle>;

    fn connect(&self) -> Result<Self::Handle, FailureCause> {
        let handle = self.inner.connect()?;
        self.ledger.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(TrackedHandle {
            handle,
            ledger: Arc::clone(&self.ledger),
        })
    }
}

/// Logger recording `sql: ...` and `failure: ...` lines.
#[derive(Debug, Default)]
pub struct RecordingLogger {
    events: Mutex<Vec<String>>,
}

impl RecordingLogger {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl QueryLogger for RecordingLogger {
    fn sql(&self, sql: &str) {
        self.events.lock().unwrap().push(format!("sql: {}", sql));
    }

    fn failure(&self, sql: &str, _error: &DataAccessError) {
        self.events.lock().unwrap().push(format!("failure: {}", sql));
    }
}
