/// Connection Provider Module
///
/// Executors borrow a connection for the length of one call through the
/// [`ConnectionProvider`] trait. [`SqlitePool`] is the provider used in
/// production: an r2d2 pool of SQLite connections shared between threads.

use std::fmt;
use std::ops::DerefMut;
use std::time::Duration;

use r2d2::{HandleError, ManageConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use tracing::{debug, warn};

use crate::config::DatabaseConfig;
use crate::core::error::FailureCause;

/// Source of database connections for executor calls.
///
/// The handle releases the connection when dropped.
pub trait ConnectionProvider {
    type Handle: DerefMut<Target = Connection>;

    /// Acquires a connection, blocking while none is available.
    fn connect(&self) -> Result<Self::Handle, FailureCause>;
}

impl<P: ConnectionProvider + ?Sized> ConnectionProvider for &P {
    type Handle = P::Handle;

    fn connect(&self) -> Result<Self::Handle, FailureCause> {
        (**self).connect()
    }
}

/// Opens SQLite connections with the configured pragmas.
///
/// A connection handed back while still inside a transaction counts as
/// broken, so r2d2 closes it instead of lending it out again.
pub struct SqliteManager {
    sqlite: SqliteConnectionManager,
}

impl SqliteManager {
    fn new(config: &DatabaseConfig) -> Self {
        let busy_timeout = config.busy_timeout();
        let foreign_keys = config.foreign_keys;
        let path = config.path.clone();
        let sqlite = SqliteConnectionManager::file(&config.path).with_init(move |conn| {
            conn.busy_timeout(busy_timeout)?;
            conn.pragma_update(None, "foreign_keys", foreign_keys)?;
            debug!("Opened connection to {:?}", path);
            Ok(())
        });
        SqliteManager { sqlite }
    }
}

impl ManageConnection for SqliteManager {
    type Connection = Connection;
    type Error = rusqlite::Error;

    fn connect(&self) -> Result<Connection, rusqlite::Error> {
        self.sqlite.connect()
    }

    fn is_valid(&self, conn: &mut Connection) -> Result<(), rusqlite::Error> {
        self.sqlite.is_valid(conn)
    }

    fn has_broken(&self, conn: &mut Connection) -> bool {
        if conn.is_autocommit() {
            return false;
        }
        warn!("Discarding pooled connection returned inside a transaction");
        true
    }
}

/// Reports failed connection attempts through `tracing`.
#[derive(Debug)]
struct TracingErrorHandler;

impl HandleError<rusqlite::Error> for TracingErrorHandler {
    fn handle_error(&self, error: rusqlite::Error) {
        warn!("Failed to open pooled connection: {}", error);
    }
}

/// A connection lent out by [`SqlitePool`], returned on drop.
pub type PooledConnection = r2d2::PooledConnection<SqliteManager>;

/// Bounded, thread-safe pool of SQLite connections.
///
/// Connections are opened lazily up to the configured size. An in-memory
/// database is always served by a single connection that is never reaped,
/// since every new in-memory connection would see a different, empty database.
#[derive(Clone)]
pub struct SqlitePool {
    pool: r2d2::Pool<SqliteManager>,
    config: DatabaseConfig,
}

impl fmt::Debug for SqlitePool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqlitePool")
            .field("path", &self.config.path)
            .field("max_size", &self.max_size())
            .finish()
    }
}

impl SqlitePool {
    pub fn new(config: DatabaseConfig) -> Self {
        let max_size = if config.is_in_memory() {
            1
        } else {
            u32::try_from(config.pool_size.max(1)).unwrap_or(u32::MAX)
        };

        let mut builder = r2d2::Pool::<SqliteManager>::builder()
            .max_size(max_size)
            .min_idle(Some(0))
            .error_handler(Box::new(TracingErrorHandler));
        if config.is_in_memory() {
            builder = builder.idle_timeout(None).max_lifetime(None);
        }

        SqlitePool {
            pool: builder.build_unchecked(SqliteManager::new(&config)),
            config,
        }
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    pub fn max_size(&self) -> usize {
        self.pool.max_size() as usize
    }

    /// Connections alive in the pool, idle or lent out.
    pub fn open_count(&self) -> usize {
        self.pool.state().connections as usize
    }

    /// Connections waiting to be lent out.
    pub fn idle_count(&self) -> usize {
        self.pool.state().idle_connections as usize
    }

    /// Acquires a connection, waiting at most `timeout` for one to become free.
    pub fn connect_timeout(&self, timeout: Duration) -> Result<PooledConnection, FailureCause> {
        self.pool.get_timeout(timeout).map_err(|source| {
            warn!("No pooled connection after {:?}: {}", timeout, source);
            FailureCause::PoolExhausted { timeout, source }
        })
    }
}

impl ConnectionProvider for SqlitePool {
    type Handle = PooledConnection;

    fn connect(&self) -> Result<PooledConnection, FailureCause> {
        self.connect_timeout(self.config.acquire_timeout())
    }
}
