/// Database Module
///
/// This module provides the generic data-access layer of Cerberus,
/// organized into focused submodules.
///
/// ## Architecture
///
/// - **Connection Provider** (`pool.rs`): lends connections for the length of one call
/// - **Binding** (`binder.rs`): caller-supplied parameter binding, checked for completeness
/// - **Request Execution** (`request.rs`): single-row query, list query and update executors
/// - **Error Classification** (`classify.rs`): maps SQLite error codes to error kinds
/// - **Logging** (`logger.rs`): injected diagnostics for executed SQL
///
/// ## Error Handling
///
/// Executors return `DataAccessError`, which is either a duplicate entry
/// or a generic data operation failure. The driver error stays reachable
/// through `std::error::Error::source`.
pub mod binder;
pub mod classify;
pub mod logger;
pub mod pool;
pub mod request;

pub use binder::{no_params, Bindings};
pub use classify::{ErrorClassifier, ErrorKind};
pub use logger::{QueryLogger, SilentLogger, TracingLogger};
pub use pool::{ConnectionProvider, PooledConnection, SqlitePool};
pub use request::*;
