/// Core Module for Cerberus DB
///
/// This module contains the data-access core: the request executors and
/// their connection provider, error classification, and the error and
/// message types every caller sees.

pub mod db;
pub mod error;
pub mod message;

// Re-export commonly used types for convenience
pub use error::{CerberusError, DataAccessError, FailureCause, Result};
pub use message::{Message, MessageGeneral, MessageStatus};
