// Core infrastructure modules
pub mod core;

// Feature-specific modules
pub mod config;
pub mod storage;

#[cfg(test)]
pub(crate) mod test_utils;
