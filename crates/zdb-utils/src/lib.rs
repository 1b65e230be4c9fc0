//! # zdb Utilities
//!
//! Shared utilities and logging for zdb.
//!
//! This crate provides the logging setup used by the `zdb` command-line
//! tool, built on `tracing`. Library crates only emit events; installing a
//! subscriber is left to binaries.

pub mod logging;

// Re-export commonly used logging functions for convenience
pub use logging::{
    default_log_file, init_logging, init_logging_file_only, init_logging_with_level, LogFormat, LogLevel, LoggingError,
    LoggingGuard,
};
pub use tracing::{debug, error, info, trace, warn};
