//! # spelunk Utilities
//!
//! Shared utilities, logging, config, and helpers for spelunk.
//!
//! This crate provides common functionality used across the spelunk
//! workspace, chiefly the `tracing`-based logging bootstrap.

pub mod logging;

// Re-export commonly used logging functions for convenience
pub use logging::{init_logging, init_logging_with_level, LogFormat, LogLevel};
pub use tracing::{debug, error, info, trace, warn};
