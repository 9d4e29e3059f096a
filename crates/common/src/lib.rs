//! vidmode common utilities
//!
//! Shared infrastructure for all vidmode crates:
//! - Error types, result aliases, and the diagnostic sink
//! - Tracing/logging initialization
//! - Configuration loading

pub mod config;
pub mod error;
pub mod logging;

pub use config::*;
pub use error::*;
