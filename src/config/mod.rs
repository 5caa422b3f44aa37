//! Engine configuration and constants.
//!
//! This module provides:
//! - Configuration constants (timeouts, limits, cache lifetimes)
//! - The programmatic `EngineConfig`
//! - Log option types shared with the CLI

mod constants;
mod types;

// Re-export all constants
pub use constants::*;
pub use types::{DohProvider, EngineConfig, LogFormat, LogLevel};
