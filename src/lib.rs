//! Browser acceptance-test harness
//!
//! Provisions a browser driver session for a run, resets per-scenario state,
//! captures diagnostic artifacts on failure and post-processes the engine's
//! report records with run metadata.

pub mod cli;
pub mod commands;
pub mod common;
pub mod context;
pub mod diagnostics;
pub mod driver;
pub mod engine;
pub mod lifecycle;
pub mod report;

// Re-export commonly used types for tests
pub use common::{Error, Result};
pub use lifecycle::{RunContext, ScenarioStatus};
