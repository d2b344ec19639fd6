//! Browser driver session management
//!
//! `BrowserDriver` is the seam to the browser-automation protocol client;
//! the rest of the harness only ever talks to the trait. `DriverSession`
//! (see [`provision`]) is the production implementation over a WebDriver
//! endpoint.

pub mod capabilities;
pub mod provision;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::common::Result;

pub use capabilities::Capabilities;
pub use provision::{acquire, DriverSession, SessionTarget};

/// One entry from a browser console or performance log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    #[serde(default)]
    pub level: String,
    pub message: String,
    #[serde(default)]
    pub timestamp: i64,
}

/// Operations the harness needs from a live browser session
#[async_trait]
pub trait BrowserDriver: Send {
    /// Delete all cookies in the active browser profile
    async fn delete_all_cookies(&mut self) -> Result<()>;

    /// Navigate to a URL
    async fn goto(&mut self, url: &str) -> Result<()>;

    /// Capture a PNG screenshot of the current page
    async fn screenshot_png(&mut self) -> Result<Vec<u8>>;

    /// Fetch the browser console log
    async fn console_log(&mut self) -> Result<Vec<LogEntry>>;

    /// Fetch the performance/network event log
    async fn performance_log(&mut self) -> Result<Vec<LogEntry>>;

    /// End the session
    async fn quit(&mut self) -> Result<()>;
}
