//! Session acquisition and release
//!
//! One browser session per run. The local/remote decision is taken once at
//! run start from the resolved configuration and never re-evaluated per
//! scenario. Release is idempotent and must run on every exit path; the
//! lifecycle layer guarantees the call, this module guarantees the no-op on
//! a second one.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use fantoccini::wd::WebDriverCompatibleCommand;
use fantoccini::{Client, ClientBuilder};
use tokio::net::TcpStream;
use tokio::process::{Child, Command};

use crate::common::config::{BrowserFamily, ExecutionMode, HarnessConfig, RunConfiguration};
use crate::common::{Error, Result};

use super::capabilities::Capabilities;
use super::{BrowserDriver, LogEntry};

/// Where the driver session lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionTarget {
    /// Driver binary started on this machine
    Local {
        driver: String,
        port: u16,
        startup_timeout_secs: u64,
    },
    /// Existing remote endpoint (selenium grid / docker node)
    Remote { host: String, port: String },
}

impl SessionTarget {
    /// Derive the target from the resolved run configuration
    pub fn from_run(
        run: &RunConfiguration,
        harness: &HarnessConfig,
        family: BrowserFamily,
    ) -> Self {
        match run.execution_mode {
            ExecutionMode::Remote => Self::Remote {
                host: run.host.clone(),
                port: run.port.clone(),
            },
            ExecutionMode::Local => Self::Local {
                driver: family.driver_binary().to_string(),
                port: harness.browser.driver_port,
                startup_timeout_secs: harness.browser.startup_timeout_secs,
            },
        }
    }

    /// WebDriver endpoint URL for this target
    pub fn endpoint(&self) -> String {
        match self {
            Self::Local { port, .. } => format!("http://127.0.0.1:{port}"),
            Self::Remote { host, port } => format!("http://{host}:{port}/wd/hub"),
        }
    }
}

/// One live browser-automation connection
///
/// Owns the WebDriver client and, in local mode, the driver process it
/// spawned. Exactly one default session exists per run.
pub struct DriverSession {
    client: Option<Client>,
    driver_process: Option<Child>,
    endpoint: String,
}

/// Acquire a browser session for the run
///
/// Starts the driver binary first when the target is local, then negotiates
/// capabilities. Any failure is logged with full context and propagated; a
/// driver process spawned along the way is reaped before returning.
pub async fn acquire(capabilities: Capabilities, target: &SessionTarget) -> Result<DriverSession> {
    let mut driver_process = None;
    if let SessionTarget::Local {
        driver,
        port,
        startup_timeout_secs,
    } = target
    {
        tracing::info!(driver = %driver, port, "starting local driver");
        match spawn_local_driver(driver, *port, Duration::from_secs(*startup_timeout_secs)).await {
            Ok(child) => driver_process = Some(child),
            Err(e) => {
                tracing::error!(driver = %driver, error = %e, "local driver failed to start");
                return Err(e);
            }
        }
    }

    let endpoint = target.endpoint();
    match ClientBuilder::native()
        .capabilities(capabilities.into_map())
        .connect(&endpoint)
        .await
    {
        Ok(client) => {
            tracing::info!(endpoint = %endpoint, "browser session acquired");
            Ok(DriverSession {
                client: Some(client),
                driver_process,
                endpoint,
            })
        }
        Err(e) => {
            if let Some(mut child) = driver_process {
                let _ = child.start_kill();
                let _ = child.wait().await;
            }
            let err = Error::session_acquisition(&endpoint, e);
            tracing::error!(error = %err, "session acquisition failed");
            Err(err)
        }
    }
}

/// Spawn a driver binary and wait until it accepts connections
async fn spawn_local_driver(driver: &str, port: u16, timeout: Duration) -> Result<Child> {
    let path = which::which(driver).map_err(|_| Error::DriverNotFound(driver.to_string()))?;

    let mut child = Command::new(&path)
        .arg(format!("--port={port}"))
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;

    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if TcpStream::connect(("127.0.0.1", port)).await.is_ok() {
            tracing::debug!(driver = %driver, port, "local driver is ready");
            return Ok(child);
        }
        if tokio::time::Instant::now() >= deadline {
            let _ = child.start_kill();
            let _ = child.wait().await;
            return Err(Error::session_acquisition(
                &format!("127.0.0.1:{port}"),
                format!(
                    "{driver} did not accept connections within {} seconds",
                    timeout.as_secs()
                ),
            ));
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
}

impl DriverSession {
    /// Endpoint this session was negotiated against
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Whether the session is still open
    pub fn is_open(&self) -> bool {
        self.client.is_some()
    }

    /// Release the session
    ///
    /// Idempotent: releasing an already-closed session is a no-op. Close
    /// failures are logged, never propagated, so teardown always completes.
    pub async fn release(&mut self) {
        if let Some(client) = self.client.take() {
            match client.close().await {
                Ok(()) => tracing::debug!(endpoint = %self.endpoint, "browser session released"),
                Err(e) => tracing::warn!(endpoint = %self.endpoint, error = %e, "browser session close failed"),
            }
        }
        if let Some(mut child) = self.driver_process.take() {
            let _ = child.start_kill();
            let _ = child.wait().await;
        }
    }

    fn client_mut(&mut self) -> Result<&mut Client> {
        self.client.as_mut().ok_or(Error::SessionClosed)
    }

    async fn fetch_log(&mut self, log_type: &'static str) -> Result<Vec<LogEntry>> {
        let client = self.client_mut()?;
        let value = client.issue_cmd(GetLog { log_type }).await?;
        Ok(serde_json::from_value(value)?)
    }
}

#[async_trait]
impl BrowserDriver for DriverSession {
    async fn delete_all_cookies(&mut self) -> Result<()> {
        self.client_mut()?.delete_all_cookies().await?;
        Ok(())
    }

    async fn goto(&mut self, url: &str) -> Result<()> {
        self.client_mut()?.goto(url).await?;
        Ok(())
    }

    async fn screenshot_png(&mut self) -> Result<Vec<u8>> {
        Ok(self.client_mut()?.screenshot().await?)
    }

    async fn console_log(&mut self) -> Result<Vec<LogEntry>> {
        self.fetch_log("browser").await
    }

    async fn performance_log(&mut self) -> Result<Vec<LogEntry>> {
        self.fetch_log("performance").await
    }

    async fn quit(&mut self) -> Result<()> {
        self.release().await;
        Ok(())
    }
}

/// Log retrieval command
///
/// The log endpoint is a Selenium extension rather than part of the W3C
/// spec, so it goes through the client's raw-command escape hatch.
#[derive(Debug)]
struct GetLog {
    log_type: &'static str,
}

impl WebDriverCompatibleCommand for GetLog {
    fn endpoint(
        &self,
        base_url: &url::Url,
        session_id: Option<&str>,
    ) -> std::result::Result<url::Url, url::ParseError> {
        base_url.join(&format!("session/{}/log", session_id.unwrap_or("")))
    }

    fn method_and_body(&self, _request_url: &url::Url) -> (http::Method, Option<String>) {
        (
            http::Method::POST,
            Some(serde_json::json!({ "type": self.log_type }).to_string()),
        )
    }
}
