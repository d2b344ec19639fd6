//! Run and harness configuration
//!
//! Two layers: `RunConfiguration` is resolved once from the environment at
//! startup and is immutable afterwards; `HarnessConfig` holds collaborator
//! knobs from an optional `harness.toml` at the project root.

use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

use super::{Error, Result};

/// Where the browser engine runs, decided once at run start
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Driver binary started on this machine
    Local,
    /// Existing remote endpoint (selenium grid / docker node)
    Remote,
}

impl std::fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Remote => write!(f, "remote"),
        }
    }
}

/// Browser-engine family for capability negotiation
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum BrowserFamily {
    #[default]
    Chrome,
    Firefox,
}

impl BrowserFamily {
    /// Name sent in the `browserName` capability
    pub fn browser_name(&self) -> &'static str {
        match self {
            Self::Chrome => "chrome",
            Self::Firefox => "firefox",
        }
    }

    /// Driver binary started in local mode
    pub fn driver_binary(&self) -> &'static str {
        match self {
            Self::Chrome => "chromedriver",
            Self::Firefox => "geckodriver",
        }
    }

    /// Map a `SELENIUM_DRIVER_NAME` value to a family
    pub fn from_node_name(name: &str) -> Option<Self> {
        match name {
            "firefoxnode" => Some(Self::Firefox),
            "chromenode" | "chrome" => Some(Self::Chrome),
            _ => None,
        }
    }
}

/// Immutable per-run configuration resolved from the environment
///
/// Every downstream component reads from this value instead of re-querying
/// environment state.
#[derive(Debug, Clone)]
pub struct RunConfiguration {
    pub execution_mode: ExecutionMode,
    /// Host of the application under test (and of the remote grid)
    pub host: String,
    /// Port of the application under test, kept as given
    pub port: String,
    /// Optional engine-node selector (`SELENIUM_DRIVER_NAME`)
    pub driver_name: Option<String>,
    /// Raw tag filter expression
    pub tags: String,
    /// Report directory, relative to the project root
    pub reports_dir: PathBuf,
    pub verbose: bool,
    /// Ordered feature-file paths as given, before existence filtering
    pub feature_order: Vec<String>,
    /// Hardware identifier stamped onto report records
    pub hardware: String,
    pub is_localhost: bool,
    /// Gates performance/network log capture on failure
    pub capture_network_logs: bool,
}

impl RunConfiguration {
    /// Resolve the configuration from the process environment
    ///
    /// Fails fast with `Error::MissingEnv` on any absent required value,
    /// before any session is created.
    pub fn from_env() -> Result<Self> {
        Self::resolve(|name| env::var(name).ok())
    }

    /// Resolve from an arbitrary lookup (the seam used by tests)
    pub fn resolve(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let execution_mode = match lookup("ENVIRONMENT").as_deref() {
            Some("docker") => ExecutionMode::Remote,
            _ => ExecutionMode::Local,
        };

        Ok(Self {
            execution_mode,
            host: required(&lookup, "SELENIUM_TARGET_HOST")?,
            port: required(&lookup, "SELENIUM_TARGET_PORT")?,
            driver_name: lookup("SELENIUM_DRIVER_NAME"),
            tags: required(&lookup, "TAGS")?,
            reports_dir: PathBuf::from(required(&lookup, "REPORTS")?),
            verbose: lookup("VERBOSE").map(|v| is_truthy(&v)).unwrap_or(false),
            feature_order: required(&lookup, "FEATURE_ORDER")?
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
            hardware: required(&lookup, "HARDWARE")?,
            is_localhost: is_truthy(&required(&lookup, "IS_LOCALHOST")?),
            capture_network_logs: lookup("BROWSER_NETWORK_LOGS")
                .map(|v| is_truthy(&v))
                .unwrap_or(false),
        })
    }

    /// Execution-locality label stamped onto report records
    pub fn locality(&self) -> &'static str {
        if self.is_localhost {
            "Localhost"
        } else {
            "Remotehost"
        }
    }
}

/// Load `.env` from the working directory into the process environment
///
/// Returns the path that was loaded, `None` if no file exists. Variables
/// already present in the environment keep their values.
pub fn load_dotenv() -> Option<PathBuf> {
    match dotenvy::dotenv() {
        Ok(path) => Some(path),
        Err(e) if e.not_found() => None,
        Err(e) => {
            eprintln!("Warning: failed to load .env: {e}");
            None
        }
    }
}

fn required(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Result<String> {
    match lookup(name) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(Error::MissingEnv(name.to_string())),
    }
}

/// Interpret a boolean-ish environment value
pub fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}

/// Main harness configuration structure (`harness.toml`)
#[derive(Debug, Deserialize, Default)]
pub struct HarnessConfig {
    /// Test-execution engine settings
    #[serde(default)]
    pub engine: EngineConfig,

    /// Browser settings
    #[serde(default)]
    pub browser: BrowserConfig,

    /// Selector source settings
    #[serde(default)]
    pub selectors: SelectorConfig,
}

/// Test-execution engine settings
#[derive(Debug, Deserialize, Clone)]
pub struct EngineConfig {
    /// Engine command to invoke
    #[serde(default = "default_engine_command")]
    pub command: String,

    /// Report formatter passed to the engine
    #[serde(default = "default_formatter")]
    pub formatter: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            command: default_engine_command(),
            formatter: default_formatter(),
        }
    }
}

fn default_engine_command() -> String {
    "behave".to_string()
}

fn default_formatter() -> String {
    "allure_behave.formatter:AllureFormatter".to_string()
}

/// Browser settings
#[derive(Debug, Deserialize, Clone)]
pub struct BrowserConfig {
    /// Browser-engine family used when no node selector is set
    #[serde(default)]
    pub family: BrowserFamily,

    /// Download directory negotiated into the capabilities
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,

    /// Port for a locally started driver binary
    #[serde(default = "default_driver_port")]
    pub driver_port: u16,

    /// Seconds to wait for a locally started driver to accept connections
    #[serde(default = "default_startup_timeout")]
    pub startup_timeout_secs: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            family: BrowserFamily::default(),
            download_dir: default_download_dir(),
            driver_port: default_driver_port(),
            startup_timeout_secs: default_startup_timeout(),
        }
    }
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("/tmp")
}

fn default_driver_port() -> u16 {
    9515
}

fn default_startup_timeout() -> u64 {
    10
}

/// Selector source settings
#[derive(Debug, Deserialize, Clone)]
pub struct SelectorConfig {
    /// Selector file path, relative to the project root
    #[serde(default = "default_selector_path")]
    pub path: PathBuf,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            path: default_selector_path(),
        }
    }
}

fn default_selector_path() -> PathBuf {
    PathBuf::from("config/selectors.yaml")
}

impl HarnessConfig {
    /// Load configuration from `harness.toml` under the project root
    ///
    /// Returns default configuration if the file doesn't exist
    pub fn load(project_root: &Path) -> Result<Self> {
        let path = project_root.join("harness.toml");
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        toml::from_str(&content).map_err(|e| Error::ConfigParse(e.to_string()))
    }
}
