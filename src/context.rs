//! Per-run, per-feature and per-scenario state
//!
//! Explicit state bags with stated lifetimes: `SelectorTable` is loaded once
//! and read-only for the run, `FeatureContext` is reset at the start of each
//! feature, `ScenarioContext` is created fresh for every scenario and
//! discarded when it ends.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde_json::Value;

use crate::common::{Error, Result};

/// Port for which the root URL omits the port segment
pub const DEFAULT_HTTP_PORT: &str = "80";

/// Build the pre-scenario navigation target
///
/// `http://host:port`, with the port segment omitted when the port is the
/// implicit default.
pub fn root_url(host: &str, port: &str) -> String {
    if port == DEFAULT_HTTP_PORT {
        format!("http://{host}")
    } else {
        format!("http://{host}:{port}")
    }
}

/// Mutable per-scenario state
///
/// Created fresh at scenario start; `vars` and `created_users` are empty
/// until the first step runs.
#[derive(Debug, Default)]
pub struct ScenarioContext {
    /// Step-to-step variable bag
    pub vars: HashMap<String, Value>,
    /// Identifiers of resources created during the scenario that need cleanup
    pub created_users: Vec<String>,
}

impl ScenarioContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serialize the variable bag for attachment to the report
    ///
    /// Values are stringified and keys sorted so the snapshot is stable.
    pub fn snapshot_json(&self) -> Result<Vec<u8>> {
        let snapshot: BTreeMap<&str, String> = self
            .vars
            .iter()
            .map(|(key, value)| {
                let rendered = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (key.as_str(), rendered)
            })
            .collect();
        Ok(serde_json::to_vec_pretty(&snapshot)?)
    }
}

/// Mutable per-feature state, outliving scenarios but narrower than the run
#[derive(Debug, Default)]
pub struct FeatureContext {
    pub feature_vars: HashMap<String, Value>,
}

impl FeatureContext {
    /// Clear the bag at a feature boundary
    pub fn reset(&mut self) {
        self.feature_vars.clear();
    }
}

/// Immutable logical-name to locator mapping
///
/// Loaded once from the declarative selector source before any scenario
/// runs; read-only for the remainder of the run.
#[derive(Debug, Clone, Default)]
pub struct SelectorTable {
    entries: HashMap<String, String>,
}

impl SelectorTable {
    /// Load the table from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| Error::selector_load(path, e))?;
        let entries: HashMap<String, String> =
            serde_yaml::from_str(&text).map_err(|e| Error::selector_load(path, e))?;
        tracing::info!(count = entries.len(), path = %path.display(), "loaded selectors");
        Ok(Self { entries })
    }

    /// Locator for a logical element name
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_root_url_omits_default_port() {
        assert_eq!(root_url("example.com", "80"), "http://example.com");
    }

    #[test]
    fn test_root_url_keeps_explicit_port() {
        assert_eq!(root_url("example.com", "8080"), "http://example.com:8080");
    }

    #[test]
    fn test_fresh_scenario_context_is_empty() {
        let ctx = ScenarioContext::new();
        assert!(ctx.vars.is_empty());
        assert!(ctx.created_users.is_empty());
    }

    #[test]
    fn test_snapshot_stringifies_values() {
        let mut ctx = ScenarioContext::new();
        ctx.vars.insert("user".to_string(), json!("alice"));
        ctx.vars.insert("attempts".to_string(), json!(3));

        let snapshot = ctx.snapshot_json().unwrap();
        let parsed: BTreeMap<String, String> = serde_json::from_slice(&snapshot).unwrap();
        assert_eq!(parsed["user"], "alice");
        assert_eq!(parsed["attempts"], "3");
    }

    #[test]
    fn test_feature_context_reset_clears_vars() {
        let mut feature = FeatureContext::default();
        feature.feature_vars.insert("seed".to_string(), json!(42));
        feature.reset();
        assert!(feature.feature_vars.is_empty());
    }

    #[test]
    fn test_selector_table_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("selectors.yaml");
        std::fs::write(&path, "login_button: \"#login\"\nuser_field: \"input[name=user]\"\n")
            .unwrap();

        let table = SelectorTable::load(&path).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.get("login_button"), Some("#login"));
        assert_eq!(table.get("missing"), None);
    }

    #[test]
    fn test_selector_table_missing_file_is_an_error() {
        let err = SelectorTable::load(Path::new("/nonexistent/selectors.yaml")).unwrap_err();
        assert!(matches!(err, Error::SelectorLoad { .. }));
    }
}
