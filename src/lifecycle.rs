//! Test lifecycle orchestration
//!
//! `RunContext` is the state machine the engine binding drives: session
//! acquired once before any scenario, per-feature and per-scenario resets,
//! diagnostics after every scenario, release exactly once at run end. The
//! release happens on every exit path, including setup failures after the
//! session already exists.

use std::collections::HashMap;
use std::path::Path;

use crate::common::config::{BrowserFamily, HarnessConfig, RunConfiguration};
use crate::common::Result;
use crate::context::{root_url, FeatureContext, ScenarioContext, SelectorTable};
use crate::diagnostics::{capture_scenario_end, AttachmentSink, CaptureReport};
use crate::driver::capabilities::Capabilities;
use crate::driver::provision::{self, DriverSession, SessionTarget};
use crate::driver::BrowserDriver;

/// Name of the session every scenario acts on
pub const DEFAULT_SESSION: &str = "default";

/// Terminal status of a scenario as reported by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioStatus {
    Passed,
    Failed,
    Skipped,
}

impl ScenarioStatus {
    pub fn is_failed(&self) -> bool {
        *self == Self::Failed
    }
}

impl std::fmt::Display for ScenarioStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Passed => write!(f, "passed"),
            Self::Failed => write!(f, "failed"),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}

/// Run-scoped state: the default driver session, the selector table and the
/// current feature's variable bag
///
/// Generic over the driver seam; production code always runs it over
/// [`DriverSession`].
pub struct RunContext<D: BrowserDriver = DriverSession> {
    session: D,
    /// Additional named sessions for multi-browser scenarios
    named_sessions: HashMap<String, D>,
    selectors: SelectorTable,
    feature: FeatureContext,
    root_url: String,
    capture_network_logs: bool,
}

impl RunContext {
    /// Run the before-all phase: acquire the session, load the selectors
    ///
    /// If selector loading fails after the session exists, the session is
    /// released before the error propagates; nothing leaks.
    pub async fn start(
        run: &RunConfiguration,
        harness: &HarnessConfig,
        project_root: &Path,
    ) -> Result<Self> {
        let family = run
            .driver_name
            .as_deref()
            .and_then(BrowserFamily::from_node_name)
            .unwrap_or(harness.browser.family);
        let capabilities = Capabilities::build(family, &harness.browser.download_dir);
        let target = SessionTarget::from_run(run, harness, family);

        let mut session = provision::acquire(capabilities, &target).await?;

        let selector_path = project_root.join(&harness.selectors.path);
        let selectors = match SelectorTable::load(&selector_path) {
            Ok(table) => table,
            Err(e) => {
                session.release().await;
                return Err(e);
            }
        };

        tracing::info!("driver is ready and selectors are loaded");
        Ok(Self {
            session,
            named_sessions: HashMap::new(),
            selectors,
            feature: FeatureContext::default(),
            root_url: root_url(&run.host, &run.port),
            capture_network_logs: run.capture_network_logs,
        })
    }
}

impl<D: BrowserDriver> RunContext<D> {
    #[cfg(test)]
    fn over_driver(session: D, root_url: &str) -> Self {
        Self {
            session,
            named_sessions: HashMap::new(),
            selectors: SelectorTable::default(),
            feature: FeatureContext::default(),
            root_url: root_url.to_string(),
            capture_network_logs: false,
        }
    }

    /// Selector table, read-only for the whole run
    pub fn selectors(&self) -> &SelectorTable {
        &self.selectors
    }

    /// Root navigation target every scenario starts from
    pub fn root_url(&self) -> &str {
        &self.root_url
    }

    /// The default driver session
    pub fn session_mut(&mut self) -> &mut D {
        &mut self.session
    }

    /// Register an extra named session; it is released with the run
    pub fn add_session(&mut self, name: impl Into<String>, session: D) {
        self.named_sessions.insert(name.into(), session);
    }

    pub fn named_session_mut(&mut self, name: &str) -> Option<&mut D> {
        self.named_sessions.get_mut(name)
    }

    /// Feature variable bag, reset at each feature boundary
    pub fn feature_vars(&mut self) -> &mut FeatureContext {
        &mut self.feature
    }

    /// Run the before-feature phase
    pub fn begin_feature(&mut self) {
        self.feature.reset();
    }

    /// Run the before-scenario phase
    ///
    /// Never conditionally skipped; a dirty starting state would invalidate
    /// every assertion that follows, so failures here are fatal for the
    /// scenario.
    pub async fn begin_scenario(&mut self) -> Result<ScenarioContext> {
        reset_scenario(&mut self.session, &self.root_url).await
    }

    /// Run the after-scenario phase: diagnostics for every outcome
    pub async fn end_scenario(
        &mut self,
        ctx: &ScenarioContext,
        scenario: &str,
        status: ScenarioStatus,
        sink: &mut dyn AttachmentSink,
    ) -> CaptureReport {
        capture_scenario_end(
            &mut self.session,
            ctx,
            scenario,
            status,
            self.capture_network_logs,
            sink,
        )
        .await
    }

    /// Release every session; safe to call after partial failures
    ///
    /// Release failures are logged, never propagated, so teardown always
    /// completes.
    pub async fn finish(mut self) {
        if let Err(e) = self.session.quit().await {
            tracing::warn!(error = %e, "default session release failed");
        }
        for (name, mut session) in self.named_sessions.drain() {
            tracing::debug!(session = %name, "releasing named session");
            if let Err(e) = session.quit().await {
                tracing::warn!(session = %name, error = %e, "named session release failed");
            }
        }
    }
}

/// Reset browser state to the pre-scenario baseline
///
/// Deletes all cookies on the active session, then navigates to the root
/// URL. Returns the fresh, empty scenario context.
pub async fn reset_scenario(
    driver: &mut dyn BrowserDriver,
    root_url: &str,
) -> Result<ScenarioContext> {
    driver.delete_all_cookies().await?;
    driver.goto(root_url).await?;
    tracing::debug!(url = %root_url, "connected to the root url");
    Ok(ScenarioContext::new())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::common::Error;
    use crate::driver::mock::MockBrowser;

    #[tokio::test]
    async fn test_reset_scenario_clears_cookies_and_navigates() {
        let mut driver = MockBrowser::default();
        let ctx = reset_scenario(&mut driver, "http://example.com").await.unwrap();

        assert_eq!(driver.cookies_cleared, 1);
        assert_eq!(driver.visited, vec!["http://example.com"]);
        assert!(ctx.vars.is_empty());
        assert!(ctx.created_users.is_empty());
    }

    #[tokio::test]
    async fn test_reset_scenario_propagates_navigation_failure() {
        let mut driver = MockBrowser {
            fail_navigation: true,
            ..MockBrowser::default()
        };
        let err = reset_scenario(&mut driver, "http://example.com").await.unwrap_err();
        assert!(matches!(err, Error::DriverCommand(_)));
    }

    #[tokio::test]
    async fn test_session_quit_once_even_after_step_failure() {
        // Simulates an engine binding: the scenario raises mid-step, but the
        // run teardown still releases the browser exactly once.
        let driver = MockBrowser::default();
        let quits = driver.quit_calls.clone();
        let mut run = RunContext::over_driver(driver, "http://example.com");

        let scenario: Result<()> = async {
            let _ctx = run.begin_scenario().await?;
            Err(Error::DriverCommand("element not found".to_string()))
        }
        .await;
        assert!(scenario.is_err());

        run.finish().await;
        assert_eq!(quits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_finish_releases_named_sessions_too() {
        let mut run = RunContext::over_driver(MockBrowser::default(), "http://example.com");
        let second = MockBrowser::default();
        let second_quits = second.quit_calls.clone();
        run.add_session("admin", second);

        run.finish().await;
        assert_eq!(second_quits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_scenario_status_display() {
        assert_eq!(ScenarioStatus::Failed.to_string(), "failed");
        assert!(ScenarioStatus::Failed.is_failed());
        assert!(!ScenarioStatus::Passed.is_failed());
    }
}
