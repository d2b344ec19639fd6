//! Failure-triggered diagnostic capture
//!
//! Runs unconditionally after every scenario. The variable snapshot is
//! attached for every outcome; screenshot, console log and (when enabled)
//! the network event log are attached only for failed scenarios. Each
//! attachment runs inside its own failure boundary so a broken capture
//! never aborts report generation for the remaining scenarios.

use std::fs;
use std::path::PathBuf;

use serde::Serialize;

use crate::common::Result;
use crate::context::ScenarioContext;
use crate::driver::BrowserDriver;
use crate::lifecycle::ScenarioStatus;

/// Content type of an attachment, used by the reporting collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentKind {
    /// Structured text
    Json,
    /// Image
    Png,
}

impl AttachmentKind {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Png => "png",
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Png => "image/png",
        }
    }
}

/// One diagnostic artifact bound for the report
#[derive(Debug, Clone)]
pub struct Attachment {
    pub name: String,
    pub kind: AttachmentKind,
    pub body: Vec<u8>,
}

/// Destination for diagnostic artifacts (the reporting collaborator seam)
pub trait AttachmentSink {
    /// Persist one attachment for a scenario
    fn attach(&mut self, scenario: &str, attachment: Attachment) -> Result<()>;
}

/// Sink that writes attachments as files under a report folder
pub struct DirectorySink {
    dir: PathBuf,
    sequence: u32,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            sequence: 0,
        }
    }
}

impl AttachmentSink for DirectorySink {
    fn attach(&mut self, scenario: &str, attachment: Attachment) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        self.sequence += 1;
        let file = self.dir.join(format!(
            "{}-{:03}-{}.{}",
            sanitize(scenario),
            self.sequence,
            sanitize(&attachment.name),
            attachment.kind.extension()
        ));
        fs::write(&file, &attachment.body)?;
        tracing::debug!(path = %file.display(), "attachment written");
        Ok(())
    }
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect()
}

/// Outcome of one scenario's diagnostic capture
#[derive(Debug, Default)]
pub struct CaptureReport {
    /// Attachments successfully handed to the sink
    pub attached: usize,
    /// Per-attachment failures, logged and collected but never propagated
    pub failures: Vec<String>,
}

impl CaptureReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Capture diagnostics after a scenario completes
///
/// Ordering: the variable snapshot is attached before any failure-only
/// artifact. Never returns an error; failures end up in the report.
pub async fn capture_scenario_end(
    driver: &mut dyn BrowserDriver,
    ctx: &ScenarioContext,
    scenario: &str,
    status: ScenarioStatus,
    capture_network_logs: bool,
    sink: &mut dyn AttachmentSink,
) -> CaptureReport {
    let mut report = CaptureReport::default();

    match ctx.snapshot_json() {
        Ok(body) => record(
            sink,
            scenario,
            Attachment {
                name: "context-variables".to_string(),
                kind: AttachmentKind::Json,
                body,
            },
            &mut report,
        ),
        Err(e) => note_failure(&mut report, scenario, "context-variables", &e),
    }

    if status != ScenarioStatus::Failed {
        return report;
    }

    match driver.screenshot_png().await {
        Ok(body) => record(
            sink,
            scenario,
            Attachment {
                name: scenario.to_string(),
                kind: AttachmentKind::Png,
                body,
            },
            &mut report,
        ),
        Err(e) => note_failure(&mut report, scenario, "screenshot", &e),
    }

    match driver.console_log().await {
        Ok(entries) => attach_json(sink, scenario, "browser-console-log", &entries, &mut report),
        Err(e) => note_failure(&mut report, scenario, "browser-console-log", &e),
    }

    if capture_network_logs {
        match driver.performance_log().await {
            Ok(entries) => {
                attach_json(sink, scenario, "network-events-log", &entries, &mut report)
            }
            Err(e) => note_failure(&mut report, scenario, "network-events-log", &e),
        }
    }

    tracing::debug!(
        scenario = %scenario,
        attached = report.attached,
        failures = report.failures.len(),
        "scenario diagnostics captured"
    );
    report
}

fn attach_json<T: Serialize>(
    sink: &mut dyn AttachmentSink,
    scenario: &str,
    name: &str,
    value: &T,
    report: &mut CaptureReport,
) {
    match serde_json::to_vec_pretty(value) {
        Ok(body) => record(
            sink,
            scenario,
            Attachment {
                name: name.to_string(),
                kind: AttachmentKind::Json,
                body,
            },
            report,
        ),
        Err(e) => note_failure(report, scenario, name, &e),
    }
}

fn record(
    sink: &mut dyn AttachmentSink,
    scenario: &str,
    attachment: Attachment,
    report: &mut CaptureReport,
) {
    let label = attachment.name.clone();
    match sink.attach(scenario, attachment) {
        Ok(()) => report.attached += 1,
        Err(e) => note_failure(report, scenario, &label, &e),
    }
}

fn note_failure(
    report: &mut CaptureReport,
    scenario: &str,
    what: &str,
    err: &dyn std::fmt::Display,
) {
    tracing::warn!(scenario = %scenario, attachment = %what, error = %err, "diagnostic attachment failed");
    report.failures.push(format!("{what}: {err}"));
}
