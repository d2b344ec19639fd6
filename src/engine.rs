//! Test-execution engine invocation
//!
//! Composes the engine's argument set from the resolved run configuration
//! (feature order, formatter, report destination, tag filter) and runs the
//! engine synchronously. The engine owns scenario execution and drives the
//! lifecycle hooks through its harness binding; this module only starts it
//! and reports its exit code.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use colored::Colorize;
use tokio::process::Command as TokioCommand;

use crate::common::config::EngineConfig;
use crate::common::{Error, Result};

/// A parsed tag filter: AND-groups of OR-terms
///
/// Whitespace separates AND-groups, commas separate the OR-terms inside a
/// group: `"@smoke,@fast @regression"` selects scenarios tagged
/// (smoke or fast) and regression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagExpression {
    pub ands: Vec<Vec<String>>,
}

impl TagExpression {
    /// Parse a raw tag expression
    pub fn parse(raw: &str) -> Self {
        let ands = raw
            .split_whitespace()
            .map(|group| {
                group
                    .split(',')
                    .filter(|term| !term.is_empty())
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .filter(|group| !group.is_empty())
            .collect();
        Self { ands }
    }

    /// One `--tags=` clause per AND-group, OR-terms comma-joined
    pub fn engine_args(&self) -> Vec<String> {
        self.ands
            .iter()
            .map(|group| format!("--tags={}", group.join(",")))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.ands.is_empty()
    }
}

impl std::fmt::Display for TagExpression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.engine_args().join(" "))
    }
}

/// Filter the ordered feature list down to paths that exist
///
/// Entries that do not exist under `root` are silently dropped; the relative
/// order of the remaining entries is preserved.
pub fn resolve_feature_order(root: &Path, entries: &[String]) -> Vec<PathBuf> {
    entries
        .iter()
        .map(|entry| entry.trim())
        .filter(|entry| !entry.is_empty())
        .filter(|entry| root.join(entry).exists())
        .map(PathBuf::from)
        .collect()
}

/// Fully composed engine command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineInvocation {
    pub command: String,
    pub args: Vec<String>,
}

impl EngineInvocation {
    /// Compose the argument set for one run
    pub fn compose(
        engine: &EngineConfig,
        features: &[PathBuf],
        reports: &Path,
        tags: &TagExpression,
        verbose: bool,
    ) -> Self {
        let mut args: Vec<String> = features
            .iter()
            .map(|feature| feature.display().to_string())
            .collect();
        args.push("-f".to_string());
        args.push(engine.formatter.clone());
        args.push("-o".to_string());
        args.push(reports.display().to_string());
        args.push("--no-skipped".to_string());
        args.push("-f".to_string());
        args.push("plain".to_string());
        if verbose {
            args.push("--verbose".to_string());
        }
        args.extend(tags.engine_args());

        Self {
            command: engine.command.clone(),
            args,
        }
    }
}

/// Invoke the engine and wait for completion
///
/// Stdout and stderr are inherited so scenario output streams through. The
/// harness process later exits with the code returned here.
pub async fn run_engine(invocation: &EngineInvocation, root: &Path) -> Result<i32> {
    tracing::info!(
        command = %invocation.command,
        args = ?invocation.args,
        "starting test-execution engine"
    );

    let status = TokioCommand::new(&invocation.command)
        .args(&invocation.args)
        .current_dir(root)
        .stdin(Stdio::null())
        .status()
        .await
        .map_err(|e| {
            Error::Engine(format!("failed to start '{}': {}", invocation.command, e))
        })?;

    let code = status.code().unwrap_or(1);
    if status.success() {
        println!("{} {}", "✓".green(), "engine run finished".green());
    } else {
        println!(
            "{} engine exited with code {}",
            "✗".red(),
            code.to_string().red()
        );
    }
    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_expression_and_groups_with_or_terms() {
        let tags = TagExpression::parse("@smoke,@fast @regression");
        assert_eq!(
            tags.ands,
            vec![
                vec!["@smoke".to_string(), "@fast".to_string()],
                vec!["@regression".to_string()],
            ]
        );
        assert_eq!(
            tags.engine_args(),
            vec!["--tags=@smoke,@fast", "--tags=@regression"]
        );
        assert_eq!(tags.to_string(), "--tags=@smoke,@fast --tags=@regression");
    }

    #[test]
    fn test_tag_expression_empty_input() {
        let tags = TagExpression::parse("   ");
        assert!(tags.is_empty());
        assert!(tags.engine_args().is_empty());
    }

    #[test]
    fn test_feature_order_drops_missing_preserving_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.feature"), "").unwrap();
        std::fs::write(dir.path().join("b.feature"), "").unwrap();

        let entries = vec![
            "a.feature".to_string(),
            "missing.feature".to_string(),
            "b.feature".to_string(),
        ];
        let resolved = resolve_feature_order(dir.path(), &entries);
        assert_eq!(
            resolved,
            vec![PathBuf::from("a.feature"), PathBuf::from("b.feature")]
        );
    }

    #[test]
    fn test_invocation_composition() {
        let engine = EngineConfig::default();
        let tags = TagExpression::parse("@smoke,@fast @regression");
        let features = vec![PathBuf::from("a.feature"), PathBuf::from("b.feature")];
        let invocation =
            EngineInvocation::compose(&engine, &features, Path::new("reports"), &tags, false);

        assert_eq!(invocation.command, "behave");
        assert_eq!(
            invocation.args,
            vec![
                "a.feature",
                "b.feature",
                "-f",
                "allure_behave.formatter:AllureFormatter",
                "-o",
                "reports",
                "--no-skipped",
                "-f",
                "plain",
                "--tags=@smoke,@fast",
                "--tags=@regression",
            ]
        );
    }

    #[test]
    fn test_invocation_forwards_verbosity() {
        let engine = EngineConfig::default();
        let tags = TagExpression::parse("@smoke");
        let invocation = EngineInvocation::compose(
            &engine,
            &[PathBuf::from("a.feature")],
            Path::new("reports"),
            &tags,
            true,
        );

        let verbose_at = invocation
            .args
            .iter()
            .position(|arg| arg == "--verbose")
            .expect("verbose flag forwarded to the engine");
        // tag clauses stay last
        assert_eq!(invocation.args[verbose_at + 1], "--tags=@smoke");
    }

    #[tokio::test]
    async fn test_run_engine_propagates_exit_code() {
        let invocation = EngineInvocation {
            command: "sh".to_string(),
            args: vec!["-c".to_string(), "exit 3".to_string()],
        };
        let code = run_engine(&invocation, Path::new(".")).await.unwrap();
        assert_eq!(code, 3);
    }

    #[tokio::test]
    async fn test_run_engine_missing_command_is_an_error() {
        let invocation = EngineInvocation {
            command: "definitely-not-a-real-engine".to_string(),
            args: vec![],
        };
        let err = run_engine(&invocation, Path::new(".")).await.unwrap_err();
        assert!(matches!(err, Error::Engine(_)));
    }
}
