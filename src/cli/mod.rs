//! CLI command handling
//!
//! Dispatches CLI commands and formats output. `run` returns the engine's
//! exit code so the process can exit with it.

use std::env;

use colored::Colorize;

use crate::commands::Commands;
use crate::common::config::{HarnessConfig, RunConfiguration};
use crate::common::Result;
use crate::engine::{self, EngineInvocation, TagExpression};
use crate::lifecycle::RunContext;
use crate::report;

/// Dispatch a CLI command, returning the process exit code
pub async fn dispatch(command: Commands) -> Result<i32> {
    match command {
        Commands::Run => run().await,

        Commands::Check => {
            check().await?;
            Ok(0)
        }

        Commands::Augment {
            reports,
            hardware,
            localhost,
        } => {
            let locality = if localhost { "Localhost" } else { "Remotehost" };
            let summary = report::augment_reports(&reports, &hardware, locality)?;
            print_augment_summary(&summary);
            Ok(0)
        }
    }
}

/// Full run: resolve configuration, invoke the engine, post-process reports
async fn run() -> Result<i32> {
    let run_config = RunConfiguration::from_env()?;
    let root = env::current_dir()?;
    let harness = HarnessConfig::load(&root)?;

    let tags = TagExpression::parse(&run_config.tags);
    tracing::info!(tags = %tags, "using tag filter");

    let features = engine::resolve_feature_order(&root, &run_config.feature_order);
    if features.is_empty() {
        tracing::warn!("no feature files from FEATURE_ORDER exist on disk");
    }

    let reports = root.join(&run_config.reports_dir);
    std::fs::create_dir_all(&reports)?;

    let invocation = EngineInvocation::compose(
        &harness.engine,
        &features,
        &reports,
        &tags,
        run_config.verbose,
    );
    let code = engine::run_engine(&invocation, &root).await?;

    // Exactly once per run; the engine has exited, the listing is final.
    let summary = report::augment_reports(&reports, &run_config.hardware, run_config.locality())?;
    print_augment_summary(&summary);

    Ok(code)
}

/// Smoke check: session up, root URL reachable, session down
async fn check() -> Result<()> {
    let run_config = RunConfiguration::from_env()?;
    let root = env::current_dir()?;
    let harness = HarnessConfig::load(&root)?;

    let mut context = RunContext::start(&run_config, &harness, &root).await?;
    let outcome = context.begin_scenario().await;
    let root_url = context.root_url().to_string();
    context.finish().await;
    outcome?;

    println!(
        "{} session acquired and {} reachable",
        "✓".green(),
        root_url.bold()
    );
    Ok(())
}

fn print_augment_summary(summary: &report::AugmentSummary) {
    if summary.is_clean() {
        println!(
            "{} {} report record(s) augmented",
            "✓".green(),
            summary.updated
        );
    } else {
        println!(
            "{} {} report record(s) augmented, {} failed",
            "✗".red(),
            summary.updated,
            summary.failures.len()
        );
        for (path, reason) in &summary.failures {
            println!("  {} {}: {}", "✗".red(), path.display(), reason.dimmed());
        }
    }
}
