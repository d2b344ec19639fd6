//! Browser acceptance-test harness CLI
//!
//! Orchestrates one run: engine invocation, session lifecycle and report
//! post-processing. The process exits with the engine's exit code.

use clap::Parser;
use std::process::ExitCode;

use webharness::common::config::{is_truthy, load_dotenv};
use webharness::common::logging;
use webharness::{cli, commands::Commands};

#[derive(Parser)]
#[command(name = "webharness", about = "Browser acceptance-test harness")]
#[command(version, long_about = None)]
struct Cli {
    /// Verbose logging (also enabled via VERBOSE=true)
    #[arg(long, short)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Must happen before any environment lookup; VERBOSE itself may come
    // from the file.
    let dotenv = load_dotenv();

    let verbose = cli.verbose
        || std::env::var("VERBOSE")
            .map(|value| is_truthy(&value))
            .unwrap_or(false);
    logging::init(verbose);

    if let Some(path) = dotenv {
        tracing::debug!(path = %path.display(), "loaded environment from .env");
    }

    match cli::dispatch(cli.command).await {
        Ok(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
