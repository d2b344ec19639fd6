//! CLI command definitions
//!
//! Defines the clap commands for the harness.

use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Run the acceptance-test cycle: engine invocation plus report post-processing
    Run,

    /// Acquire a browser session, open the root URL, release it again
    Check,

    /// Append run metadata to the result records in a report folder
    ///
    /// Not idempotent: a second pass over the same folder appends the suffix
    /// again and changes every history id.
    Augment {
        /// Folder containing *result.json records
        reports: PathBuf,

        /// Hardware identifier to append
        #[arg(long)]
        hardware: String,

        /// Mark the run as having executed on localhost
        #[arg(long)]
        localhost: bool,
    },
}
