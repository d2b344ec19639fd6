//! Logging and tracing configuration
//!
//! One subscriber for the whole process. Lifecycle events carry structured
//! fields (endpoint, scenario, attachment counts) so a run can be replayed
//! from its log.

use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

/// Initialize tracing for the harness (stdout logging)
///
/// Logs are controlled by the `RUST_LOG` environment variable. Without it the
/// crate logs at info, dependencies at warn; `verbose` raises the crate to
/// debug.
pub fn init(verbose: bool) {
    let default_directives = if verbose {
        "webharness=debug,info"
    } else {
        "webharness=info,warn"
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .init();
}
