//! Filepath: src/infra/logging.rs
//! tracing-subscriber setup for the binary. Logs go to stderr so stdout
//! stays clean for JSON output.

use tracing_subscriber::{EnvFilter, fmt};

use crate::cli::AppContext;

/// Default filter directive for the given flags. `RUST_LOG` overrides it.
pub fn default_directive(ctx: &AppContext) -> &'static str
{
    if ctx.quiet
    {
        "error"
    }
    else if ctx.verbose
    {
        "dirlabel=debug,info"
    }
    else
    {
        "warn"
    }
}

/// Install the global subscriber. Safe to call more than once.
pub fn init(ctx: &AppContext)
{
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive(ctx)));

    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(!ctx.no_color)
        .with_target(false)
        .try_init();
}
