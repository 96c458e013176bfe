//! CLI handler for `dirlabel check`: load, validate and compile a
//! configuration without touching any files or labels.

use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use tracing::instrument;

use crate::{
    cli::{AppContext, CheckArgs},
    core::labeler::Labeler,
    infra::config::load_config,
};

#[instrument(skip_all)]
pub fn run(
    args: CheckArgs,
    ctx: &AppContext,
) -> Result<()>
{
    let cfg = load_config(args.config.as_deref()).context("Failed to load configuration")?;

    // Compiling surfaces invalid globs
    Labeler::new(&cfg).context("Failed to compile label rules")?;

    if ctx.quiet
    {
        return Ok(());
    }

    println!(
        "Configuration OK: {} rule(s), {} default exclude(s), max labels {}",
        cfg.rules
            .len(),
        cfg.default_excludes()
            .len(),
        if cfg.max_labels == 0 { "unlimited".to_string() } else { cfg.max_labels.to_string() }
    );

    // Validation already logged each one; list them for the reader
    let duplicates = cfg.duplicate_labels();
    if !duplicates.is_empty()
    {
        let line = format!("Duplicate labels: {}", duplicates.join(", "));
        if ctx.no_color
        {
            println!("{line}");
        }
        else
        {
            println!("{}", line.yellow());
        }
    }

    Ok(())
}
