//! CLI handler for `dirlabel decide`.
//!
//! Reads the changed-file list, runs the decision engine with the configured
//! label limit and prints selected and rejected decisions.

use std::{
    fs,
    io::{self, Read},
};

use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use tracing::{debug, instrument};

use crate::{
    cli::{AppContext, DecideArgs, FileInput, OutputFormat},
    core::{decision::CapOutcome, labeler::Labeler},
    infra::config::{LabelerConfig, load_config},
};

/// Collect changed files from positional args and `--files-from`.
/// Blank lines are ignored.
pub fn read_files(input: &FileInput) -> Result<Vec<String>>
{
    let mut files = input
        .files
        .clone();

    if let Some(path) = &input.files_from
    {
        let text = if path.as_os_str() == "-"
        {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read file list from stdin")?;
            buf
        }
        else
        {
            fs::read_to_string(path)
                .with_context(|| format!("Failed to read file list {}", path.display()))?
        };

        files.extend(
            text.lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string),
        );
    }

    debug!(count = files.len(), "changed files collected");
    Ok(files)
}

/// Load and compile the configuration for a command.
pub fn load_labeler(
    config: Option<&std::path::Path>,
    adjust: impl FnOnce(&mut LabelerConfig),
) -> Result<Labeler>
{
    let mut cfg = load_config(config).context("Failed to load configuration")?;
    adjust(&mut cfg);
    Labeler::new(&cfg).context("Failed to compile label rules")
}

/// Paint `text` unless colors are off.
pub fn paint_label(
    text: &str,
    ctx: &AppContext,
) -> String
{
    if ctx.no_color
    {
        text.to_string()
    }
    else
    {
        text.green()
            .bold()
            .to_string()
    }
}

#[instrument(skip_all)]
pub fn run(
    args: DecideArgs,
    ctx: &AppContext,
) -> Result<()>
{
    let labeler = load_labeler(args.config.as_deref(), |cfg| {
        if let Some(max) = args.max_labels
        {
            cfg.max_labels = max;
        }
    })?;

    let files = read_files(&args.input)?;
    let outcome = labeler.plan(&files);

    match args.format
    {
        OutputFormat::Json =>
        {
            println!(
                "{}",
                serde_json::to_string_pretty(&outcome).context("Failed to serialize decisions")?
            );
        }
        OutputFormat::Text => print_text(&outcome, ctx),
    }

    Ok(())
}

fn print_text(
    outcome: &CapOutcome,
    ctx: &AppContext,
)
{
    if outcome
        .selected
        .is_empty()
    {
        println!("No labels matched.");
    }

    for d in &outcome.selected
    {
        println!(
            "{}  (pattern {}, priority {}, specificity {})",
            paint_label(&d.label, ctx),
            d.matched_pattern,
            d.priority,
            d.specificity
        );
        if !ctx.quiet
        {
            for f in &d.matched_files
            {
                println!("  {f}");
            }
        }
    }

    if !outcome
        .rejected
        .is_empty()
    {
        println!("Rejected:");
        for r in &outcome.rejected
        {
            println!("  {}: {}", r.decision.label, r.reason);
        }
    }
}

#[cfg(test)]
mod tests
{
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    #[test]
    fn reads_positional_and_listed_files()
    {
        let mut list = NamedTempFile::new().unwrap();
        writeln!(list, "src/a.rs").unwrap();
        writeln!(list).unwrap();
        writeln!(list, "  docs/b.md  ").unwrap();

        let input = FileInput {
            files: vec!["README.md".to_string()],
            files_from: Some(
                list.path()
                    .to_path_buf(),
            ),
        };

        assert_eq!(read_files(&input).unwrap(), vec!["README.md", "src/a.rs", "docs/b.md"]);
    }

    #[test]
    fn missing_file_list_is_an_error()
    {
        let input = FileInput { files: Vec::new(), files_from: Some("/nonexistent/files.txt".into()) };
        assert!(read_files(&input).is_err());
    }
}
