//! CLI handler for `dirlabel plan`: decisions plus a dry-run reconciliation
//! against an in-memory store seeded with the labels given on the command
//! line. Nothing remote is touched.

use anyhow::{Context, Result};
use serde_json::json;
use tracing::instrument;

use crate::{
    cli::{AppContext, OutputFormat, PlanArgs},
    cli_ext::decide_cmd::{load_labeler, paint_label, read_files},
    core::{labeler::LabelRun, store::MemoryLabelStore},
};

#[instrument(skip_all, fields(pr = args.pr))]
pub fn run(
    args: PlanArgs,
    ctx: &AppContext,
) -> Result<()>
{
    let no_create = args.no_create;
    let labeler = load_labeler(args.config.as_deref(), |cfg| {
        if no_create
        {
            cfg.create_missing_labels = false;
        }
    })?;

    let files = read_files(&args.input)?;

    let mut store = MemoryLabelStore::new().with_labels(args.pr, args.existing);
    if let Some(defined) = args.defined
    {
        store = store.with_defined(defined);
    }

    let run = labeler
        .apply(&mut store, args.pr, &files)
        .context("Reconciliation aborted")?;
    let resulting = store.labels(args.pr);

    match args.format
    {
        OutputFormat::Json =>
        {
            let out = json!({ "run": run, "labels": resulting });
            println!("{}", serde_json::to_string_pretty(&out).context("Failed to serialize plan")?);
        }
        OutputFormat::Text => print_text(&run, &resulting, ctx),
    }

    Ok(())
}

fn print_text(
    run: &LabelRun,
    resulting: &[String],
    ctx: &AppContext,
)
{
    let list = |labels: &[String]| {
        if labels.is_empty()
        {
            "-".to_string()
        }
        else
        {
            labels
                .iter()
                .map(|l| paint_label(l, ctx))
                .collect::<Vec<_>>()
                .join(", ")
        }
    };

    let r = &run.result;
    println!("applied: {}", list(&r.applied));
    println!("skipped: {}", list(&r.skipped));
    println!("removed: {}", list(&r.removed));

    for f in &r.failed
    {
        println!("failed:  {} ({})", f.label, f.reason);
    }

    for rej in &run.decisions.rejected
    {
        println!("dropped: {} ({})", rej.decision.label, rej.reason);
    }

    if !ctx.quiet
    {
        println!("labels:  {}", list(resulting));
    }
}
