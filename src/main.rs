use anyhow::Result;
use clap::Parser;
use dirlabel::cli::{AppContext, Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Build a context once, pass everywhere
    let ctx = AppContext {
        quiet: cli.quiet,
        verbose: cli.verbose,
        no_color: cli.no_color,
    };

    dirlabel::infra::logging::init(&ctx);

    match cli.command {
        Commands::Decide(args) => dirlabel::cli_ext::decide_cmd::run(args, &ctx),
        Commands::Plan(args) => dirlabel::cli_ext::plan_cmd::run(args, &ctx),
        Commands::Check(args) => dirlabel::cli_ext::check_cmd::run(args, &ctx),
        Commands::Init(args) => dirlabel::infra::config::init(args, &ctx),
    }
}
