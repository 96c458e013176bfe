use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Shared application context for global flags
#[derive(Clone, Debug)]
pub struct AppContext {
    pub quiet: bool,    // global --quiet
    pub verbose: bool,  // global --verbose
    pub no_color: bool, // global --no-color
}

#[derive(Parser)]
#[command(name = "dirlabel")]
#[command(about = "Label pull requests from the directories their changed files live in")]
#[command(version, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Only print results and errors
    #[arg(long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log matching and reconciliation details to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compute label decisions for a set of changed files
    Decide(DecideArgs),

    /// Dry-run reconciliation against a given set of existing labels
    Plan(PlanArgs),

    /// Validate a configuration file
    Check(CheckArgs),

    /// Write a starter dirlabel.yml with example rules
    Init(InitArgs),
}

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Where the changed-file list comes from
#[derive(Debug, Clone, Args)]
pub struct FileInput {
    /// Changed file paths
    pub files: Vec<String>,

    /// Read changed file paths from a file, one per line ("-" for stdin)
    #[arg(long = "files-from", value_name = "PATH")]
    pub files_from: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
pub struct DecideArgs {
    /// Configuration file (default: first of .github/dirlabel.yml, dirlabel.yml, ...)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub input: FileInput,

    /// Override the configured label limit (0 = unlimited)
    #[arg(long)]
    pub max_labels: Option<usize>,

    /// Output format
    #[arg(long, default_value = "text", value_enum)]
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Args)]
pub struct PlanArgs {
    /// Configuration file (default: first of .github/dirlabel.yml, dirlabel.yml, ...)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub input: FileInput,

    /// Labels already on the pull request
    #[arg(long, value_delimiter = ',')]
    pub existing: Vec<String>,

    /// Labels defined in the repository; when given, others count as undefined
    #[arg(long, value_delimiter = ',')]
    pub defined: Option<Vec<String>>,

    /// Do not create undefined labels
    #[arg(long)]
    pub no_create: bool,

    /// Pull request number reported in the output
    #[arg(long, default_value = "0")]
    pub pr: u64,

    /// Output format
    #[arg(long, default_value = "text", value_enum)]
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Args)]
pub struct CheckArgs {
    /// Configuration file (default: first of .github/dirlabel.yml, dirlabel.yml, ...)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
pub struct InitArgs {
    /// Project root that receives dirlabel.yml
    #[arg(default_value = ".", value_name = "DIR")]
    pub path: PathBuf,

    /// Replace a dirlabel.yml that is already there
    #[arg(long)]
    pub force: bool,
}
