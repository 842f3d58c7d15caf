use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::narrative::DEFAULT_MODEL;
use crate::submission::DEFAULT_MAX_INPUT_KIB;

#[derive(Parser, Debug)]
#[command(
    name = "habitlens",
    about = "Summarize browser history exports into daily per-domain visits and behavioral profiles",
    version,
    long_about = None
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Number of worker threads
    #[arg(short, long, global = true)]
    pub workers: Option<usize>,

    /// Largest accepted history export, in KiB
    #[arg(
        long,
        global = true,
        env = "HABITLENS_MAX_INPUT_KIB",
        default_value_t = DEFAULT_MAX_INPUT_KIB
    )]
    pub max_input_kib: usize,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Aggregate exports into visits per domain per day
    Summarize(SummarizeArgs),
    /// Score exports against the DISC keyword lists
    Profile(ProfileArgs),
    /// Summarize an export and ask the model for a behavioral report
    Analyze(AnalyzeArgs),
    /// Write a browser's history database as a CSV export
    Export(ExportArgs),
}

#[derive(clap::Args, Debug)]
pub struct SummarizeArgs {
    /// History exports (URL,Last Visited,Visit Count)
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Directory to write `<name>.summary.csv` (or `.json`) files into instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Number of top domains to display
    #[arg(short, long)]
    pub top: Option<usize>,

    /// Redact domain names in the top domain listing
    #[arg(long)]
    pub redact: bool,

    /// Print a JSON report instead of CSV
    #[arg(long)]
    pub json: bool,
}

#[derive(clap::Args, Debug)]
pub struct ProfileArgs {
    /// History exports or summaries
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,
}

#[derive(clap::Args, Debug)]
pub struct AnalyzeArgs {
    /// History export to analyze
    pub file: PathBuf,

    /// Google API key
    #[arg(long, env = "GOOGLE_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Gemini model name
    #[arg(long, env = "GEMINI_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 300)]
    pub timeout_secs: u64,

    /// Print JSON instead of Markdown
    #[arg(long)]
    pub json: bool,
}

#[derive(clap::Args, Debug)]
pub struct ExportArgs {
    /// Browser to export
    #[arg(short, long, default_value = "Vivaldi")]
    pub browser: String,

    /// Path to a history database, overriding the browser's default location
    #[arg(long)]
    pub history: Option<PathBuf>,

    /// Custom temporary file path for database copy
    #[arg(long)]
    pub temp_path: Option<PathBuf>,

    /// File to write the export to instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}
