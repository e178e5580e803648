use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::analysis::{DEFAULT_MODEL, DEFAULT_ORACLE_URL};
use crate::catalog::DEFAULT_COMPETITOR_LIMIT;

#[derive(Parser, Debug)]
#[command(
    name = "skuscan",
    version,
    about = "Product catalog normalization and listing optimization tooling"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Ingest(IngestArgs),
    Search(SearchArgs),
    Competitors(CompetitorsArgs),
    Analyze(AnalyzeArgs),
    Status(StatusArgs),
}

#[derive(Args, Debug, Clone)]
pub struct IngestArgs {
    #[arg(long, default_value = ".cache/skuscan")]
    pub cache_root: PathBuf,

    #[arg(long)]
    pub catalog: PathBuf,

    #[arg(long)]
    pub manifest_path: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}

#[derive(Args, Debug, Clone)]
pub struct SearchArgs {
    #[arg(long)]
    pub catalog: PathBuf,

    #[arg(long, default_value = "")]
    pub text: String,

    #[arg(long, default_value = "")]
    pub brand: String,

    #[arg(long, default_value = "")]
    pub category: String,

    #[arg(long, default_value_t = 15)]
    pub limit: usize,

    #[arg(long, default_value_t = false)]
    pub facets: bool,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct CompetitorsArgs {
    #[arg(long)]
    pub catalog: PathBuf,

    #[arg(long)]
    pub target: String,

    #[arg(long, default_value_t = DEFAULT_COMPETITOR_LIMIT)]
    pub limit: usize,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct AnalyzeArgs {
    #[arg(long, default_value = ".cache/skuscan")]
    pub cache_root: PathBuf,

    #[arg(long)]
    pub catalog: PathBuf,

    /// Guideline document: .txt/.md as text, .pdf or images as attachments
    #[arg(long)]
    pub guidelines: PathBuf,

    #[arg(long)]
    pub target: String,

    #[arg(long)]
    pub retailer: String,

    #[arg(long, default_value_t = DEFAULT_COMPETITOR_LIMIT)]
    pub competitors: usize,

    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    #[arg(long, env = "SKUSCAN_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    #[arg(long, env = "SKUSCAN_ORACLE_URL", default_value = DEFAULT_ORACLE_URL)]
    pub oracle_url: String,

    #[arg(long, default_value_t = 60)]
    pub timeout_secs: u64,

    /// Directory for the optimized row export; defaults to <cache-root>/exports
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    #[arg(long)]
    pub ledger_path: Option<PathBuf>,

    /// Print the rendered prompt and skip the oracle call
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[arg(long, default_value = ".cache/skuscan")]
    pub cache_root: PathBuf,

    #[arg(long)]
    pub target: Option<String>,
}
