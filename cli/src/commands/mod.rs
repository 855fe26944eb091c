pub mod index;
pub mod output;
pub mod search;
pub mod status;
pub mod unpack;

pub use index::handle_index;
pub use output::Output;
pub use search::handle_search;
pub use status::handle_status;
pub use unpack::{handle_unpack, handle_update};

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "repodex")]
#[command(about = "Index a Maven-style artifact repository and publish it as baseline plus incremental chunks")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (defaults to .repodex.{toml,yml,yaml,json})
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Only report errors
    #[arg(short, long, global = true, conflicts_with = "debug")]
    pub quiet: bool,

    /// Report every artifact and debug logs
    #[arg(short, long, global = true)]
    pub debug: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan a repository, update its index and publish it
    Index(IndexArgs),
    /// Rebuild a local index from a published folder
    Unpack(UnpackArgs),
    /// Bring a local index up to date with a published folder
    Update(UnpackArgs),
    /// Full-text search over an index
    Search(SearchArgs),
    /// Show an index's state and recent commits
    Status(StatusArgs),
}

#[derive(Args, Debug, Default)]
pub struct IndexArgs {
    /// Repository folder to scan
    #[arg(short, long, value_name = "DIR")]
    pub repository: Option<PathBuf>,

    /// Index folder (created if missing)
    #[arg(short, long, value_name = "DIR")]
    pub index: Option<PathBuf>,

    /// Repository name (defaults to the index folder name)
    #[arg(short, long)]
    pub name: Option<String>,

    /// Folder receiving the published baseline, chunks and manifest
    #[arg(short, long, value_name = "DIR")]
    pub target: Option<PathBuf>,

    /// Extractors: `default`, `full`, or a comma-separated list
    #[arg(short = 'y', long = "type", value_name = "EXTRACTORS")]
    pub extractors: Option<String>,

    /// Write .md5/.sha1 files for everything published
    #[arg(short = 's', long)]
    pub checksums: bool,

    /// Publish incremental chunks along with the baseline
    #[arg(long)]
    pub chunks: bool,

    /// Number of chunks to keep
    #[arg(short, long, value_name = "N")]
    pub keep: Option<usize>,
}

#[derive(Args, Debug)]
pub struct UnpackArgs {
    /// Folder holding a published baseline and manifest
    #[arg(short, long, value_name = "DIR")]
    pub source: PathBuf,

    /// Local index folder
    #[arg(short, long, value_name = "DIR")]
    pub index: PathBuf,
}

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Query over group, artifact, name, description and plugin prefix
    pub query: String,

    /// Index folder
    #[arg(short, long, value_name = "DIR")]
    pub index: PathBuf,

    /// Number of results
    #[arg(long, default_value_t = 10)]
    pub top: usize,
}

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Index folder
    #[arg(short, long, value_name = "DIR")]
    pub index: PathBuf,

    /// Published folder to compare against
    #[arg(short, long, value_name = "DIR")]
    pub target: Option<PathBuf>,

    /// Number of journal entries to show
    #[arg(long, default_value_t = 5)]
    pub history: usize,
}
