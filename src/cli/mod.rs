pub mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "presswire")]
#[command(about = "Query the Cologne press release feed", long_about = None)]
pub struct Cli {
    /// Config file (default: ~/.config/presswire/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<std::path::PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Newest press releases
    Latest {
        /// Number of items (1-100, default 10)
        #[arg(short)]
        n: Option<usize>,
    },
    /// Search titles, categories and descriptions
    Search {
        query: String,
        /// Maximum number of results (1-100, default 20)
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Show a single press release
    Get { id: String },
    /// List all categories
    Categories,
    /// Fetch the feed now and report the new snapshot
    Refresh,
}
