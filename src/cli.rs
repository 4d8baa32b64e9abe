use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "photosearch")]
#[command(about = "Search a photo library with plain text")]
#[command(version)]
/// Command-line arguments.
pub struct Cli {
    /// YAML configuration file (built-in defaults if omitted)
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Photo directory, overriding `library.root` from the config
    #[arg(long, short = 'l')]
    pub library: Option<PathBuf>,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Encode every library photo that is not indexed yet
    Index,
    /// Find the photos best matching a text query
    Search {
        /// Query words, e.g. `dog on the beach`
        #[arg(required = true)]
        query: Vec<String>,

        /// Number of results (config `search.default_top_k` if omitted)
        #[arg(long, short = 'k')]
        top_k: Option<usize>,
    },
    /// Show what the embedding store holds
    Status,
}
