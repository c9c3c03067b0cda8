//! CLI command definitions and argument parsing

use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;

#[derive(Parser)]
#[command(name = "topgo-rag")]
#[command(about = "Restaurant, bar and karaoke recommendations for Hanoi")]
#[command(version)]
pub struct Cli {
    /// Enable verbose debug logging (default: info level)
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file (default: config.toml, then config.example.toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the REST API server
    Serve {
        /// Host to bind to (overrides server.host)
        #[arg(long)]
        host: Option<String>,
        /// Port to listen on (overrides server.port)
        #[arg(short, long)]
        port: Option<u16>,
        /// Disable CORS
        #[arg(long)]
        no_cors: bool,
    },
    /// Embed processed venue data and load it into the vector store
    Index {
        /// JSON array of venues produced by the data processor
        #[arg(short, long, default_value = "data/processed/restaurants_clean.json")]
        file: PathBuf,
    },
    /// Semantic venue search
    Search {
        /// Search text
        query: String,
        /// Maximum number of results
        #[arg(short = 'n', long, default_value = "5")]
        limit: usize,
        /// Venue type (restaurant, bar, karaoke, ...)
        #[arg(long = "type")]
        business_type: Option<String>,
        /// District, with or without diacritics
        #[arg(long)]
        district: Option<String>,
        /// Price tier (binh_dan, trung_binh, cao_cap, cheap, moderate, expensive)
        #[arg(long)]
        price: Option<String>,
    },
    /// Ask the assistant a question
    Ask {
        /// Question in Vietnamese
        query: String,
        /// Number of venues to retrieve
        #[arg(short = 'n', long)]
        limit: Option<usize>,
        /// Skip generation and print the ranked venues
        #[arg(long)]
        search_only: bool,
    },
    /// Show store size and LLM connectivity
    Status,
    /// Show current configuration
    Config,
}
