use clap::Parser;
use topgo_rag::cli::handle_ask;
use topgo_rag::cli::handle_config;
use topgo_rag::cli::handle_index;
use topgo_rag::cli::handle_search;
use topgo_rag::cli::handle_serve_api;
use topgo_rag::cli::handle_status;
use topgo_rag::cli::Cli;
use topgo_rag::cli::Commands;
use topgo_rag::models::FilterInput;
use topgo_rag::AppConfig;
use topgo_rag::Result;
use tracing::info;
use tracing::warn;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = match &cli.config {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::load()?,
    };

    // Initialize logging
    if cli.verbose {
        topgo_rag::logging::init_logging_with_level(&config.logging, "debug")?;
    } else {
        topgo_rag::logging::init_logging(&config.logging)?;
    }
    info!("Configuration loaded successfully");
    for warning in config.warnings() {
        warn!("{warning}");
    }

    // Execute the requested command
    match cli.command {
        Commands::Serve {
            host,
            port,
            no_cors,
        } => {
            handle_serve_api(&config, host, port, no_cors).await?;
        }
        Commands::Index { file } => {
            handle_index(&config, &file).await?;
        }
        Commands::Search {
            query,
            limit,
            business_type,
            district,
            price,
        } => {
            let filters = FilterInput {
                business_type,
                district,
                price_range: price,
            };
            handle_search(&config, &query, limit, filters).await?;
        }
        Commands::Ask {
            query,
            limit,
            search_only,
        } => {
            handle_ask(&config, &query, limit, search_only).await?;
        }
        Commands::Status => {
            handle_status(&config).await?;
        }
        Commands::Config => {
            handle_config(&config)?;
        }
    }

    Ok(())
}
