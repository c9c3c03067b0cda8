//! Information display handlers (status, config)

use crate::cli::output::print_config;
use crate::cli::output::print_error;
use crate::cli::output::print_success;
use crate::cli::output::print_warning;
use crate::llm::Generator;
use crate::llm::LlmService;
use crate::rag::VenueRetriever;
use crate::AppConfig;
use crate::Result;

pub async fn handle_status(config: &AppConfig) -> Result<()> {
    println!("📊 TopGo RAG Status");
    println!();

    match VenueRetriever::from_config(config).await {
        Ok(retriever) => match retriever.count().await {
            Ok(count) => print_success(&format!("Vector store: {count} venues")),
            Err(e) => print_error(&format!("Vector store error: {e}")),
        },
        Err(e) => print_error(&format!("Vector store unavailable: {e}")),
    }

    let llm = LlmService::new(&config.llm)?;
    if llm.check_connection().await {
        print_success(&format!("LLM: connected ({})", config.llm.endpoint));
        let models = llm.list_models().await?;
        if models.is_empty() {
            print_warning("No models pulled");
        }
        for model in models {
            let marker = if model == config.llm.model { "*" } else { " " };
            println!("  {marker} {model}");
        }
    } else {
        print_warning(&format!("LLM: disconnected ({})", config.llm.endpoint));
    }

    Ok(())
}

pub fn handle_config(config: &AppConfig) -> Result<()> {
    print_config(config);
    Ok(())
}
