//! Search and question answering handlers

use crate::cli::output::print_hits;
use crate::cli::output::print_info;
use crate::models::FilterInput;
use crate::models::SearchFilters;
use crate::rag::AnswerMode;
use crate::rag::AnswerRequest;
use crate::rag::ContextAssembler;
use crate::rag::RagService;
use crate::rag::VenueRetriever;
use crate::AppConfig;
use crate::Result;

pub async fn handle_search(
    config: &AppConfig,
    query: &str,
    limit: usize,
    filters: FilterInput,
) -> Result<()> {
    let filters = filters.resolve()?;
    let retriever = VenueRetriever::from_config(config).await?;

    print_info(&format!("🔍 Searching: \"{query}\""));
    if !filters.is_empty() {
        println!("   Filters: {}", serde_json::Value::Object(filters.applied()));
    }
    println!();

    let hits = retriever.search(query, limit, &filters).await?;
    print_hits(&hits);
    Ok(())
}

pub async fn handle_ask(
    config: &AppConfig,
    query: &str,
    limit: Option<usize>,
    search_only: bool,
) -> Result<()> {
    let service = RagService::new(config).await?;
    print_info(&format!("🤖 Question: \"{query}\""));
    println!();

    if search_only {
        let hits = service
            .retrieve(query, &SearchFilters::default(), limit)
            .await?;
        println!("{}", ContextAssembler::default().create_summary(&hits));
        return Ok(());
    }

    let mut request = AnswerRequest::new(query);
    request.top_k = limit;
    let response = service.answer(request).await?;

    println!("{}", response.answer);
    if response.num_sources > 0 {
        println!();
        print_info(&format!("📚 Sources ({}):", response.num_sources));
        print_hits(&response.sources);
    }
    if response.mode == AnswerMode::SearchOnly {
        println!("(LLM unavailable: answer composed from search results)");
    }
    Ok(())
}
