//! Venue ingestion handler

use std::path::Path;
use std::time::Instant;

use crate::cli::output::print_info;
use crate::cli::output::print_success;
use crate::cli::output::print_warning;
use crate::config::StoreBackend;
use crate::embeddings::index_venues;
use crate::embeddings::load_venues;
use crate::rag::VenueRetriever;
use crate::AppConfig;
use crate::Result;

/// Embed every venue in `file` and upsert it into the configured store
pub async fn handle_index(config: &AppConfig, file: &Path) -> Result<()> {
    if config.store.backend == StoreBackend::Memory {
        print_warning("store.backend is \"memory\"; indexed venues are dropped when this command exits");
    }

    let venues = load_venues(file)?;
    print_info(&format!("Loaded {} venues from {}", venues.len(), file.display()));

    let retriever = VenueRetriever::from_config(config).await?;
    let started = Instant::now();
    let stats = index_venues(
        retriever.embedder().as_ref(),
        retriever.store().as_ref(),
        &venues,
        config.embeddings.batch_size,
    )
    .await?;

    print_success(&format!(
        "Indexed {} of {} venues in {} batches ({:.1}s)",
        stats.stored,
        stats.total,
        stats.batches,
        started.elapsed().as_secs_f64()
    ));
    print_info(&format!(
        "Store now holds {} venues",
        retriever.count().await?
    ));
    Ok(())
}
