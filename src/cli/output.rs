//! CLI output formatting utilities

use crate::config::AppConfig;
use crate::models::VenueHit;

/// Safely truncate a string at character boundary (not byte boundary)
///
/// Returns the string with a "..." suffix if it was truncated.
#[must_use]
pub fn truncate_str(s: &str, max_chars: usize) -> String {
    if s.chars().count() > max_chars {
        let truncated: String = s.chars().take(max_chars).collect();
        format!("{truncated}...")
    } else {
        s.to_string()
    }
}

/// Print ranked venues
pub fn print_hits(hits: &[VenueHit]) {
    if hits.is_empty() {
        print_warning("No matching venues");
        return;
    }

    for hit in hits {
        let venue = &hit.venue;
        println!(
            "{:>2}. {} ({:.0}%)",
            hit.rank,
            venue.name,
            hit.similarity_score * 100.0
        );
        println!(
            "    {} | {} | {}",
            venue.business_type,
            venue.district,
            venue.price_label()
        );
        println!("    📍 {}", venue.address);
        if !venue.phone.is_empty() {
            println!("    📞 {}", venue.phone);
        }
        if let Some(description) = venue.description_opt() {
            println!("    {}", truncate_str(description, 120));
        }
        println!();
    }
}

/// Print configuration
pub fn print_config(config: &AppConfig) {
    println!("📋 TopGo RAG Configuration:");
    println!();

    println!("🌐 Server:");
    println!("  Bind: {}", config.bind_address());
    println!("  CORS: {}", config.server.enable_cors);
    println!("  Request timeout: {}s", config.server.request_timeout_secs);
    println!();

    println!("🗄️  Store:");
    println!("  Backend: {:?}", config.store.backend);
    if let Some(seed) = &config.store.seed_file {
        println!("  Seed file: {}", seed.display());
    }
    println!("  Database URL: {}", mask_database_url(&config.database.url));
    println!("  Max connections: {}", config.database.max_connections);
    println!("  Vector index: {}", config.database.create_vector_index);
    println!();

    println!("🧠 Embeddings:");
    println!("  Provider: {}", config.embeddings.provider);
    println!("  Endpoint: {}", config.embeddings.endpoint);
    println!("  Model: {}", config.embeddings.model);
    println!("  Dimension: {}", config.embeddings.dimension);
    println!("  Query cache: {}", config.embeddings.cache_size);
    println!();

    println!("🤖 LLM:");
    println!("  Endpoint: {}", config.llm.endpoint);
    println!("  Model: {}", config.llm.model);
    println!("  Temperature: {}", config.llm.temperature);
    println!("  Max tokens: {}", config.llm.max_tokens);
    println!("  Probe interval: {}s", config.llm.probe_interval_secs);
    println!();

    println!("🔍 Search:");
    println!("  Default top_k: {}", config.search.default_top_k);
    println!();

    println!("📝 Logging:");
    println!("  Level: {}", config.logging.level);
    println!("  Directory: {}", config.logging.directory);
}

/// Mask database URL for logging (hide password)
fn mask_database_url(url: &str) -> String {
    if let Ok(parsed) = url::Url::parse(url) {
        if let Some(host) = parsed.host_str() {
            format!(
                "{}://{}@{}:{}{}",
                parsed.scheme(),
                parsed.username(),
                host,
                parsed.port().unwrap_or(5432),
                parsed.path()
            )
        } else {
            "***masked***".to_string()
        }
    } else {
        "***invalid***".to_string()
    }
}

pub fn print_info(msg: &str) {
    println!("ℹ️  {msg}");
}

pub fn print_success(msg: &str) {
    println!("✅ {msg}");
}

pub fn print_warning(msg: &str) {
    println!("⚠️  {msg}");
}

pub fn print_error(msg: &str) {
    eprintln!("❌ {msg}");
}
