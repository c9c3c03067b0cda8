//! Embeddings generation module
//!
//! Venue documents and user queries are embedded by an external HTTP service:
//! - Ollama (`/api/embeddings`, one text per request)
//! - OpenAI-compatible endpoints (`/embeddings`, batched)
//!
//! Everything downstream talks to the [`Embedder`] trait so tests can swap
//! in a deterministic implementation.
//!
//! # Examples
//!
//! ```rust,no_run
//! use topgo_rag::config::AppConfig;
//! use topgo_rag::embeddings::build_embedder;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::load()?;
//!     let embedder = build_embedder(&config.embeddings)?;
//!
//!     let embedding = embedder.embed("quán lẩu ngon ở Cầu Giấy").await?;
//!     println!("Generated embedding with {} dimensions", embedding.len());
//!
//!     Ok(())
//! }
//! ```

pub mod backfill;
pub mod cache;
pub mod client;
pub mod text_preprocessing;

use std::sync::Arc;

use async_trait::async_trait;

pub use backfill::index_venues;
pub use backfill::load_venues;
pub use backfill::IndexStats;
pub use cache::CachedEmbedder;
pub use client::EmbeddingClient;
pub use client::EmbeddingProvider;
pub use text_preprocessing::preprocess_text_for_embedding;

use crate::config::EmbeddingsConfig;
use crate::errors::Result;

#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed several texts, preserving order
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await?);
        }
        Ok(embeddings)
    }

    /// Length of every vector this embedder returns
    fn dimension(&self) -> usize;
}

/// Build the configured embedder, wrapped in a query cache when enabled
pub fn build_embedder(config: &EmbeddingsConfig) -> Result<Arc<dyn Embedder>> {
    let client = EmbeddingClient::from_config(config)?;
    tracing::info!(
        "Embedding provider: {:?}, model: {}, dimension: {}",
        client.provider(),
        config.model,
        config.dimension
    );

    if config.cache_size == 0 {
        Ok(Arc::new(client))
    } else {
        Ok(Arc::new(CachedEmbedder::new(
            Arc::new(client),
            config.cache_size,
        )))
    }
}
