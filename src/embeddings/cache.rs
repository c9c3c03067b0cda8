//! Query embedding cache
//!
//! Chat traffic repeats the same short queries a lot, so query embeddings
//! are memoized in a bounded moka cache. Batch calls (indexing) bypass it.

use std::sync::Arc;

use async_trait::async_trait;
use moka::future::Cache;
use tracing::debug;

use super::Embedder;
use crate::errors::Result;

pub struct CachedEmbedder {
    inner: Arc<dyn Embedder>,
    entries: Cache<String, Arc<Vec<f32>>>,
}

impl CachedEmbedder {
    pub fn new(inner: Arc<dyn Embedder>, capacity: usize) -> Self {
        Self {
            inner,
            entries: Cache::builder().max_capacity(capacity as u64).build(),
        }
    }

    /// Approximate until pending maintenance has run
    pub fn entry_count(&self) -> u64 {
        self.entries.entry_count()
    }

    fn key(text: &str) -> String {
        text.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

#[async_trait]
impl Embedder for CachedEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let key = Self::key(text);
        if let Some(hit) = self.entries.get(&key).await {
            debug!("Embedding cache hit");
            return Ok(hit.as_ref().clone());
        }

        let embedding = self.inner.embed(text).await?;
        self.entries.insert(key, Arc::new(embedding.clone())).await;
        Ok(embedding)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.inner.embed_batch(texts).await
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }
}
