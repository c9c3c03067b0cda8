//! Deterministic stand-ins for the embedding and generation services
//!
//! Used by the unit and integration tests, and handy for exercising the API
//! without Ollama running.

use std::collections::VecDeque;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::districts::fold;
use crate::embeddings::Embedder;
use crate::embeddings::index_venues;
use crate::errors::Result;
use crate::errors::TopgoError;
use crate::llm::GenerationParams;
use crate::llm::Generator;
use crate::models::Venue;
use crate::rag::VenueRetriever;
use crate::store::InMemoryVenueStore;

/// Keywords that make up the axes of [`KeywordEmbedder`] vectors
pub const KEYWORD_AXES: &[&str] = &[
    "lau", "bar", "karaoke", "pho", "view", "sang trong", "binh dan", "gia dinh",
];

/// Embeds text as keyword presence flags over [`KEYWORD_AXES`]
///
/// Texts sharing keywords end up close together, which keeps retrieval
/// order predictable in tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeywordEmbedder;

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let folded = fold(text);
        Ok(KEYWORD_AXES
            .iter()
            .map(|kw| if folded.contains(kw) { 1.0 } else { 0.0 })
            .collect())
    }

    fn dimension(&self) -> usize {
        KEYWORD_AXES.len()
    }
}

/// An embedder that always fails
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingEmbedder;

#[async_trait]
impl Embedder for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(TopgoError::Embedding("embedding service unavailable".to_string()))
    }

    fn dimension(&self) -> usize {
        KEYWORD_AXES.len()
    }
}

/// Generator that replays queued replies and records every prompt
pub struct ScriptedGenerator {
    online: AtomicBool,
    replies: Mutex<VecDeque<Result<String>>>,
    fallback: String,
    prompts: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl ScriptedGenerator {
    /// A reachable generator answering `fallback` once the queue is empty
    pub fn new(fallback: impl Into<String>) -> Self {
        Self {
            online: AtomicBool::new(true),
            replies: Mutex::new(VecDeque::new()),
            fallback: fallback.into(),
            prompts: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// A generator whose probe reports it unreachable
    pub fn offline() -> Self {
        let generator = Self::new("");
        generator.set_online(false);
        generator
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    pub fn push_reply(&self, reply: impl Into<String>) -> &Self {
        self.lock_replies().push_back(Ok(reply.into()));
        self
    }

    pub fn push_error(&self, error: TopgoError) -> &Self {
        self.lock_replies().push_back(Err(error));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }

    fn lock_replies(&self) -> std::sync::MutexGuard<'_, VecDeque<Result<String>>> {
        self.replies
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    async fn generate(
        &self,
        prompt: &str,
        system: Option<&str>,
        _params: GenerationParams,
    ) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(crate::llm::compose_prompt(prompt, system));
        }

        if !self.online.load(Ordering::SeqCst) {
            return Err(TopgoError::Llm("connection refused".to_string()));
        }
        let next = self.lock_replies().pop_front();
        next.unwrap_or_else(|| Ok(self.fallback.clone()))
    }

    async fn check_connection(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    async fn list_models(&self) -> Result<Vec<String>> {
        if self.online.load(Ordering::SeqCst) {
            Ok(vec!["qwen2:1.5b".to_string()])
        } else {
            Err(TopgoError::Llm("connection refused".to_string()))
        }
    }

    fn model(&self) -> &str {
        "qwen2:1.5b"
    }
}

fn venue(
    id: &str,
    name: &str,
    district: &str,
    business_type: &str,
    price_range: &str,
    searchable_text: &str,
) -> Venue {
    Venue {
        id: id.to_string(),
        name: name.to_string(),
        address: format!("{name}, {district}, Hà Nội"),
        district: district.to_string(),
        phone: "0913515351".to_string(),
        business_type: business_type.to_string(),
        price_range: price_range.to_string(),
        cuisine_type: vec!["Việt".to_string()],
        features: vec!["Gia Đình".to_string()],
        description: searchable_text.to_string(),
        url: format!("https://topgo.vn/{id}"),
        searchable_text: searchable_text.to_string(),
    }
}

/// A small fixed venue set spread over districts, types and price tiers
pub fn sample_venues() -> Vec<Venue> {
    vec![
        venue("v1", "Lẩu Phan", "Cầu Giấy", "restaurant", "binh_dan", "lẩu bình dân"),
        venue("v2", "Lẩu Nấm Ashima", "Hoàn Kiếm", "restaurant", "cao_cap", "lẩu sang trọng"),
        venue("v3", "Skyline Bar", "Tây Hồ", "bar", "cao_cap", "bar view hồ Tây sang trọng"),
        venue("v4", "Phở Thìn", "Hai Bà Trưng", "restaurant", "binh_dan", "phở bình dân"),
        venue("v5", "Karaoke Nice", "Cầu Giấy", "karaoke", "trung_binh", "karaoke gia đình"),
        venue("v6", "Cơm Việt Heritage", "Cầu Giấy", "restaurant", "trung_binh", "cơm gia đình"),
    ]
}

/// A retriever over [`sample_venues`] in an in-memory store
pub async fn sample_retriever() -> Result<VenueRetriever> {
    let store = Arc::new(InMemoryVenueStore::new(KEYWORD_AXES.len()));
    index_venues(&KeywordEmbedder, store.as_ref(), &sample_venues(), 32).await?;
    Ok(VenueRetriever::new(store, Arc::new(KeywordEmbedder)))
}
