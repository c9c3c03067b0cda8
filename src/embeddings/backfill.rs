//! Embed processed venue data and load it into a vector store

use std::path::Path;

use tracing::info;
use tracing::warn;

use super::Embedder;
use crate::districts;
use crate::errors::Result;
use crate::models::PriceTier;
use crate::models::Venue;
use crate::store::IndexedVenue;
use crate::store::VenueStore;

/// Venues per store write
pub const UPSERT_CHUNK_SIZE: usize = 100;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IndexStats {
    pub total: usize,
    pub embedded: usize,
    pub stored: usize,
    pub batches: usize,
}

/// Read the processor's JSON array of venues
pub fn load_venues<P: AsRef<Path>>(path: P) -> Result<Vec<Venue>> {
    let path = path.as_ref();
    info!("Loading venues from {}", path.display());
    let content = std::fs::read_to_string(path)?;
    parse_venues(&content)
}

/// Parse a JSON array of venues, filling in ids and canonical filter fields
pub fn parse_venues(json: &str) -> Result<Vec<Venue>> {
    let mut venues: Vec<Venue> = serde_json::from_str(json)?;
    for (index, venue) in venues.iter_mut().enumerate() {
        normalize_venue(venue, index);
    }
    info!("Loaded {} venues", venues.len());
    Ok(venues)
}

/// Store filterable fields in the exact form filters compare against
fn normalize_venue(venue: &mut Venue, index: usize) {
    if venue.id.trim().is_empty() {
        venue.id = format!("rest_{index}");
    }
    if let Some(district) = districts::resolve(&venue.district) {
        venue.district = district.name.to_string();
    }
    venue.business_type = venue.business_type.trim().to_lowercase();
    if let Ok(tier) = venue.price_range.parse::<PriceTier>() {
        venue.price_range = tier.as_str().to_string();
    }
}

/// Embed venues in batches and upsert them into the store
pub async fn index_venues(
    embedder: &dyn Embedder,
    store: &dyn VenueStore,
    venues: &[Venue],
    batch_size: usize,
) -> Result<IndexStats> {
    let batch_size = batch_size.max(1);
    let mut stats = IndexStats {
        total: venues.len(),
        ..IndexStats::default()
    };

    info!("Creating embeddings for {} venues", venues.len());

    let mut pending: Vec<IndexedVenue> = Vec::with_capacity(UPSERT_CHUNK_SIZE);
    let total_batches = venues.len().div_ceil(batch_size);

    for (batch_idx, chunk) in venues.chunks(batch_size).enumerate() {
        let documents: Vec<String> = chunk.iter().map(Venue::document).collect();
        let embeddings = embedder.embed_batch(&documents).await?;

        if embeddings.len() != chunk.len() {
            warn!(
                "Embedding batch {} returned {} vectors for {} venues",
                batch_idx + 1,
                embeddings.len(),
                chunk.len()
            );
        }

        for ((venue, document), embedding) in chunk.iter().zip(documents).zip(embeddings) {
            pending.push(IndexedVenue {
                venue: venue.clone(),
                document,
                embedding,
            });
            stats.embedded += 1;
        }
        stats.batches += 1;

        info!(
            "Embedded batch {}/{} ({} venues)",
            batch_idx + 1,
            total_batches,
            chunk.len()
        );

        while pending.len() >= UPSERT_CHUNK_SIZE {
            let rest = pending.split_off(UPSERT_CHUNK_SIZE);
            stats.stored += store.upsert(&pending).await?;
            pending = rest;
        }
    }

    if !pending.is_empty() {
        stats.stored += store.upsert(&pending).await?;
    }

    info!(
        "Indexing complete: {} embedded, {} stored",
        stats.embedded, stats.stored
    );

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::models::SearchFilters;
    use crate::store::InMemoryVenueStore;

    struct LengthEmbedder;

    #[async_trait]
    impl Embedder for LengthEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            Ok(vec![text.chars().count() as f32, 0.0])
        }

        fn dimension(&self) -> usize {
            2
        }
    }

    const SAMPLE: &str = r#"[
        {"id": "a1", "name": "Cơm Việt", "district": "cau giay", "business_type": "Restaurant",
         "price_range": "Binh Dan", "cuisine_type": ["Việt"], "searchable_text": "cơm việt gia đình"},
        {"name": "Le Bar", "district": "Tây Hồ", "business_type": "bar", "price_range": "cao_cap",
         "description": "view hồ", "address": "Quảng An"},
        {"name": "Sing Sing", "district": "Quận 1", "business_type": "karaoke"}
    ]"#;

    #[test]
    fn test_parse_venues_normalizes_fields() {
        let venues = parse_venues(SAMPLE).unwrap();
        assert_eq!(venues.len(), 3);

        assert_eq!(venues[0].id, "a1");
        assert_eq!(venues[0].district, "Cầu Giấy");
        assert_eq!(venues[0].business_type, "restaurant");
        assert_eq!(venues[0].price_range, "binh_dan");

        assert_eq!(venues[1].id, "rest_1");
        assert_eq!(venues[1].document(), "Le Bar view hồ Quảng An");

        // Unknown districts are kept verbatim
        assert_eq!(venues[2].district, "Quận 1");
        assert_eq!(venues[2].price_range, "");
    }

    #[test]
    fn test_load_venues_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("restaurants_clean.json");
        std::fs::write(&path, SAMPLE).unwrap();

        assert_eq!(load_venues(&path).unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_index_venues_batches_and_stores() {
        let venues: Vec<Venue> = (0..250)
            .map(|i| Venue {
                id: format!("v{i}"),
                name: format!("Venue {i}"),
                ..Venue::default()
            })
            .collect();

        let store = InMemoryVenueStore::new(2);
        let stats = index_venues(&LengthEmbedder, &store, &venues, 32).await.unwrap();

        assert_eq!(stats.total, 250);
        assert_eq!(stats.embedded, 250);
        assert_eq!(stats.stored, 250);
        assert_eq!(stats.batches, 8);
        assert_eq!(store.count().await.unwrap(), 250);
    }

    #[tokio::test]
    async fn test_reindex_replaces_records() {
        let venues = parse_venues(SAMPLE).unwrap();
        let store = InMemoryVenueStore::new(2);

        index_venues(&LengthEmbedder, &store, &venues, 32).await.unwrap();
        index_venues(&LengthEmbedder, &store, &venues, 32).await.unwrap();

        assert_eq!(store.count().await.unwrap(), 3);
        let bars = store
            .nearest(&[0.0, 0.0], 10, &SearchFilters::by_district("tay ho").unwrap())
            .await
            .unwrap();
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].0.name, "Le Bar");
    }
}
