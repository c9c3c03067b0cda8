//! Vector store abstraction over indexed venues
//!
//! Two backends implement [`VenueStore`]: Postgres with pgvector
//! ([`crate::database::PgVenueStore`]) and the brute-force
//! [`InMemoryVenueStore`]. Both report plain L2 distances; turning those into
//! similarity scores is the retriever's job.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::errors::Result;
use crate::errors::TopgoError;
use crate::models::SearchFilters;
use crate::models::Venue;

/// A venue ready to be written to a store
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedVenue {
    pub venue: Venue,
    /// The text the embedding was computed from
    pub document: String,
    pub embedding: Vec<f32>,
}

#[async_trait]
pub trait VenueStore: Send + Sync {
    /// Insert or replace venues keyed by id; returns the number written
    async fn upsert(&self, venues: &[IndexedVenue]) -> Result<usize>;

    /// The `k` venues closest to `embedding` that satisfy every filter,
    /// nearest first, paired with their L2 distance
    async fn nearest(
        &self,
        embedding: &[f32],
        k: usize,
        filters: &SearchFilters,
    ) -> Result<Vec<(Venue, f32)>>;

    async fn count(&self) -> Result<usize>;
}

/// Brute-force store kept entirely in memory
pub struct InMemoryVenueStore {
    dimension: usize,
    entries: RwLock<HashMap<String, IndexedVenue>>,
}

impl InMemoryVenueStore {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub const fn dimension(&self) -> usize {
        self.dimension
    }
}

#[async_trait]
impl VenueStore for InMemoryVenueStore {
    async fn upsert(&self, venues: &[IndexedVenue]) -> Result<usize> {
        if let Some(bad) = venues.iter().find(|v| v.embedding.len() != self.dimension) {
            return Err(TopgoError::Store(format!(
                "venue {} has embedding dimension {}, expected {}",
                bad.venue.id,
                bad.embedding.len(),
                self.dimension
            )));
        }

        let mut entries = self.entries.write().await;
        for venue in venues {
            entries.insert(venue.venue.id.clone(), venue.clone());
        }
        Ok(venues.len())
    }

    async fn nearest(
        &self,
        embedding: &[f32],
        k: usize,
        filters: &SearchFilters,
    ) -> Result<Vec<(Venue, f32)>> {
        if embedding.len() != self.dimension {
            return Err(TopgoError::Store(format!(
                "query embedding has dimension {}, expected {}",
                embedding.len(),
                self.dimension
            )));
        }

        let entries = self.entries.read().await;
        let mut scored: Vec<(Venue, f32)> = entries
            .values()
            .filter(|entry| filters.matches(&entry.venue))
            .map(|entry| (entry.venue.clone(), l2_distance(embedding, &entry.embedding)))
            .collect();

        scored.sort_by(|a, b| {
            a.1.partial_cmp(&b.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.id.cmp(&b.0.id))
        });
        scored.truncate(k);

        Ok(scored)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.entries.read().await.len())
    }
}

/// Euclidean distance, matching pgvector's `<->`
pub fn l2_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BusinessType;

    fn indexed(id: &str, district: &str, business_type: &str, embedding: Vec<f32>) -> IndexedVenue {
        IndexedVenue {
            venue: Venue {
                id: id.into(),
                name: format!("Venue {id}"),
                district: district.into(),
                business_type: business_type.into(),
                price_range: "trung_binh".into(),
                ..Venue::default()
            },
            document: format!("Venue {id}"),
            embedding,
        }
    }

    #[tokio::test]
    async fn test_nearest_orders_by_distance() {
        let store = InMemoryVenueStore::new(2);
        store
            .upsert(&[
                indexed("far", "Ba Đình", "restaurant", vec![10.0, 0.0]),
                indexed("near", "Ba Đình", "restaurant", vec![1.0, 0.0]),
                indexed("exact", "Ba Đình", "restaurant", vec![0.0, 0.0]),
            ])
            .await
            .unwrap();

        let hits = store.nearest(&[0.0, 0.0], 2, &SearchFilters::default()).await.unwrap();
        let ids: Vec<_> = hits.iter().map(|(v, _)| v.id.as_str()).collect();
        assert_eq!(ids, vec!["exact", "near"]);
        assert!((hits[0].1).abs() < f32::EPSILON);
        assert!((hits[1].1 - 1.0).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn test_nearest_applies_filters() {
        let store = InMemoryVenueStore::new(2);
        store
            .upsert(&[
                indexed("a", "Tây Hồ", "bar", vec![0.0, 0.0]),
                indexed("b", "Tây Hồ", "restaurant", vec![0.1, 0.0]),
                indexed("c", "Cầu Giấy", "bar", vec![0.2, 0.0]),
            ])
            .await
            .unwrap();

        let filters = SearchFilters {
            district: Some("Tây Hồ".into()),
            business_type: Some(BusinessType::Restaurant),
            price_range: None,
        };
        let hits = store.nearest(&[0.0, 0.0], 5, &filters).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0.id, "b");
    }

    #[tokio::test]
    async fn test_upsert_replaces_by_id() {
        let store = InMemoryVenueStore::new(2);
        store.upsert(&[indexed("a", "Tây Hồ", "bar", vec![0.0, 0.0])]).await.unwrap();
        store.upsert(&[indexed("a", "Hoàn Kiếm", "bar", vec![1.0, 1.0])]).await.unwrap();

        assert_eq!(store.count().await.unwrap(), 1);
        let hits = store.nearest(&[1.0, 1.0], 1, &SearchFilters::default()).await.unwrap();
        assert_eq!(hits[0].0.district, "Hoàn Kiếm");
    }

    #[tokio::test]
    async fn test_dimension_mismatch_rejected() {
        let store = InMemoryVenueStore::new(3);
        let result = store.upsert(&[indexed("a", "Tây Hồ", "bar", vec![0.0, 0.0])]).await;
        assert!(matches!(result, Err(TopgoError::Store(_))));

        let result = store.nearest(&[0.0], 1, &SearchFilters::default()).await;
        assert!(matches!(result, Err(TopgoError::Store(_))));
    }

    #[test]
    fn test_l2_distance() {
        assert!((l2_distance(&[0.0, 0.0], &[3.0, 4.0]) - 5.0).abs() < f32::EPSILON);
        assert!(l2_distance(&[1.0, 2.0], &[1.0, 2.0]).abs() < f32::EPSILON);
    }
}
