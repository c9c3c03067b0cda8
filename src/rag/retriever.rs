//! Semantic venue retrieval

use std::sync::Arc;

use tracing::debug;
use tracing::info;

use crate::config::AppConfig;
use crate::config::StoreBackend;
use crate::database::Database;
use crate::database::PgVenueStore;
use crate::embeddings::build_embedder;
use crate::embeddings::index_venues;
use crate::embeddings::load_venues;
use crate::embeddings::Embedder;
use crate::errors::Result;
use crate::errors::TopgoError;
use crate::models::similarity_from_distance;
use crate::models::BusinessType;
use crate::models::PriceTier;
use crate::models::SearchFilters;
use crate::models::VenueHit;
use crate::store::InMemoryVenueStore;
use crate::store::VenueStore;

/// Embeds queries and looks up the nearest venues
#[derive(Clone)]
pub struct VenueRetriever {
    store: Arc<dyn VenueStore>,
    embedder: Arc<dyn Embedder>,
}

impl VenueRetriever {
    pub fn new(store: Arc<dyn VenueStore>, embedder: Arc<dyn Embedder>) -> Self {
        Self { store, embedder }
    }

    /// Connect the configured store and embedder
    ///
    /// The in-memory backend embeds `store.seed_file` before returning.
    pub async fn from_config(config: &AppConfig) -> Result<Self> {
        let embedder = build_embedder(&config.embeddings)?;
        let dimension = config.embeddings.dimension;

        let store: Arc<dyn VenueStore> = match config.store.backend {
            StoreBackend::Postgres => {
                let database = Database::from_config(&config.database).await?;
                let store = PgVenueStore::new(database, dimension);
                store
                    .ensure_schema(config.database.create_vector_index)
                    .await?;
                Arc::new(store)
            }
            StoreBackend::Memory => {
                let store = InMemoryVenueStore::new(dimension);
                if let Some(seed_file) = &config.store.seed_file {
                    let venues = load_venues(seed_file)?;
                    let stats = index_venues(
                        embedder.as_ref(),
                        &store,
                        &venues,
                        config.embeddings.batch_size,
                    )
                    .await?;
                    info!("Seeded in-memory store with {} venues", stats.stored);
                }
                Arc::new(store)
            }
        };

        Ok(Self::new(store, embedder))
    }

    /// Nearest `n_results` venues matching every filter, best first
    pub async fn search(
        &self,
        query: &str,
        n_results: usize,
        filters: &SearchFilters,
    ) -> Result<Vec<VenueHit>> {
        debug!("Performing semantic search: {} (filters: {:?})", query, filters);

        if let Some(district) = &filters.district {
            // Filters built by hand may skip resolution
            if crate::districts::resolve(district).is_none() {
                return Err(TopgoError::InvalidDistrict(district.clone()));
            }
        }
        if n_results == 0 {
            return Ok(Vec::new());
        }

        let query_embedding = self.embedder.embed(query).await?;
        let nearest = self.store.nearest(&query_embedding, n_results, filters).await?;

        let hits: Vec<VenueHit> = nearest
            .into_iter()
            .enumerate()
            .map(|(idx, (venue, distance))| VenueHit {
                venue,
                similarity_score: similarity_from_distance(distance),
                rank: idx + 1,
            })
            .collect();

        debug!("Retrieved {} venues", hits.len());
        Ok(hits)
    }

    pub async fn search_by_type(
        &self,
        query: &str,
        business_type: BusinessType,
        n_results: usize,
    ) -> Result<Vec<VenueHit>> {
        self.search(query, n_results, &SearchFilters::by_type(business_type))
            .await
    }

    /// District given as free user input, e.g. `"cau giay"`
    pub async fn search_by_district(
        &self,
        query: &str,
        district: &str,
        n_results: usize,
    ) -> Result<Vec<VenueHit>> {
        let filters = SearchFilters::by_district(district)?;
        self.search(query, n_results, &filters).await
    }

    pub async fn search_by_price(
        &self,
        query: &str,
        price_range: PriceTier,
        n_results: usize,
    ) -> Result<Vec<VenueHit>> {
        self.search(query, n_results, &SearchFilters::by_price(price_range))
            .await
    }

    /// Number of indexed venues
    pub async fn count(&self) -> Result<usize> {
        self.store.count().await
    }

    pub fn store(&self) -> &Arc<dyn VenueStore> {
        &self.store
    }

    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }
}
