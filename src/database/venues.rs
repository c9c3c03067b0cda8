use std::collections::HashMap;

use async_trait::async_trait;
use pgvector::Vector;
use sqlx::Postgres;
use sqlx::QueryBuilder;

use super::Database;
use crate::models::SearchFilters;
use crate::models::Venue;
use crate::store::IndexedVenue;
use crate::store::VenueStore;
use crate::Result;
use crate::TopgoError;

const VENUE_COLUMNS: &str = "id, name, address, district, phone, business_type, price_range, \
                             cuisine_type, features, description, url, document, embedding";

/// pgvector-backed venue store
#[derive(Debug, Clone)]
pub struct PgVenueStore {
    database: Database,
    dimension: usize,
}

#[derive(sqlx::FromRow)]
struct VenueRow {
    id: String,
    name: String,
    address: String,
    district: String,
    phone: String,
    business_type: String,
    price_range: String,
    cuisine_type: Vec<String>,
    features: Vec<String>,
    description: String,
    url: String,
    document: String,
    distance: f64,
}

impl VenueRow {
    fn into_hit(self) -> (Venue, f32) {
        let venue = Venue {
            id: self.id,
            name: self.name,
            address: self.address,
            district: self.district,
            phone: self.phone,
            business_type: self.business_type,
            price_range: self.price_range,
            cuisine_type: self.cuisine_type,
            features: self.features,
            description: self.description,
            url: self.url,
            searchable_text: self.document,
        };
        (venue, self.distance as f32)
    }
}

impl PgVenueStore {
    pub const fn new(database: Database, dimension: usize) -> Self {
        Self {
            database,
            dimension,
        }
    }

    /// Connect-time setup: make sure the table and indexes exist
    pub async fn ensure_schema(&self, vector_index: bool) -> Result<()> {
        self.database.init_schema(self.dimension, vector_index).await
    }

    pub const fn database(&self) -> &Database {
        &self.database
    }
}

/// Append `WHERE col = $n AND ...` for every active filter
fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, filters: &SearchFilters) {
    let mut clauses: Vec<(&str, String)> = Vec::new();
    if let Some(district) = &filters.district {
        clauses.push(("district", district.clone()));
    }
    if let Some(business_type) = filters.business_type {
        clauses.push(("business_type", business_type.as_str().to_string()));
    }
    if let Some(price) = filters.price_range {
        clauses.push(("price_range", price.as_str().to_string()));
    }

    for (i, (column, value)) in clauses.into_iter().enumerate() {
        builder.push(if i == 0 { " WHERE " } else { " AND " });
        builder.push(column);
        builder.push(" = ");
        builder.push_bind(value);
    }
}

fn nearest_query<'a>(
    embedding: &[f32],
    k: usize,
    filters: &SearchFilters,
) -> QueryBuilder<'a, Postgres> {
    let mut builder = QueryBuilder::new(
        "SELECT id, name, address, district, phone, business_type, price_range, \
         cuisine_type, features, description, url, document, embedding <-> ",
    );
    builder.push_bind(Vector::from(embedding.to_vec()));
    builder.push(" AS distance FROM venues");
    push_filters(&mut builder, filters);
    builder.push(" ORDER BY distance LIMIT ");
    builder.push_bind(k as i64);
    builder
}

/// One row per id, the last occurrence winning
///
/// A single `INSERT .. ON CONFLICT DO UPDATE` cannot touch the same row twice.
fn dedupe_by_id(venues: &[IndexedVenue]) -> Vec<&IndexedVenue> {
    let last: HashMap<&str, usize> = venues
        .iter()
        .enumerate()
        .map(|(idx, item)| (item.venue.id.as_str(), idx))
        .collect();

    venues
        .iter()
        .enumerate()
        .filter(|(idx, item)| last.get(item.venue.id.as_str()) == Some(idx))
        .map(|(_, item)| item)
        .collect()
}

#[async_trait]
impl VenueStore for PgVenueStore {
    async fn upsert(&self, venues: &[IndexedVenue]) -> Result<usize> {
        if venues.is_empty() {
            return Ok(0);
        }
        if let Some(bad) = venues.iter().find(|v| v.embedding.len() != self.dimension) {
            return Err(TopgoError::Store(format!(
                "venue {} has embedding dimension {}, expected {}",
                bad.venue.id,
                bad.embedding.len(),
                self.dimension
            )));
        }

        let mut builder: QueryBuilder<'_, Postgres> =
            QueryBuilder::new(format!("INSERT INTO venues ({VENUE_COLUMNS}) "));

        let rows = dedupe_by_id(venues);
        if rows.len() < venues.len() {
            tracing::debug!("Dropped {} duplicate venue ids", venues.len() - rows.len());
        }
        builder.push_values(rows, |mut b, item| {
            let v = &item.venue;
            b.push_bind(v.id.clone())
                .push_bind(v.name.clone())
                .push_bind(v.address.clone())
                .push_bind(v.district.clone())
                .push_bind(v.phone.clone())
                .push_bind(v.business_type.clone())
                .push_bind(v.price_range.clone())
                .push_bind(v.cuisine_type.clone())
                .push_bind(v.features.clone())
                .push_bind(v.description.clone())
                .push_bind(v.url.clone())
                .push_bind(item.document.clone())
                .push_bind(Vector::from(item.embedding.clone()));
        });

        builder.push(
            " ON CONFLICT (id) DO UPDATE SET \
             name = EXCLUDED.name, \
             address = EXCLUDED.address, \
             district = EXCLUDED.district, \
             phone = EXCLUDED.phone, \
             business_type = EXCLUDED.business_type, \
             price_range = EXCLUDED.price_range, \
             cuisine_type = EXCLUDED.cuisine_type, \
             features = EXCLUDED.features, \
             description = EXCLUDED.description, \
             url = EXCLUDED.url, \
             document = EXCLUDED.document, \
             embedding = EXCLUDED.embedding, \
             updated_at = NOW()",
        );

        let result = builder.build().execute(self.database.pool()).await?;
        tracing::debug!("Upserted {} venues", result.rows_affected());

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

        let rows = nearest_query(embedding, k, filters)
            .build_query_as::<VenueRow>()
            .fetch_all(self.database.pool())
            .await?;

        Ok(rows.into_iter().map(VenueRow::into_hit).collect())
    }

    async fn count(&self) -> Result<usize> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM venues")
            .fetch_one(self.database.pool())
            .await?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BusinessType;
    use crate::models::PriceTier;

    #[test]
    fn test_nearest_query_without_filters() {
        let builder = nearest_query(&[0.1, 0.2], 5, &SearchFilters::default());
        let sql = builder.sql();
        assert!(sql.contains("embedding <-> $1 AS distance FROM venues ORDER BY distance LIMIT $2"));
        assert!(!sql.contains("WHERE"));
    }

    #[test]
    fn test_nearest_query_with_all_filters() {
        let filters = SearchFilters {
            district: Some("Cầu Giấy".into()),
            business_type: Some(BusinessType::Bar),
            price_range: Some(PriceTier::CaoCap),
        };
        let builder = nearest_query(&[0.1, 0.2], 3, &filters);
        let sql = builder.sql();
        assert!(sql.contains(
            " WHERE district = $2 AND business_type = $3 AND price_range = $4 ORDER BY distance LIMIT $5"
        ));
    }

    fn indexed(id: &str, document: &str) -> IndexedVenue {
        IndexedVenue {
            venue: Venue {
                id: id.into(),
                ..Venue::default()
            },
            document: document.into(),
            embedding: vec![0.0, 1.0],
        }
    }

    #[test]
    fn test_dedupe_keeps_last_occurrence() {
        let venues = vec![
            indexed("v1", "first"),
            indexed("v2", "only"),
            indexed("v1", "second"),
            indexed("v3", "only"),
            indexed("v1", "third"),
        ];

        let rows = dedupe_by_id(&venues);
        let kept: Vec<(&str, &str)> = rows
            .iter()
            .map(|item| (item.venue.id.as_str(), item.document.as_str()))
            .collect();
        assert_eq!(kept, vec![("v2", "only"), ("v3", "only"), ("v1", "third")]);
    }

    #[test]
    fn test_dedupe_without_duplicates_is_identity() {
        let venues = vec![indexed("a", "x"), indexed("b", "y")];
        let rows = dedupe_by_id(&venues);
        assert_eq!(rows, vec![&venues[0], &venues[1]]);
    }

    #[test]
    fn test_nearest_query_single_filter() {
        let filters = SearchFilters::by_price(PriceTier::BinhDan);
        let builder = nearest_query(&[0.0], 1, &filters);
        assert!(builder.sql().contains(" WHERE price_range = $2 ORDER BY"));
    }
}
