use super::Database;
use crate::Result;
use crate::TopgoError;

impl Database {
    /// Dimension of the `venues.embedding` column, if the table exists
    pub async fn embedding_dimension(&self) -> Result<Option<usize>> {
        // pgvector stores the dimension as the column's typmod
        let typmod = sqlx::query_scalar::<_, i32>(
            r"
            SELECT a.atttypmod
            FROM pg_attribute a
            JOIN pg_class c ON a.attrelid = c.oid
            WHERE c.relname = 'venues'
            AND a.attname = 'embedding'
            AND NOT a.attisdropped
            ",
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(typmod.filter(|t| *t > 0).map(|t| t as usize))
    }

    /// Create the pgvector extension, the venues table and its indexes
    pub async fn init_schema(&self, dimension: usize, vector_index: bool) -> Result<()> {
        sqlx::query("CREATE EXTENSION IF NOT EXISTS vector")
            .execute(&self.pool)
            .await
            .map_err(|e| {
                TopgoError::Store(format!(
                    "could not enable the pgvector extension ({e}); run \
                     `CREATE EXTENSION vector;` as a superuser"
                ))
            })?;

        // The dimension is part of the column type and cannot be bound
        sqlx::query(&format!(
            r"
            CREATE TABLE IF NOT EXISTS venues (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                address TEXT NOT NULL DEFAULT '',
                district TEXT NOT NULL DEFAULT '',
                phone TEXT NOT NULL DEFAULT '',
                business_type TEXT NOT NULL DEFAULT '',
                price_range TEXT NOT NULL DEFAULT '',
                cuisine_type TEXT[] NOT NULL DEFAULT '{{}}',
                features TEXT[] NOT NULL DEFAULT '{{}}',
                description TEXT NOT NULL DEFAULT '',
                url TEXT NOT NULL DEFAULT '',
                document TEXT NOT NULL,
                embedding VECTOR({dimension}) NOT NULL,
                updated_at TIMESTAMP WITH TIME ZONE DEFAULT NOW()
            )
            "
        ))
        .execute(&self.pool)
        .await?;

        if let Some(existing) = self.embedding_dimension().await? {
            if existing != dimension {
                return Err(TopgoError::Config(format!(
                    "venues.embedding has dimension {existing} but embeddings.dimension is {dimension}"
                )));
            }
        }

        for column in ["district", "business_type", "price_range"] {
            sqlx::query(&format!(
                "CREATE INDEX IF NOT EXISTS idx_venues_{column} ON venues ({column})"
            ))
            .execute(&self.pool)
            .await?;
        }

        if vector_index {
            sqlx::query(
                "CREATE INDEX IF NOT EXISTS idx_venues_embedding_hnsw \
                 ON venues USING hnsw (embedding vector_l2_ops)",
            )
            .execute(&self.pool)
            .await?;
        }

        tracing::info!("Venue schema ready (dimension {dimension})");
        Ok(())
    }
}
