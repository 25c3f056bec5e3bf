//! SQLite catalog snapshot store.
//!
//! Implements `SnapshotStore` from `malim-core`. The snapshot is a single row
//! holding the product list as JSON text and the time it was taken.

use chrono::{DateTime, Utc};
use sqlx::Row;

use malim_core::catalog::SnapshotStore;
use malim_types::catalog::{CatalogSnapshot, Product};
use malim_types::error::RepositoryError;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `SnapshotStore`.
#[derive(Clone)]
pub struct SqliteSnapshotStore {
    pool: DatabasePool,
}

impl SqliteSnapshotStore {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    /// Remove the persisted snapshot.
    pub async fn clear(&self) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM catalog_snapshot")
            .execute(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        Ok(())
    }
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

impl SnapshotStore for SqliteSnapshotStore {
    async fn load_snapshot(&self) -> Result<Option<CatalogSnapshot>, RepositoryError> {
        let row = sqlx::query("SELECT taken_at, products FROM catalog_snapshot WHERE id = 1")
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let taken_at: String = row
            .try_get("taken_at")
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        let products: String = row
            .try_get("products")
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        let products: Vec<Product> = serde_json::from_str(&products)
            .map_err(|e| RepositoryError::Query(format!("invalid snapshot JSON: {e}")))?;

        Ok(Some(CatalogSnapshot {
            timestamp: parse_datetime(&taken_at)?,
            products,
        }))
    }

    async fn save_snapshot(&self, snapshot: &CatalogSnapshot) -> Result<(), RepositoryError> {
        let products = serde_json::to_string(&snapshot.products)
            .map_err(|e| RepositoryError::Query(format!("failed to serialize snapshot: {e}")))?;

        sqlx::query(
            r#"INSERT INTO catalog_snapshot (id, taken_at, products, updated_at)
               VALUES (1, ?, ?, ?)
               ON CONFLICT (id) DO UPDATE SET
                   taken_at = excluded.taken_at,
                   products = excluded.products,
                   updated_at = excluded.updated_at"#,
        )
        .bind(snapshot.timestamp.to_rfc3339())
        .bind(&products)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        tracing::debug!(count = snapshot.products.len(), "catalog snapshot saved");
        Ok(())
    }
}
