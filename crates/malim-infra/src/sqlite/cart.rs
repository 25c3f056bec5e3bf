//! SQLite cart repository.
//!
//! Implements `CartRepository` from `malim-core`. `save` replaces every line
//! inside one transaction so a crash never leaves a half-written cart.

use sqlx::Row;

use malim_core::cart::CartRepository;
use malim_types::cart::CartItem;
use malim_types::error::RepositoryError;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `CartRepository`.
#[derive(Clone)]
pub struct SqliteCartRepository {
    pool: DatabasePool,
}

impl SqliteCartRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

// ---------------------------------------------------------------------------
// Private Row type for SQLite-to-domain mapping
// ---------------------------------------------------------------------------

struct CartRow {
    variant_sku: String,
    product_id: String,
    name: String,
    color: String,
    size: Option<String>,
    price: f64,
    quantity: i64,
    image: Option<String>,
}

impl CartRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            variant_sku: row.try_get("variant_sku")?,
            product_id: row.try_get("product_id")?,
            name: row.try_get("name")?,
            color: row.try_get("color")?,
            size: row.try_get("size")?,
            price: row.try_get("price")?,
            quantity: row.try_get("quantity")?,
            image: row.try_get("image")?,
        })
    }

    fn into_item(self) -> Result<CartItem, RepositoryError> {
        let quantity = u32::try_from(self.quantity)
            .map_err(|e| RepositoryError::Query(format!("invalid quantity: {e}")))?;
        Ok(CartItem {
            product_id: self.product_id,
            variant_sku: self.variant_sku,
            name: self.name,
            color: self.color,
            size: self.size,
            price: self.price,
            quantity,
            image: self.image,
        })
    }
}

// ---------------------------------------------------------------------------
// CartRepository implementation
// ---------------------------------------------------------------------------

impl CartRepository for SqliteCartRepository {
    async fn load(&self) -> Result<Vec<CartItem>, RepositoryError> {
        let rows = sqlx::query(
            r#"SELECT variant_sku, product_id, name, color, size, price, quantity, image
               FROM cart_items ORDER BY position ASC"#,
        )
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        rows.iter()
            .map(|row| {
                CartRow::from_row(row)
                    .map_err(|e| RepositoryError::Query(e.to_string()))?
                    .into_item()
            })
            .collect()
    }

    async fn save(&self, items: &[CartItem]) -> Result<(), RepositoryError> {
        let mut tx = self
            .pool
            .writer
            .begin()
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        sqlx::query("DELETE FROM cart_items")
            .execute(&mut *tx)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        for (position, item) in items.iter().enumerate() {
            sqlx::query(
                r#"INSERT INTO cart_items
                   (variant_sku, product_id, name, color, size, price, quantity, image, position)
                   VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
            )
            .bind(&item.variant_sku)
            .bind(&item.product_id)
            .bind(&item.name)
            .bind(&item.color)
            .bind(&item.size)
            .bind(item.price)
            .bind(i64::from(item.quantity))
            .bind(&item.image)
            .bind(position as i64)
            .execute(&mut *tx)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(db) if db.is_unique_violation() => {
                    RepositoryError::Conflict(format!("duplicate cart line {}", item.variant_sku))
                }
                other => RepositoryError::Query(other.to_string()),
            })?;
        }

        tx.commit()
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        Ok(())
    }

    async fn clear(&self) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM cart_items")
            .execute(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        Ok(())
    }
}
