//! # Product Repository
//!
//! The pricing core's read-only window onto the external product catalog.
//!
//! ## Boundary Typing
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │              Characteristics: JSON in, typed struct out                 │
//! │                                                                         │
//! │  products.characteristics (TEXT)      '{"has_ring": true}'             │
//! │            │                                                            │
//! │            ▼  serde_json at THIS boundary                               │
//! │  Characteristics { has_ring: true }                                     │
//! │            │                                                            │
//! │            ▼                                                            │
//! │  adjustment::ring_surcharge(category, &characteristics)                 │
//! │                                                                         │
//! │  The free-form bag never travels through the pricing path; only the     │
//! │  validated struct does.                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Catalog CRUD belongs to the catalog subsystem; `insert` exists for
//! seeding and tests only.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use mercato_core::{Category, Characteristics, Product};

const SELECT_PRODUCT: &str = "SELECT id, category, base_price_cents, promo_price_cents, \
     promo_active, active, stock, characteristics, created_at, updated_at FROM products";

/// Raw row shape; `characteristics` is still JSON text here.
#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: String,
    category: Category,
    base_price_cents: i64,
    promo_price_cents: Option<i64>,
    promo_active: bool,
    active: bool,
    stock: i64,
    characteristics: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ProductRow {
    /// Parses the JSON bag into the typed struct. A malformed bag is a data
    /// corruption, surfaced as a query failure rather than silently priced
    /// with defaults.
    fn into_product(self) -> DbResult<Product> {
        let characteristics: Characteristics = serde_json::from_str(&self.characteristics)
            .map_err(|e| {
                DbError::QueryFailed(format!(
                    "malformed characteristics for product {}: {e}",
                    self.id
                ))
            })?;

        Ok(Product {
            id: self.id,
            category: self.category,
            base_price_cents: self.base_price_cents,
            promo_price_cents: self.promo_price_cents,
            promo_active: self.promo_active,
            active: self.active,
            stock: self.stock,
            characteristics,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Repository for product reads (and test/seed writes).
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Gets a product by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found
    /// * `Ok(None)` - Product not found
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let mut conn = self.pool.acquire().await?;
        fetch_by_id(&mut conn, id).await
    }

    /// Checks whether stock covers the requested quantity.
    ///
    /// Fails fast with `NotFound` for an unknown product; a missing product
    /// is never reported as merely out of stock.
    pub async fn has_stock(&self, id: &str, quantity: i64) -> DbResult<bool> {
        debug!(id = %id, quantity, "Checking stock");

        let stock: Option<i64> = sqlx::query_scalar("SELECT stock FROM products WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match stock {
            Some(stock) => Ok(stock >= quantity),
            None => Err(DbError::not_found("Product", id)),
        }
    }

    /// Inserts a product (seed/test surface; catalog CRUD is external).
    pub async fn insert(&self, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, "Inserting product");

        let characteristics = serde_json::to_string(&product.characteristics)
            .map_err(|e| DbError::Internal(e.to_string()))?;

        sqlx::query(
            "INSERT INTO products ( \
                 id, category, base_price_cents, promo_price_cents, \
                 promo_active, active, stock, characteristics, \
                 created_at, updated_at \
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        )
        .bind(&product.id)
        .bind(product.category)
        .bind(product.base_price_cents)
        .bind(product.promo_price_cents)
        .bind(product.promo_active)
        .bind(product.active)
        .bind(product.stock)
        .bind(characteristics)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

// =============================================================================
// Transaction-Scoped Functions
// =============================================================================

/// Fetches a product by ID on an existing connection.
///
/// The cart ledger re-reads the product inside its mutation transaction so
/// the active/stock checks and the snapshot write observe one state.
pub async fn fetch_by_id(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Product>> {
    let row = sqlx::query_as::<_, ProductRow>(&format!("{SELECT_PRODUCT} WHERE id = ?1"))
        .bind(id)
        .fetch_optional(conn)
        .await?;

    row.map(ProductRow::into_product).transpose()
}

// =============================================================================
// Test Support
// =============================================================================

#[cfg(test)]
pub mod test_support {
    //! Shared product seeding for repository and engine tests.

    use super::*;
    use crate::pool::Database;
    use uuid::Uuid;

    /// Seeds a plain active fabric product with the given base price.
    pub async fn seed_product(db: &Database, base_price_cents: i64) -> Product {
        seed_product_with(db, |p| {
            p.base_price_cents = base_price_cents;
        })
        .await
    }

    /// Seeds a product after applying a customization closure.
    pub async fn seed_product_with(
        db: &Database,
        customize: impl FnOnce(&mut Product),
    ) -> Product {
        let now = Utc::now();
        let mut product = Product {
            id: Uuid::new_v4().to_string(),
            category: Category::Fabric,
            base_price_cents: 2000,
            promo_price_cents: None,
            promo_active: false,
            active: true,
            stock: 10_000,
            characteristics: Characteristics::default(),
            created_at: now,
            updated_at: now,
        };
        customize(&mut product);

        db.products().insert(&product).await.unwrap();
        product
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::pool::{Database, DbConfig};

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_get_roundtrip() {
        let db = test_db().await;
        let seeded = seed_product_with(&db, |p| {
            p.category = Category::Curtain;
            p.promo_price_cents = Some(1500);
            p.promo_active = true;
            p.characteristics = Characteristics { has_ring: true };
        })
        .await;

        let fetched = db.products().get_by_id(&seeded.id).await.unwrap().unwrap();
        assert_eq!(fetched.category, Category::Curtain);
        assert_eq!(fetched.promo_price_cents, Some(1500));
        assert!(fetched.promo_active);
        assert!(fetched.characteristics.has_ring);
    }

    #[tokio::test]
    async fn test_get_missing_product_is_none() {
        let db = test_db().await;
        assert!(db.products().get_by_id("ghost").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_has_stock() {
        let db = test_db().await;
        let p = seed_product_with(&db, |p| p.stock = 5).await;

        assert!(db.products().has_stock(&p.id, 5).await.unwrap());
        assert!(!db.products().has_stock(&p.id, 6).await.unwrap());
    }

    #[tokio::test]
    async fn test_has_stock_unknown_product_is_not_found() {
        let db = test_db().await;
        let err = db.products().has_stock("ghost", 1).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
