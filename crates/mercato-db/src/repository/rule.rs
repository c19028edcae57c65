//! # Pricing Rule Repository
//!
//! Database operations for quantity-tiered pricing rules.
//!
//! ## Variant Bucket Queries
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                 Why `variant IS ?` and not `variant = ?`                │
//! │                                                                         │
//! │  The NULL variant is a bucket of its own. With `=`, SQLite's            │
//! │  three-valued logic makes `variant = NULL` match nothing, silently      │
//! │  emptying the bucket every query touches. `IS` compares NULL to NULL    │
//! │  as equal, so one query shape serves both named buckets and the         │
//! │  NULL bucket.                                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## No Business Logic
//! Overlap validation and resolution tie-breaks live in `mercato-core`;
//! this module only fetches, inserts, updates and deletes rows. The
//! module-level functions taking `&mut SqliteConnection` exist so the
//! engine can run the overlap read and the write on one transaction.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use mercato_core::PriceRule;

const SELECT_RULE: &str = "SELECT id, product_id, variant, min_quantity, max_quantity, \
     unit_price_cents, active, created_at, updated_at FROM price_rules";

/// Repository for pricing-rule database operations.
#[derive(Debug, Clone)]
pub struct RuleRepository {
    pool: SqlitePool,
}

impl RuleRepository {
    /// Creates a new RuleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        RuleRepository { pool }
    }

    /// Gets a rule by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<PriceRule>> {
        let mut conn = self.pool.acquire().await?;
        fetch_by_id(&mut conn, id).await
    }

    /// Finds the active rules applicable to a quantity, most specific first.
    ///
    /// Candidates satisfy `min_quantity <= quantity <= max_quantity` (absent
    /// max = unbounded) within the exact (product, variant) bucket. Ordered
    /// by `min_quantity DESC` so the resolver's tie-break matches the
    /// storage order.
    pub async fn find_active_applicable(
        &self,
        product_id: &str,
        variant: Option<&str>,
        quantity: i64,
    ) -> DbResult<Vec<PriceRule>> {
        let mut conn = self.pool.acquire().await?;
        fetch_active_applicable(&mut conn, product_id, variant, quantity).await
    }

    /// Lists rules for a product across all variant buckets.
    ///
    /// ## Arguments
    /// * `include_inactive` - When false, only active rules are returned
    pub async fn find_for_product(
        &self,
        product_id: &str,
        include_inactive: bool,
    ) -> DbResult<Vec<PriceRule>> {
        debug!(product_id = %product_id, include_inactive, "Listing rules for product");

        let sql = if include_inactive {
            format!(
                "{SELECT_RULE} WHERE product_id = ?1 ORDER BY variant, min_quantity"
            )
        } else {
            format!(
                "{SELECT_RULE} WHERE product_id = ?1 AND active = 1 ORDER BY variant, min_quantity"
            )
        };

        let rules = sqlx::query_as::<_, PriceRule>(&sql)
            .bind(product_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rules)
    }

    /// Physically deletes a rule.
    ///
    /// Historical cart subtotals are snapshots and are intentionally left
    /// untouched by rule deletion.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting rule");

        let result = sqlx::query("DELETE FROM price_rules WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("PriceRule", id));
        }

        Ok(())
    }
}

// =============================================================================
// Transaction-Scoped Functions
// =============================================================================
// The overlap check and the write it guards must observe the same snapshot,
// so the engine passes one connection (inside a transaction) through all of
// these. SQLite's single-writer model then guarantees two concurrent
// overlapping creations can never both commit.

/// Fetches a rule by ID on an existing connection.
pub async fn fetch_by_id(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<PriceRule>> {
    let rule = sqlx::query_as::<_, PriceRule>(&format!("{SELECT_RULE} WHERE id = ?1"))
        .bind(id)
        .fetch_optional(conn)
        .await?;

    Ok(rule)
}

/// Fetches every **active** rule of one (product, variant) bucket.
///
/// This is the comparison set for overlap validation; inactive rules are
/// excluded by policy (retired tiers never block new ranges).
pub async fn fetch_active_bucket(
    conn: &mut SqliteConnection,
    product_id: &str,
    variant: Option<&str>,
) -> DbResult<Vec<PriceRule>> {
    let rules = sqlx::query_as::<_, PriceRule>(&format!(
        "{SELECT_RULE} WHERE product_id = ?1 AND variant IS ?2 AND active = 1 \
         ORDER BY min_quantity"
    ))
    .bind(product_id)
    .bind(variant)
    .fetch_all(conn)
    .await?;

    Ok(rules)
}

/// Fetches active rules whose tier contains `quantity`, most specific first.
pub async fn fetch_active_applicable(
    conn: &mut SqliteConnection,
    product_id: &str,
    variant: Option<&str>,
    quantity: i64,
) -> DbResult<Vec<PriceRule>> {
    debug!(product_id = %product_id, ?variant, quantity, "Fetching applicable rules");

    let rules = sqlx::query_as::<_, PriceRule>(&format!(
        "{SELECT_RULE} WHERE product_id = ?1 AND variant IS ?2 AND active = 1 \
         AND min_quantity <= ?3 \
         AND (max_quantity IS NULL OR max_quantity >= ?3) \
         ORDER BY min_quantity DESC"
    ))
    .bind(product_id)
    .bind(variant)
    .bind(quantity)
    .fetch_all(conn)
    .await?;

    Ok(rules)
}

/// Inserts a rule row.
pub async fn insert(conn: &mut SqliteConnection, rule: &PriceRule) -> DbResult<()> {
    debug!(id = %rule.id, product_id = %rule.product_id, "Inserting rule");

    sqlx::query(
        "INSERT INTO price_rules ( \
             id, product_id, variant, min_quantity, max_quantity, \
             unit_price_cents, active, created_at, updated_at \
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
    )
    .bind(&rule.id)
    .bind(&rule.product_id)
    .bind(&rule.variant)
    .bind(rule.min_quantity)
    .bind(rule.max_quantity)
    .bind(rule.unit_price_cents)
    .bind(rule.active)
    .bind(rule.created_at)
    .bind(rule.updated_at)
    .execute(conn)
    .await?;

    Ok(())
}

/// Overwrites a rule's variant, range and price.
pub async fn update(conn: &mut SqliteConnection, rule: &PriceRule) -> DbResult<()> {
    debug!(id = %rule.id, "Updating rule");

    let now = Utc::now();

    let result = sqlx::query(
        "UPDATE price_rules SET \
             variant = ?2, \
             min_quantity = ?3, \
             max_quantity = ?4, \
             unit_price_cents = ?5, \
             updated_at = ?6 \
         WHERE id = ?1",
    )
    .bind(&rule.id)
    .bind(&rule.variant)
    .bind(rule.min_quantity)
    .bind(rule.max_quantity)
    .bind(rule.unit_price_cents)
    .bind(now)
    .execute(conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("PriceRule", &rule.id));
    }

    Ok(())
}

/// Flips a rule's active flag.
pub async fn set_active(conn: &mut SqliteConnection, id: &str, active: bool) -> DbResult<()> {
    debug!(id = %id, active, "Setting rule active flag");

    let now = Utc::now();

    let result = sqlx::query("UPDATE price_rules SET active = ?2, updated_at = ?3 WHERE id = ?1")
        .bind(id)
        .bind(active)
        .bind(now)
        .execute(conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("PriceRule", id));
    }

    Ok(())
}

/// Helper to generate a new rule ID.
pub fn generate_rule_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================
