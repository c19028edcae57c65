//! # Cart Repository
//!
//! Persistence for carts and their priced line items.
//!
//! ## Line Item Snapshots
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     One cart per user, one line per product             │
//! │                                                                         │
//! │  carts            UNIQUE(user_id)                                       │
//! │    └── cart_items UNIQUE(cart_id, product_id)                           │
//! │                                                                         │
//! │  Each line stores the price it was quoted at:                           │
//! │    unit_price_cents / subtotal_cents / price_basis                      │
//! │                                                                         │
//! │  The cart total is the sum of stored subtotals; it never re-derives     │
//! │  prices from the live catalog.                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Cart mutations run multi-step (read product, quote, upsert line) so the
//! write path is exposed as transaction-scoped functions over a
//! [`SqliteConnection`]; the ledger owns the transaction.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use mercato_core::{Cart, CartItem, PriceBasis};

const SELECT_ITEM: &str = "SELECT id, cart_id, product_id, variant, quantity, \
     unit_price_cents, subtotal_cents, price_basis, created_at, updated_at FROM cart_items";

/// Repository for cart reads. All writes go through the transaction-scoped
/// functions below.
#[derive(Debug, Clone)]
pub struct CartRepository {
    pool: SqlitePool,
}

impl CartRepository {
    /// Creates a new CartRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CartRepository { pool }
    }

    /// Gets a user's cart, if one exists.
    pub async fn get_for_user(&self, user_id: &str) -> DbResult<Option<Cart>> {
        let cart = sqlx::query_as::<_, Cart>(
            "SELECT id, user_id, created_at, updated_at FROM carts WHERE user_id = ?1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(cart)
    }

    /// Lists a cart's line items, oldest first.
    pub async fn list_items(&self, cart_id: &str) -> DbResult<Vec<CartItem>> {
        let items = sqlx::query_as::<_, CartItem>(&format!(
            "{SELECT_ITEM} WHERE cart_id = ?1 ORDER BY created_at ASC, id ASC"
        ))
        .bind(cart_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Sums the stored line subtotals for a cart. Empty cart totals zero.
    pub async fn total_cents(&self, cart_id: &str) -> DbResult<i64> {
        let total: Option<i64> = sqlx::query_scalar(
            "SELECT SUM(subtotal_cents) FROM cart_items WHERE cart_id = ?1",
        )
        .bind(cart_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(total.unwrap_or(0))
    }
}

// =============================================================================
// Transaction-Scoped Functions
// =============================================================================

/// Gets the user's cart, creating it if absent.
///
/// The `UNIQUE(user_id)` constraint plus `ON CONFLICT DO NOTHING` makes this
/// safe against a concurrent first-add for the same user: both callers end
/// up reading the same row.
pub async fn get_or_create(conn: &mut SqliteConnection, user_id: &str) -> DbResult<Cart> {
    let now = Utc::now();

    sqlx::query(
        "INSERT INTO carts (id, user_id, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?3) \
         ON CONFLICT(user_id) DO NOTHING",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(user_id)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    let cart = sqlx::query_as::<_, Cart>(
        "SELECT id, user_id, created_at, updated_at FROM carts WHERE user_id = ?1",
    )
    .bind(user_id)
    .fetch_one(conn)
    .await?;

    Ok(cart)
}

/// Fetches a line item by its ID.
pub async fn fetch_item(conn: &mut SqliteConnection, item_id: &str) -> DbResult<Option<CartItem>> {
    let item = sqlx::query_as::<_, CartItem>(&format!("{SELECT_ITEM} WHERE id = ?1"))
        .bind(item_id)
        .fetch_optional(conn)
        .await?;

    Ok(item)
}

/// Fetches the cart's line for a product, if one exists. At most one line
/// per product exists per cart.
pub async fn fetch_item_by_product(
    conn: &mut SqliteConnection,
    cart_id: &str,
    product_id: &str,
) -> DbResult<Option<CartItem>> {
    let item = sqlx::query_as::<_, CartItem>(&format!(
        "{SELECT_ITEM} WHERE cart_id = ?1 AND product_id = ?2"
    ))
    .bind(cart_id)
    .bind(product_id)
    .fetch_optional(conn)
    .await?;

    Ok(item)
}

/// Writes a line item, merging into the existing line for the product if
/// one is present. Quantity and pricing are stored as given; the caller has
/// already quoted the full merged quantity.
#[allow(clippy::too_many_arguments)]
pub async fn upsert_item(
    conn: &mut SqliteConnection,
    cart_id: &str,
    product_id: &str,
    variant: Option<&str>,
    quantity: i64,
    unit_price_cents: i64,
    subtotal_cents: i64,
    price_basis: PriceBasis,
) -> DbResult<CartItem> {
    debug!(cart_id = %cart_id, product_id = %product_id, quantity, "Upserting cart item");

    let now = Utc::now();

    sqlx::query(
        "INSERT INTO cart_items ( \
             id, cart_id, product_id, variant, quantity, unit_price_cents, \
             subtotal_cents, price_basis, created_at, updated_at \
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9) \
         ON CONFLICT(cart_id, product_id) DO UPDATE SET \
             variant = excluded.variant, \
             quantity = excluded.quantity, \
             unit_price_cents = excluded.unit_price_cents, \
             subtotal_cents = excluded.subtotal_cents, \
             price_basis = excluded.price_basis, \
             updated_at = excluded.updated_at",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(cart_id)
    .bind(product_id)
    .bind(variant)
    .bind(quantity)
    .bind(unit_price_cents)
    .bind(subtotal_cents)
    .bind(price_basis)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    let item = sqlx::query_as::<_, CartItem>(&format!(
        "{SELECT_ITEM} WHERE cart_id = ?1 AND product_id = ?2"
    ))
    .bind(cart_id)
    .bind(product_id)
    .fetch_one(conn)
    .await?;

    Ok(item)
}

/// Deletes a line item. Returns whether a row was removed.
pub async fn delete_item(conn: &mut SqliteConnection, item_id: &str) -> DbResult<bool> {
    let result = sqlx::query("DELETE FROM cart_items WHERE id = ?1")
        .bind(item_id)
        .execute(conn)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Removes every line item from a cart.
pub async fn clear(conn: &mut SqliteConnection, cart_id: &str) -> DbResult<u64> {
    let result = sqlx::query("DELETE FROM cart_items WHERE cart_id = ?1")
        .bind(cart_id)
        .execute(conn)
        .await?;

    Ok(result.rows_affected())
}

// =============================================================================
// Unit Tests
// =============================================================================
