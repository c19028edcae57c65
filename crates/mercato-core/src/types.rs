//! # Domain Types
//!
//! Core domain types used throughout Mercato.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │   PriceRule     │   │    Product      │   │    CartItem     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  product_id     │   │  category       │   │  cart_id (FK)   │       │
//! │  │  variant?       │   │  base_price     │   │  quantity       │       │
//! │  │  [min..max] qty │   │  promo_price?   │   │  unit_price ◄───┼─ snapshot
//! │  │  unit_price     │   │  stock          │   │  subtotal   ◄───┼─ snapshot
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │   PriceBasis    │   │    Category     │   │ Characteristics │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  TieredRule     │   │  Curtain        │   │  has_ring       │       │
//! │  │  Promotion      │   │  Panel          │   │  (typed, not a  │       │
//! │  │  Base           │   │  Fabric         │   │   string map)   │       │
//! │  └─────────────────┘   │  Accessory      │   └─────────────────┘       │
//! │                        └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Variant Bucketing
//! A rule's `variant` is a discriminator (e.g. a fabric code). Rules with
//! `variant = None` form their own bucket: `None` is a distinct value, not a
//! wildcard, so a variant-less rule never conflicts with (nor matches) a
//! `"linen"` rule.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Product Category
// =============================================================================

/// Product category, owned by the external catalog.
///
/// The pricing core only pattern-matches on it for structural surcharges;
/// it never drives rule applicability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Made-to-measure curtains.
    Curtain,
    /// Ready-made panels.
    Panel,
    /// Fabric sold by length.
    Fabric,
    /// Hooks, tiebacks, rails and other hardware.
    Accessory,
}

// =============================================================================
// Characteristics
// =============================================================================

/// Structural characteristics a product declares.
///
/// The storage layer carries these as a JSON bag; this typed struct is what
/// crosses into the pricing path. The adjustment calculator matches on
/// `Category` plus these presence flags, never on stringly-typed lookups.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct Characteristics {
    /// Product ships with a ring/eyelet header.
    pub has_ring: bool,
}

// =============================================================================
// Product
// =============================================================================

/// A product as read from the external catalog.
///
/// The pricing core treats this as read-only input: it reads base and
/// promotional prices, stock, and characteristics, and never mutates any of
/// them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Category for structural surcharge selection.
    pub category: Category,

    /// Base price in cents (smallest currency unit).
    pub base_price_cents: i64,

    /// Promotional price in cents, if one is configured.
    pub promo_price_cents: Option<i64>,

    /// Whether the promotional price is currently live.
    pub promo_active: bool,

    /// Whether product is sellable (soft delete).
    pub active: bool,

    /// Units currently in stock.
    pub stock: i64,

    /// Declared structural characteristics.
    pub characteristics: Characteristics,

    /// When the product was created.
    pub created_at: DateTime<Utc>,

    /// When the product was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the base price as a Money type.
    #[inline]
    pub fn base_price(&self) -> Money {
        Money::from_cents(self.base_price_cents)
    }

    /// Returns the promotional price, but only when the promotion is live
    /// and a price is actually configured.
    pub fn live_promo_price(&self) -> Option<Money> {
        if self.promo_active {
            self.promo_price_cents.map(Money::from_cents)
        } else {
            None
        }
    }

    /// Checks whether the requested quantity is coverable by stock.
    #[inline]
    pub fn has_stock(&self, quantity: i64) -> bool {
        self.stock >= quantity
    }
}

// =============================================================================
// Price Rule
// =============================================================================

/// A quantity-tiered pricing rule.
///
/// For a fixed (product_id, variant) the set of **active** rules must have
/// pairwise non-overlapping `[min_quantity, max_quantity]` intervals, with a
/// missing max treated as +∞. That invariant is enforced on every create,
/// update and reactivation; see `mercato-engine`'s rule admin.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct PriceRule {
    pub id: String,
    pub product_id: String,
    /// Variant discriminator; `None` is its own bucket, not a wildcard.
    pub variant: Option<String>,
    /// Inclusive lower quantity bound (≥ 1).
    pub min_quantity: i64,
    /// Inclusive upper quantity bound; `None` = unbounded above.
    pub max_quantity: Option<i64>,
    /// Fixed unit price in cents for quantities inside the tier.
    pub unit_price_cents: i64,
    /// Inactive rules never price anything and never block new ranges.
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PriceRule {
    /// Returns the tier's unit price as Money.
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// Checks whether a quantity falls inside this tier.
    pub fn applies_to(&self, quantity: i64) -> bool {
        self.min_quantity <= quantity && self.max_quantity.map_or(true, |max| quantity <= max)
    }
}

/// Payload for creating a pricing rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPriceRule {
    pub product_id: String,
    pub variant: Option<String>,
    pub min_quantity: i64,
    pub max_quantity: Option<i64>,
    pub unit_price_cents: i64,
}

/// Payload for updating a pricing rule.
///
/// Carries the full replacement range/price/variant; activation is toggled
/// through the dedicated deactivate/reactivate operations, which re-run
/// overlap validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleUpdate {
    pub variant: Option<String>,
    pub min_quantity: i64,
    pub max_quantity: Option<i64>,
    pub unit_price_cents: i64,
}

// =============================================================================
// Price Basis & Quote
// =============================================================================

/// Which pricing source produced the final unit price.
///
/// The fallback chain is strict: a matching tiered rule always beats an
/// active promotion, which always beats the base price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum PriceBasis {
    /// A quantity-tier rule matched.
    TieredRule,
    /// No rule matched; an active promotion applied.
    Promotion,
    /// Neither rule nor promotion; catalog base price.
    Base,
}

/// The result of a pricing computation.
///
/// `subtotal` is always derived from the final `unit_price` (surcharge
/// included), never from an unrounded intermediate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceQuote {
    pub unit_price: Money,
    pub subtotal: Money,
    pub basis: PriceBasis,
}

// =============================================================================
// Cart
// =============================================================================

/// A user's cart. One per user, created lazily on first access.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Cart {
    pub id: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A line item in a cart.
///
/// Uses the snapshot pattern: `unit_price_cents`/`subtotal_cents` are frozen
/// by the price engine at the moment of the last quantity-affecting mutation.
/// They are a cached computation: never hand-edited, and intentionally stale
/// against later rule changes until the line is touched again.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct CartItem {
    pub id: String,
    pub cart_id: String,
    pub product_id: String,
    /// Variant the line was priced under (frozen).
    pub variant: Option<String>,
    /// Quantity on the line (≥ 1).
    pub quantity: i64,
    /// Unit price in cents at last pricing (frozen).
    pub unit_price_cents: i64,
    /// unit_price_cents × quantity at last pricing (frozen).
    pub subtotal_cents: i64,
    /// Which source priced the line at last pricing (frozen).
    pub price_basis: PriceBasis,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CartItem {
    /// Returns the frozen unit price as Money.
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// Returns the frozen line subtotal as Money.
    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
