//! # mercato-core: Pure Business Logic for Mercato
//!
//! This crate is the **heart** of the Mercato pricing engine. It contains all
//! business logic as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Mercato Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  HTTP layer (out of scope)                      │   │
//! │  │    rule admin ──► cart routes ──► pricing preview               │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    mercato-engine                               │   │
//! │  │    PriceEngine, CartLedger, RuleAdmin                           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ mercato-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │   rules   │  │ validation│  │   │
//! │  │   │ PriceRule │  │   Money   │  │  overlap  │  │   rules   │  │   │
//! │  │   │ CartItem  │  │   cents   │  │  resolve  │  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    mercato-db (Database Layer)                  │   │
//! │  │              SQLite queries, migrations, repositories           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (PriceRule, Product, Cart, PriceQuote, etc.)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`rules`] - Interval overlap math, rule resolution, basis selection
//! - [`adjustment`] - Structural (non-quantity) price surcharges
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic - same input = same output
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: All monetary values are in cents (i64) to avoid float errors
//! 4. **Explicit Errors**: All errors are typed, never strings or panics

// =============================================================================
// Module Declarations
// =============================================================================

pub mod adjustment;
pub mod error;
pub mod money;
pub mod rules;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use mercato_core::Money` instead of
// `use mercato_core::money::Money`

pub use error::{ValidationError, ValidationResult};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum unit price a rule or quote may carry, in cents (= 999,999.99).
///
/// ## Business Reason
/// Catches fat-finger admin input (an extra zero on a price) before it ever
/// reaches a customer-facing quote.
pub const MAX_UNIT_PRICE_CENTS: i64 = 99_999_999;

/// Minimum quantity a pricing rule tier may start at.
///
/// ## Business Reason
/// Quantity tiers are defined over whole units; a tier starting below one
/// unit is meaningless.
pub const MIN_RULE_QUANTITY: i64 = 1;

/// Maximum quantity accepted on a single cart line.
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., typing 100000 instead of 100).
pub const MAX_ITEM_QUANTITY: i64 = 999_999;
