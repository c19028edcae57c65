//! # mercato-engine: Pricing & Cart Orchestration
//!
//! The orchestration layer of Mercato. It composes the pure pricing logic
//! from `mercato-core` with the storage layer in `mercato-db`, and owns the
//! transactions that keep two invariants true under concurrency:
//!
//! 1. Active rules in a (product, variant) bucket never have overlapping
//!    quantity ranges.
//! 2. A cart has at most one line per product, and its stored price
//!    snapshots always reflect a single consistent read of catalog + rules.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Mercato Layers                                   │
//! │                                                                         │
//! │  Callers (API handlers, back-office tooling)                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  mercato-engine (THIS CRATE)                    │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────────┐   ┌──────────────┐   ┌──────────────┐      │   │
//! │  │   │ PriceEngine  │   │  CartLedger  │   │  RuleAdmin   │      │   │
//! │  │   │ (pricing.rs) │   │ (ledger.rs)  │   │  (rules.rs)  │      │   │
//! │  │   └──────────────┘   └──────────────┘   └──────────────┘      │   │
//! │  │          │                  │                  │               │   │
//! │  └──────────┼──────────────────┼──────────────────┼───────────────┘   │
//! │             ▼                  ▼                  ▼                    │
//! │        mercato-core       mercato-db         mercato-db               │
//! │        (pure logic)       (transactions)     (transactions)           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use mercato_db::{Database, DbConfig};
//! use mercato_engine::{CartLedger, PriceEngine, RuleAdmin};
//!
//! let db = Database::new(DbConfig::new("mercato.db")).await?;
//!
//! let quote = PriceEngine::new(db.clone()).price("prod-1", None, 250).await?;
//! let item = CartLedger::new(db.clone()).add_item("user-1", "prod-1", None, 250).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod ledger;
pub mod pricing;
pub mod rules;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{EngineError, EngineResult};
pub use ledger::{CartLedger, CartView};
pub use pricing::PriceEngine;
pub use rules::RuleAdmin;
