//! # mercato-db: Database Layer for Mercato
//!
//! This crate provides database access for the Mercato pricing engine.
//! It uses SQLite for local storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Mercato Data Flow                                │
//! │                                                                         │
//! │  mercato-engine (PriceEngine / CartLedger / RuleAdmin)                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     mercato-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │  (rule.rs,    │    │  (embedded)  │  │   │
//! │  │   │               │    │   product.rs, │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│   cart.rs)    │    │ 001_init.sql │  │   │
//! │  │   │ WAL + FKs     │    │               │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  │   price_rules / products / carts / cart_items                   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations (rule, product, cart)
//!
//! Multi-step write paths (overlap-checked rule writes, cart merges) are
//! exposed as transaction-scoped functions over a `SqliteConnection`; the
//! engine layer owns the transaction and the invariants.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use mercato_db::{Database, DbConfig};
//!
//! // Create database with default config
//! let config = DbConfig::new("path/to/db.sqlite");
//! let db = Database::new(config).await?;
//!
//! // Use repositories for reads
//! let rules = db.rules().find_for_product("prod-1", false).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::cart::CartRepository;
pub use repository::product::ProductRepository;
pub use repository::rule::RuleRepository;
