//! # Engine Error Types
//!
//! The error taxonomy callers of the engine see. Every operation across
//! [`crate::pricing`], [`crate::ledger`] and [`crate::rules`] returns one of
//! these variants; storage and validation errors are folded in at this
//! boundary.
//!
//! ## Mapping
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Error Flow                                       │
//! │                                                                         │
//! │  mercato-core ValidationError ──────────► Validation    (bad input)     │
//! │  mercato-db   DbError::NotFound ────────► NotFound                      │
//! │  mercato-db   DbError::* ───────────────► Internal      (opaque)        │
//! │  engine       overlap detected ─────────► Conflict                      │
//! │  engine       ownership mismatch ───────► Forbidden                     │
//! │  engine       stock short ──────────────► StockExceeded                 │
//! │  engine       product retired ──────────► ProductInactive               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `Internal` wraps the underlying [`DbError`] as its source: callers can log
//! the chain, but nothing in it is actionable for them.

use mercato_core::ValidationError;
use mercato_db::DbError;
use thiserror::Error;

/// Errors surfaced by engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Input failed structural validation before touching storage.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// A referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// The write would break a uniqueness/consistency invariant. For rule
    /// writes, `conflicting_rule_id` names the active rule whose quantity
    /// range overlaps the requested one.
    #[error("conflict: {message}")]
    Conflict {
        message: String,
        conflicting_rule_id: Option<String>,
    },

    /// The caller does not own the resource they tried to mutate.
    #[error("forbidden")]
    Forbidden,

    /// The requested quantity exceeds available stock.
    #[error("stock exceeded: requested {requested}, available {available}")]
    StockExceeded { requested: i64, available: i64 },

    /// The product has been retired and cannot enter a cart.
    #[error("product inactive: {id}")]
    ProductInactive { id: String },

    /// An unexpected storage or infrastructure failure.
    #[error("internal error: {0}")]
    Internal(#[source] DbError),
}

impl EngineError {
    /// Creates a NotFound error.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        EngineError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a Conflict error naming the overlapping rule.
    pub fn rule_overlap(conflicting_rule_id: impl Into<String>) -> Self {
        let id = conflicting_rule_id.into();
        EngineError::Conflict {
            message: format!("quantity range overlaps active rule {id}"),
            conflicting_rule_id: Some(id),
        }
    }

    /// Machine-readable code, stable across message wording changes.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::Validation(_) => "VALIDATION_ERROR",
            EngineError::NotFound { .. } => "NOT_FOUND",
            EngineError::Conflict { .. } => "CONFLICT",
            EngineError::Forbidden => "FORBIDDEN",
            EngineError::StockExceeded { .. } => "STOCK_EXCEEDED",
            EngineError::ProductInactive { .. } => "PRODUCT_INACTIVE",
            EngineError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<DbError> for EngineError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => EngineError::NotFound { entity, id },
            other => EngineError::Internal(other),
        }
    }
}

impl From<sqlx::Error> for EngineError {
    fn from(err: sqlx::Error) -> Self {
        EngineError::from(DbError::from(err))
    }
}

/// Convenience result alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

// =============================================================================
// Unit Tests
// =============================================================================
