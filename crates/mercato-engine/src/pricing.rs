//! # Price Engine
//!
//! Resolves the final unit price for a (product, variant, quantity) request.
//!
//! ## Resolution Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Price Resolution                                  │
//! │                                                                         │
//! │  (product, variant, quantity)                                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  1. RULE TIER       active rules in the exact (product, variant)        │
//! │                     bucket whose range covers the quantity; tie         │
//! │                     broken by highest min_quantity                      │
//! │       │ none                                                            │
//! │       ▼                                                                 │
//! │  2. PROMOTION       live promotional price, if configured               │
//! │       │ none                                                            │
//! │       ▼                                                                 │
//! │  3. BASE PRICE      always present                                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  + RING SURCHARGE   structural adjustment, added AFTER selection        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  PriceQuote { unit_price, subtotal = unit_price × qty, basis }          │
//! │                                                                         │
//! │  The surcharge never participates in choosing 1/2/3, and the subtotal   │
//! │  is derived from the final unit price, never from an intermediate.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The pure computation lives in [`PriceEngine::quote`], which the cart
//! ledger also calls inside its mutation transactions so a line's snapshot
//! and a standalone quote can never disagree for the same inputs.

use tracing::debug;

use mercato_core::adjustment::ring_surcharge;
use mercato_core::rules::{resolve, select_basis};
use mercato_core::validation::validate_quantity;
use mercato_core::{PriceQuote, PriceRule, Product};
use mercato_db::Database;

use crate::error::{EngineError, EngineResult};

/// Stateless price resolution over the rule store.
#[derive(Debug, Clone)]
pub struct PriceEngine {
    db: Database,
}

impl PriceEngine {
    /// Creates a new PriceEngine.
    pub fn new(db: Database) -> Self {
        PriceEngine { db }
    }

    /// Prices a quantity of a product variant against the current catalog
    /// and rule state. Read-only; nothing is reserved or written.
    ///
    /// ## Errors
    /// - `Validation` - quantity out of range
    /// - `NotFound` - unknown product
    /// - `ProductInactive` - retired products have no sellable price
    pub async fn price(
        &self,
        product_id: &str,
        variant: Option<&str>,
        quantity: i64,
    ) -> EngineResult<PriceQuote> {
        validate_quantity(quantity)?;

        let product = self
            .db
            .products()
            .get_by_id(product_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Product", product_id))?;

        if !product.active {
            return Err(EngineError::ProductInactive {
                id: product.id.clone(),
            });
        }

        let candidates = self
            .db
            .rules()
            .find_active_applicable(product_id, variant, quantity)
            .await?;

        let quote = Self::quote(&product, &candidates, quantity);

        debug!(
            product_id = %product_id,
            ?variant,
            quantity,
            basis = ?quote.basis,
            unit_price_cents = quote.unit_price.cents(),
            "Priced request"
        );

        Ok(quote)
    }

    /// Pure price computation over pre-fetched candidates.
    ///
    /// Candidates may contain inactive or non-applicable rules; resolution
    /// filters them. Callers must have fetched the candidates for the same
    /// variant bucket they are pricing.
    pub fn quote(product: &Product, candidates: &[PriceRule], quantity: i64) -> PriceQuote {
        let rule = resolve(candidates, quantity);
        let (selected, basis) = select_basis(rule, product);

        let unit_price = selected + ring_surcharge(product.category, &product.characteristics);
        let subtotal = unit_price.multiply_quantity(quantity);

        PriceQuote {
            unit_price,
            subtotal,
            basis,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
