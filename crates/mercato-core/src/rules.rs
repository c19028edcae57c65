//! # Rule Math
//!
//! Interval overlap detection, rule resolution and price-basis selection.
//! Everything here is a pure function over in-memory rule sets; fetching the
//! candidate rules (and making check+write atomic) is the storage layer's job.
//!
//! ## The Non-Overlap Invariant
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  For a fixed (product_id, variant), ACTIVE rule tiers never overlap:    │
//! │                                                                         │
//! │  qty:  1 ........ 999  1000 ............ ∞                              │
//! │        [  $10.00    ]  [     $8.00       ]          ✅ legal            │
//! │                                                                         │
//! │  qty:  1 ........ 999                                                   │
//! │        [  $10.00    ]                                                   │
//! │             500 .......... 1500                                         │
//! │             [    $9.00        ]                     ❌ Conflict         │
//! │                                                                         │
//! │  Two intervals [a1,a2] and [b1,b2] overlap iff a1 <= b2 AND b1 <= a2    │
//! │  (a missing upper bound is treated as +∞).                              │
//! │                                                                         │
//! │  Inactive rules are invisible to the check: retiring a tier and         │
//! │  laying a new one over its range is a plain deactivate-then-create.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Variant Buckets
//! Overlap is only ever checked inside the exact same variant bucket, and
//! `None` is a bucket of its own: a `variant=None` rule neither blocks nor is
//! blocked by a `variant="linen"` rule.

use crate::money::Money;
use crate::types::{PriceBasis, PriceRule, Product};

// =============================================================================
// Interval Overlap
// =============================================================================

/// Checks whether two quantity intervals intersect.
///
/// Bounds are inclusive; a `None` upper bound extends to +∞.
///
/// ## Example
/// ```rust
/// use mercato_core::rules::intervals_overlap;
///
/// assert!(intervals_overlap(1, Some(999), 500, Some(1500)));
/// assert!(intervals_overlap(500, Some(1500), 1000, None));
/// assert!(!intervals_overlap(1, Some(999), 1000, None));
/// ```
#[inline]
pub fn intervals_overlap(a_min: i64, a_max: Option<i64>, b_min: i64, b_max: Option<i64>) -> bool {
    // a1 <= b2 AND b1 <= a2, with None = +∞ (always satisfied on that side)
    let a_starts_before_b_ends = b_max.map_or(true, |b2| a_min <= b2);
    let b_starts_before_a_ends = a_max.map_or(true, |a2| b_min <= a2);
    a_starts_before_b_ends && b_starts_before_a_ends
}

/// Finds the first existing rule that conflicts with a candidate range.
///
/// Only **active** rules in the exact same variant bucket participate; the
/// rule identified by `exclude_id` (the rule being edited) is skipped.
///
/// Returns the conflicting rule so callers can name it in the error.
pub fn find_conflict<'a>(
    existing: &'a [PriceRule],
    variant: Option<&str>,
    min_quantity: i64,
    max_quantity: Option<i64>,
    exclude_id: Option<&str>,
) -> Option<&'a PriceRule> {
    existing
        .iter()
        .filter(|rule| rule.active)
        .filter(|rule| rule.variant.as_deref() == variant)
        .filter(|rule| exclude_id.map_or(true, |id| rule.id != id))
        .find(|rule| {
            intervals_overlap(
                rule.min_quantity,
                rule.max_quantity,
                min_quantity,
                max_quantity,
            )
        })
}

// =============================================================================
// Rule Resolution
// =============================================================================

/// Selects the single applicable rule for a quantity.
///
/// `candidates` are the active rules of one (product_id, variant) bucket.
/// With the non-overlap invariant held, at most one rule can contain the
/// quantity. If the store is inconsistent (defensive case) ties break by
/// **highest `min_quantity`**: the most specific tier wins.
///
/// `None` is not an error: it signals "fall through to promotional/base
/// pricing".
pub fn resolve<'a>(candidates: &'a [PriceRule], quantity: i64) -> Option<&'a PriceRule> {
    candidates
        .iter()
        .filter(|rule| rule.active && rule.applies_to(quantity))
        .max_by_key(|rule| rule.min_quantity)
}

// =============================================================================
// Price Basis Selection
// =============================================================================

/// Picks the unit price source in strict priority order.
///
/// The fallback chain is an ordered list of sources, each optionally
/// producing a price, short-circuiting on the first hit:
///
/// ```text
///   tiered rule ──miss──► live promotion ──miss──► base price
/// ```
///
/// The returned price is the pre-surcharge unit price; structural
/// adjustments are added afterwards and never change which source won.
pub fn select_basis(rule: Option<&PriceRule>, product: &Product) -> (Money, PriceBasis) {
    let sources = [
        (rule.map(PriceRule::unit_price), PriceBasis::TieredRule),
        (product.live_promo_price(), PriceBasis::Promotion),
        (Some(product.base_price()), PriceBasis::Base),
    ];

    for (price, basis) in sources {
        if let Some(price) = price {
            return (price, basis);
        }
    }

    // The base source is unconditional, so the loop always returns.
    unreachable!("base price source always yields")
}

// =============================================================================
// Unit Tests
// =============================================================================
