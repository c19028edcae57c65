//! # Structural Adjustments
//!
//! Structural (non-quantity) price deltas derived from declared product
//! characteristics. These are additive surcharges applied **after** the
//! rule/promotion/base price has been selected; they never change which
//! source won, and they are never multiplicative.
//!
//! Currently the only structural feature is the ring/eyelet header: two
//! categories carry a fixed per-unit surcharge when the product declares it,
//! every other category adds nothing.

use crate::money::Money;
use crate::types::{Category, Characteristics};

/// Per-unit ring surcharge for curtains, in cents.
pub const CURTAIN_RING_SURCHARGE_CENTS: i64 = 150;

/// Per-unit ring surcharge for panels, in cents.
pub const PANEL_RING_SURCHARGE_CENTS: i64 = 200;

/// Computes the structural surcharge for a product.
///
/// Pure function: category + typed presence flag in, non-negative Money out.
///
/// ## Example
/// ```rust
/// use mercato_core::adjustment::ring_surcharge;
/// use mercato_core::types::{Category, Characteristics};
///
/// let ringed = Characteristics { has_ring: true };
/// assert_eq!(ring_surcharge(Category::Curtain, &ringed).cents(), 150);
/// assert_eq!(ring_surcharge(Category::Fabric, &ringed).cents(), 0);
/// ```
pub fn ring_surcharge(category: Category, characteristics: &Characteristics) -> Money {
    if !characteristics.has_ring {
        return Money::zero();
    }

    match category {
        Category::Curtain => Money::from_cents(CURTAIN_RING_SURCHARGE_CENTS),
        Category::Panel => Money::from_cents(PANEL_RING_SURCHARGE_CENTS),
        Category::Fabric | Category::Accessory => Money::zero(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_surcharge_without_ring() {
        let plain = Characteristics { has_ring: false };
        assert!(ring_surcharge(Category::Curtain, &plain).is_zero());
        assert!(ring_surcharge(Category::Panel, &plain).is_zero());
    }

    #[test]
    fn test_surcharged_categories() {
        let ringed = Characteristics { has_ring: true };
        assert_eq!(ring_surcharge(Category::Curtain, &ringed).cents(), 150);
        assert_eq!(ring_surcharge(Category::Panel, &ringed).cents(), 200);
    }

    #[test]
    fn test_other_categories_add_zero() {
        let ringed = Characteristics { has_ring: true };
        assert!(ring_surcharge(Category::Fabric, &ringed).is_zero());
        assert!(ring_surcharge(Category::Accessory, &ringed).is_zero());
    }

    #[test]
    fn test_surcharge_is_never_negative() {
        for category in [
            Category::Curtain,
            Category::Panel,
            Category::Fabric,
            Category::Accessory,
        ] {
            for has_ring in [false, true] {
                let c = Characteristics { has_ring };
                assert!(!ring_surcharge(category, &c).is_negative());
            }
        }
    }
}
