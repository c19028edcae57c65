//! # Validation Module
//!
//! Input validation utilities for Mercato.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Transport (out of scope)                                      │
//! │  ├── Type validation (deserialization)                                  │
//! │  └── Immediate caller feedback                                          │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE - business rule validation                        │
//! │  ├── quantity bounds, price bounds, range sanity                        │
//! │  └── runs before any storage access                                     │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                             │
//! │  ├── NOT NULL / CHECK constraints                                       │
//! │  ├── UNIQUE constraints (one cart per user, one line per product)       │
//! │  └── Foreign key constraints                                            │
//! │                                                                         │
//! │  Defense in depth: multiple layers catch different errors               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::{ValidationError, ValidationResult};
use crate::types::NewPriceRule;
use crate::{MAX_ITEM_QUANTITY, MAX_UNIT_PRICE_CENTS, MIN_RULE_QUANTITY};

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a requested cart quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a rule unit price in cents.
///
/// ## Rules
/// - Must be positive (zero-priced tiers are configuration mistakes)
/// - Must not exceed MAX_UNIT_PRICE_CENTS (= 999,999.99)
pub fn validate_unit_price(cents: i64) -> ValidationResult<()> {
    if cents <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "unit_price_cents".to_string(),
        });
    }

    if cents > MAX_UNIT_PRICE_CENTS {
        return Err(ValidationError::OutOfRange {
            field: "unit_price_cents".to_string(),
            min: 1,
            max: MAX_UNIT_PRICE_CENTS,
        });
    }

    Ok(())
}

/// Validates a rule's quantity range.
///
/// ## Rules
/// - `min_quantity` ≥ 1
/// - `max_quantity`, when present, ≥ `min_quantity` (absent = unbounded)
pub fn validate_rule_range(min_quantity: i64, max_quantity: Option<i64>) -> ValidationResult<()> {
    if min_quantity < MIN_RULE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "min_quantity".to_string(),
            min: MIN_RULE_QUANTITY,
            max: i64::MAX,
        });
    }

    if let Some(max) = max_quantity {
        if max < min_quantity {
            return Err(ValidationError::MalformedRange {
                min: min_quantity,
                max,
            });
        }
    }

    Ok(())
}

/// Validates every field of a rule-creation payload.
///
/// Reports the first field at fault; the overlap check against existing
/// rules happens separately, inside the storage transaction.
pub fn validate_new_rule(rule: &NewPriceRule) -> ValidationResult<()> {
    if rule.product_id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "product_id".to_string(),
        });
    }

    validate_rule_range(rule.min_quantity, rule.max_quantity)?;
    validate_unit_price(rule.unit_price_cents)?;

    Ok(())
}

// =============================================================================
// Identifier Validators
// =============================================================================

/// Validates an externally-issued identifier (e.g. user IDs from the
/// identity provider). Only presence is enforced; the format is not ours
/// to constrain.
pub fn validate_user_id(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "user_id".to_string(),
        });
    }

    Ok(())
}

/// Validates a UUID string format.
///
/// ## Example
/// ```rust
/// use mercato_core::validation::validate_uuid;
///
/// assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("not-a-uuid").is_err());
/// ```
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: "id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
