//! # Rule Administration
//!
//! Create, update, deactivate, reactivate and delete pricing rules while
//! keeping the non-overlap invariant intact.
//!
//! ## Overlap Enforcement
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │             Every range-affecting write, same shape                     │
//! │                                                                         │
//! │  BEGIN TRANSACTION                                                      │
//! │    1. read the ACTIVE rules in the target (product, variant) bucket     │
//! │    2. check the candidate range against each       ── Conflict          │
//! │    3. write the rule                                                    │
//! │  COMMIT                                                                 │
//! │                                                                         │
//! │  Applies to create, update AND reactivate: a rule that was parked       │
//! │  inactive re-earns its slot, because the bucket may have been           │
//! │  re-tiled while it was out.                                             │
//! │                                                                         │
//! │  SQLite admits one writer at a time, so two conflicting writes          │
//! │  cannot interleave between steps 1 and 3.                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Deactivation needs no check: removing a range from a bucket cannot
//! create an overlap.

use chrono::Utc;
use tracing::{info, warn};

use mercato_core::rules::find_conflict;
use mercato_core::validation::{validate_new_rule, validate_rule_range, validate_unit_price};
use mercato_core::{NewPriceRule, PriceRule, RuleUpdate};
use mercato_db::repository::{product, rule};
use mercato_db::Database;

use crate::error::{EngineError, EngineResult};

/// Administrative interface over the rule store.
#[derive(Debug, Clone)]
pub struct RuleAdmin {
    db: Database,
}

impl RuleAdmin {
    /// Creates a new RuleAdmin.
    pub fn new(db: Database) -> Self {
        RuleAdmin { db }
    }

    /// Creates an active rule after validating its range against the
    /// bucket's existing active rules.
    ///
    /// ## Errors
    /// - `Validation` - malformed payload (range, price, missing product id)
    /// - `NotFound` - product does not exist
    /// - `Conflict` - range overlaps an active rule in the same bucket
    pub async fn create_rule(&self, new: NewPriceRule) -> EngineResult<PriceRule> {
        validate_new_rule(&new)?;

        let mut tx = self.db.pool().begin().await?;

        product::fetch_by_id(&mut tx, &new.product_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Product", &new.product_id))?;

        let bucket =
            rule::fetch_active_bucket(&mut tx, &new.product_id, new.variant.as_deref()).await?;
        if let Some(conflict) = find_conflict(
            &bucket,
            new.variant.as_deref(),
            new.min_quantity,
            new.max_quantity,
            None,
        ) {
            warn!(
                product_id = %new.product_id,
                conflicting_rule_id = %conflict.id,
                "Rule creation rejected: overlapping range"
            );
            return Err(EngineError::rule_overlap(conflict.id.clone()));
        }

        let now = Utc::now();
        let created = PriceRule {
            id: rule::generate_rule_id(),
            product_id: new.product_id,
            variant: new.variant,
            min_quantity: new.min_quantity,
            max_quantity: new.max_quantity,
            unit_price_cents: new.unit_price_cents,
            active: true,
            created_at: now,
            updated_at: now,
        };
        rule::insert(&mut tx, &created).await?;

        tx.commit().await?;

        info!(id = %created.id, product_id = %created.product_id, "Rule created");

        Ok(created)
    }

    /// Replaces a rule's variant, range and price.
    ///
    /// If the rule is active, the replacement range is validated against the
    /// target bucket (which may differ from the current one when the variant
    /// changes), excluding the rule itself. Inactive rules are edited freely;
    /// they re-earn their slot on reactivation.
    pub async fn update_rule(&self, id: &str, update: RuleUpdate) -> EngineResult<PriceRule> {
        validate_rule_range(update.min_quantity, update.max_quantity)?;
        validate_unit_price(update.unit_price_cents)?;

        let mut tx = self.db.pool().begin().await?;

        let mut existing = rule::fetch_by_id(&mut tx, id)
            .await?
            .ok_or_else(|| EngineError::not_found("Rule", id))?;

        if existing.active {
            let bucket =
                rule::fetch_active_bucket(&mut tx, &existing.product_id, update.variant.as_deref())
                    .await?;
            if let Some(conflict) = find_conflict(
                &bucket,
                update.variant.as_deref(),
                update.min_quantity,
                update.max_quantity,
                Some(id),
            ) {
                return Err(EngineError::rule_overlap(conflict.id.clone()));
            }
        }

        existing.variant = update.variant;
        existing.min_quantity = update.min_quantity;
        existing.max_quantity = update.max_quantity;
        existing.unit_price_cents = update.unit_price_cents;
        rule::update(&mut tx, &existing).await?;

        tx.commit().await?;

        info!(id = %id, "Rule updated");

        Ok(existing)
    }

    /// Takes a rule out of pricing. Idempotent; no overlap check is needed
    /// since removing a range cannot create one.
    pub async fn deactivate_rule(&self, id: &str) -> EngineResult<()> {
        let mut tx = self.db.pool().begin().await?;
        rule::set_active(&mut tx, id, false).await?;
        tx.commit().await?;

        info!(id = %id, "Rule deactivated");

        Ok(())
    }

    /// Puts a previously deactivated rule back into pricing.
    ///
    /// The rule's range is re-validated against the bucket's current active
    /// rules: the bucket may have been re-tiled while this rule was parked,
    /// and reactivation must not smuggle an overlap past the invariant.
    pub async fn reactivate_rule(&self, id: &str) -> EngineResult<PriceRule> {
        let mut tx = self.db.pool().begin().await?;

        let mut existing = rule::fetch_by_id(&mut tx, id)
            .await?
            .ok_or_else(|| EngineError::not_found("Rule", id))?;

        if !existing.active {
            let bucket = rule::fetch_active_bucket(
                &mut tx,
                &existing.product_id,
                existing.variant.as_deref(),
            )
            .await?;
            if let Some(conflict) = find_conflict(
                &bucket,
                existing.variant.as_deref(),
                existing.min_quantity,
                existing.max_quantity,
                Some(id),
            ) {
                warn!(
                    id = %id,
                    conflicting_rule_id = %conflict.id,
                    "Reactivation rejected: bucket was re-tiled"
                );
                return Err(EngineError::rule_overlap(conflict.id.clone()));
            }

            rule::set_active(&mut tx, id, true).await?;
            existing.active = true;
        }

        tx.commit().await?;

        info!(id = %id, "Rule reactivated");

        Ok(existing)
    }

    /// Permanently deletes a rule.
    pub async fn delete_rule(&self, id: &str) -> EngineResult<()> {
        self.db.rules().delete(id).await?;

        info!(id = %id, "Rule deleted");

        Ok(())
    }

    /// Gets a rule by ID.
    pub async fn get_rule(&self, id: &str) -> EngineResult<PriceRule> {
        self.db
            .rules()
            .get_by_id(id)
            .await?
            .ok_or_else(|| EngineError::not_found("Rule", id))
    }

    /// Lists a product's rules, optionally including deactivated ones.
    pub async fn list_rules(
        &self,
        product_id: &str,
        include_inactive: bool,
    ) -> EngineResult<Vec<PriceRule>> {
        Ok(self
            .db
            .rules()
            .find_for_product(product_id, include_inactive)
            .await?)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use mercato_core::{Category, Characteristics, Product};
    use mercato_db::{Database, DbConfig};
    use uuid::Uuid;

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    async fn seed_product(db: &Database) -> Product {
        let now = Utc::now();
        let prod = Product {
            id: Uuid::new_v4().to_string(),
            category: Category::Fabric,
            base_price_cents: 2000,
            promo_price_cents: None,
            promo_active: false,
            active: true,
            stock: 10_000,
            characteristics: Characteristics::default(),
            created_at: now,
            updated_at: now,
        };
        db.products().insert(&prod).await.unwrap();
        prod
    }

    fn payload(product_id: &str, min: i64, max: Option<i64>, cents: i64) -> NewPriceRule {
        NewPriceRule {
            product_id: product_id.to_string(),
            variant: None,
            min_quantity: min,
            max_quantity: max,
            unit_price_cents: cents,
        }
    }

    #[tokio::test]
    async fn test_create_rejects_overlap_with_open_ended_tier() {
        let db = test_db().await;
        let prod = seed_product(&db).await;
        let admin = RuleAdmin::new(db);

        // A=[1,999], B=[1000,∞): a valid tiling.
        admin.create_rule(payload(&prod.id, 1, Some(999), 1000)).await.unwrap();
        let b = admin.create_rule(payload(&prod.id, 1000, None, 800)).await.unwrap();

        // C=[500,1500] overlaps both; rejected with a named conflict.
        let err = admin
            .create_rule(payload(&prod.id, 500, Some(1500), 900))
            .await
            .unwrap_err();
        match err {
            EngineError::Conflict {
                conflicting_rule_id,
                ..
            } => assert!(conflicting_rule_id.is_some()),
            other => panic!("expected Conflict, got {other:?}"),
        }

        // B's bucket state is unchanged by the failed insert.
        assert!(admin.get_rule(&b.id).await.unwrap().active);
    }

    #[tokio::test]
    async fn test_identical_range_is_a_conflict() {
        let db = test_db().await;
        let prod = seed_product(&db).await;
        let admin = RuleAdmin::new(db);

        admin.create_rule(payload(&prod.id, 1, Some(99), 1000)).await.unwrap();
        let err = admin
            .create_rule(payload(&prod.id, 1, Some(99), 900))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_variant_buckets_do_not_conflict() {
        let db = test_db().await;
        let prod = seed_product(&db).await;
        let admin = RuleAdmin::new(db);

        admin.create_rule(payload(&prod.id, 1, None, 1000)).await.unwrap();

        let mut linen = payload(&prod.id, 1, None, 1200);
        linen.variant = Some("linen".to_string());
        admin.create_rule(linen).await.unwrap();
    }

    #[tokio::test]
    async fn test_create_for_unknown_product_is_not_found() {
        let db = test_db().await;
        let admin = RuleAdmin::new(db);

        let err = admin.create_rule(payload("ghost", 1, None, 1000)).await.unwrap_err();
        assert!(matches!(err, EngineError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_update_excludes_self_from_overlap_check() {
        let db = test_db().await;
        let prod = seed_product(&db).await;
        let admin = RuleAdmin::new(db);

        let r = admin.create_rule(payload(&prod.id, 1, Some(99), 1000)).await.unwrap();

        // Widening the rule's own range must not conflict with itself.
        let updated = admin
            .update_rule(
                &r.id,
                RuleUpdate {
                    variant: None,
                    min_quantity: 1,
                    max_quantity: Some(199),
                    unit_price_cents: 950,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.max_quantity, Some(199));
        assert_eq!(updated.unit_price_cents, 950);
    }

    #[tokio::test]
    async fn test_update_rejects_overlap_with_neighbor() {
        let db = test_db().await;
        let prod = seed_product(&db).await;
        let admin = RuleAdmin::new(db);

        let a = admin.create_rule(payload(&prod.id, 1, Some(99), 1000)).await.unwrap();
        admin.create_rule(payload(&prod.id, 100, None, 800)).await.unwrap();

        let err = admin
            .update_rule(
                &a.id,
                RuleUpdate {
                    variant: None,
                    min_quantity: 1,
                    max_quantity: Some(100),
                    unit_price_cents: 1000,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_deactivated_rule_frees_its_slot() {
        let db = test_db().await;
        let prod = seed_product(&db).await;
        let admin = RuleAdmin::new(db);

        let a = admin.create_rule(payload(&prod.id, 1, Some(99), 1000)).await.unwrap();
        admin.deactivate_rule(&a.id).await.unwrap();

        // The range is available again.
        admin.create_rule(payload(&prod.id, 1, Some(99), 900)).await.unwrap();
    }

    #[tokio::test]
    async fn test_reactivation_revalidates_against_retiled_bucket() {
        let db = test_db().await;
        let prod = seed_product(&db).await;
        let admin = RuleAdmin::new(db);

        let a = admin.create_rule(payload(&prod.id, 1, Some(99), 1000)).await.unwrap();
        admin.deactivate_rule(&a.id).await.unwrap();

        // Bucket re-tiled while A was parked.
        admin.create_rule(payload(&prod.id, 50, Some(150), 900)).await.unwrap();

        let err = admin.reactivate_rule(&a.id).await.unwrap_err();
        assert!(matches!(err, EngineError::Conflict { .. }));

        // A stays inactive after the failed reactivation.
        assert!(!admin.get_rule(&a.id).await.unwrap().active);
    }

    #[tokio::test]
    async fn test_reactivation_succeeds_into_free_slot() {
        let db = test_db().await;
        let prod = seed_product(&db).await;
        let admin = RuleAdmin::new(db);

        let a = admin.create_rule(payload(&prod.id, 1, Some(99), 1000)).await.unwrap();
        admin.deactivate_rule(&a.id).await.unwrap();

        let reactivated = admin.reactivate_rule(&a.id).await.unwrap();
        assert!(reactivated.active);

        // Reactivating an already-active rule is a no-op.
        let again = admin.reactivate_rule(&a.id).await.unwrap();
        assert!(again.active);
    }

    #[tokio::test]
    async fn test_list_rules_filters_inactive() {
        let db = test_db().await;
        let prod = seed_product(&db).await;
        let admin = RuleAdmin::new(db);

        let a = admin.create_rule(payload(&prod.id, 1, Some(99), 1000)).await.unwrap();
        admin.create_rule(payload(&prod.id, 100, None, 800)).await.unwrap();
        admin.deactivate_rule(&a.id).await.unwrap();

        assert_eq!(admin.list_rules(&prod.id, false).await.unwrap().len(), 1);
        assert_eq!(admin.list_rules(&prod.id, true).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_delete_rule() {
        let db = test_db().await;
        let prod = seed_product(&db).await;
        let admin = RuleAdmin::new(db);

        let a = admin.create_rule(payload(&prod.id, 1, None, 1000)).await.unwrap();
        admin.delete_rule(&a.id).await.unwrap();

        let err = admin.get_rule(&a.id).await.unwrap_err();
        assert!(matches!(err, EngineError::NotFound { .. }));

        let err = admin.delete_rule(&a.id).await.unwrap_err();
        assert!(matches!(err, EngineError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_create_validates_payload() {
        let db = test_db().await;
        let admin = RuleAdmin::new(db);

        let err = admin.create_rule(payload("p", 0, None, 1000)).await.unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));

        let err = admin.create_rule(payload("p", 10, Some(5), 1000)).await.unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));

        let err = admin.create_rule(payload("p", 1, None, 100_000_000)).await.unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_overlapping_creates_cannot_both_commit() {
        // A file-backed pool with several connections, so the two writes can
        // actually race instead of queueing on a single in-memory handle.
        let path = std::env::temp_dir().join(format!("mercato-rules-{}.db", Uuid::new_v4()));
        let db = Database::new(DbConfig::new(&path).max_connections(4))
            .await
            .unwrap();
        let prod = seed_product(&db).await;

        let admin_a = RuleAdmin::new(db.clone());
        let admin_b = RuleAdmin::new(db.clone());
        let new_a = payload(&prod.id, 1, Some(999), 1000);
        let new_b = payload(&prod.id, 500, Some(1500), 900);

        let (res_a, res_b) = tokio::join!(
            tokio::spawn(async move { admin_a.create_rule(new_a).await }),
            tokio::spawn(async move { admin_b.create_rule(new_b).await }),
        );
        let results = [res_a.unwrap(), res_b.unwrap()];

        // The loser surfaces either Conflict (it saw the winner's row) or a
        // storage error (its write lost the commit race); never a commit.
        let successes = results.iter().filter(|r| r.is_ok()).count();
        assert!(successes <= 1, "both overlapping writes committed: {results:?}");

        // Whatever the interleaving, the surviving active set tiles cleanly.
        let admin = RuleAdmin::new(db.clone());
        let active = admin.list_rules(&prod.id, false).await.unwrap();
        for (i, a) in active.iter().enumerate() {
            for b in &active[i + 1..] {
                assert!(
                    !mercato_core::rules::intervals_overlap(
                        a.min_quantity,
                        a.max_quantity,
                        b.min_quantity,
                        b.max_quantity,
                    ),
                    "active rules {} and {} overlap",
                    a.id,
                    b.id,
                );
            }
        }

        db.close().await;
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{suffix}", path.display()));
        }
    }
}
