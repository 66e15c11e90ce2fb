// Restriction ledger - tracks active and expired per-user restrictions.
//
// Expiry is lazy: "is this user restricted" is a point-in-time predicate
// over a small append-only set, so we filter at query time instead of
// running a background expiration task.

use super::restriction_models::{NewRestriction, RestrictionType, UserRestriction};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use thiserror::Error;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum RestrictionError {
    #[error("Storage error: {0}")]
    StorageError(String),
}

// ============================================================================
// STORAGE TRAIT (PORT)
// ============================================================================

/// Trait for persisting user restrictions.
#[async_trait]
pub trait RestrictionStore: Send + Sync {
    /// Append a restriction row. Rows are never updated or deleted.
    async fn insert(&self, restriction: NewRestriction) -> Result<UserRestriction, RestrictionError>;

    /// All restrictions for a user, newest first.
    async fn for_user(&self, user_id: i64) -> Result<Vec<UserRestriction>, RestrictionError>;
}

// ============================================================================
// CORE SERVICE
// ============================================================================

/// The restriction ledger: answers "can this user send right now" and
/// records new restrictions.
pub struct RestrictionLedger<S: RestrictionStore> {
    store: S,
}

impl<S: RestrictionStore> RestrictionLedger<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// The most recent restriction that currently gates sending, if any.
    /// Behavior warnings are advisory and never returned here.
    pub async fn active_restriction(
        &self,
        user_id: i64,
    ) -> Result<Option<UserRestriction>, RestrictionError> {
        let now = Utc::now();
        let restrictions = self.store.for_user(user_id).await?;
        Ok(restrictions
            .into_iter()
            .filter(|r| r.restriction_type.gates_sending())
            .find(|r| r.is_active_at(now)))
    }

    /// Apply a restriction. `duration_hours = None` means permanent.
    pub async fn apply(
        &self,
        user_id: i64,
        restriction_type: RestrictionType,
        reason: impl Into<String>,
        duration_hours: Option<i64>,
        applied_by: Option<i64>,
    ) -> Result<UserRestriction, RestrictionError> {
        let restricted_until = duration_hours.map(|h| Utc::now() + Duration::hours(h));
        let restriction = NewRestriction {
            user_id,
            restriction_type,
            reason: reason.into(),
            restricted_until,
            is_permanent: duration_hours.is_none(),
            applied_by,
        };
        let stored = self.store.insert(restriction).await?;
        tracing::info!(
            user_id,
            restriction_type = %stored.restriction_type,
            permanent = stored.is_permanent,
            "Applied user restriction"
        );
        Ok(stored)
    }

    /// Full history for a user, newest first (moderator tooling).
    pub async fn history(&self, user_id: i64) -> Result<Vec<UserRestriction>, RestrictionError> {
        self.store.for_user(user_id).await
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use dashmap::DashMap;
    use std::sync::atomic::{AtomicI64, Ordering};

    /// In-memory store for testing
    struct MockRestrictionStore {
        rows: DashMap<i64, Vec<UserRestriction>>,
        next_id: AtomicI64,
    }

    impl MockRestrictionStore {
        fn new() -> Self {
            Self {
                rows: DashMap::new(),
                next_id: AtomicI64::new(1),
            }
        }
    }

    #[async_trait]
    impl RestrictionStore for MockRestrictionStore {
        async fn insert(
            &self,
            restriction: NewRestriction,
        ) -> Result<UserRestriction, RestrictionError> {
            let stored = UserRestriction {
                id: self.next_id.fetch_add(1, Ordering::SeqCst),
                user_id: restriction.user_id,
                restriction_type: restriction.restriction_type,
                reason: restriction.reason,
                restricted_until: restriction.restricted_until,
                is_permanent: restriction.is_permanent,
                applied_by: restriction.applied_by,
                created_at: Utc::now(),
            };
            self.rows
                .entry(restriction.user_id)
                .or_insert_with(Vec::new)
                .insert(0, stored.clone());
            Ok(stored)
        }

        async fn for_user(&self, user_id: i64) -> Result<Vec<UserRestriction>, RestrictionError> {
            Ok(self.rows.get(&user_id).map(|v| v.clone()).unwrap_or_default())
        }
    }

    #[tokio::test]
    async fn test_no_restrictions_means_not_restricted() {
        let ledger = RestrictionLedger::new(MockRestrictionStore::new());

        assert!(ledger.active_restriction(42).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_temporary_mute_is_active_until_expiry() {
        let ledger = RestrictionLedger::new(MockRestrictionStore::new());

        ledger
            .apply(42, RestrictionType::TemporaryMute, "spamming", Some(24), Some(7))
            .await
            .unwrap();

        let active = ledger.active_restriction(42).await.unwrap().unwrap();
        assert_eq!(active.restriction_type, RestrictionType::TemporaryMute);
        assert!(!active.is_permanent);
        assert!(active.restricted_until.unwrap() > Utc::now());
    }

    #[tokio::test]
    async fn test_expired_mute_is_not_active() {
        let store = MockRestrictionStore::new();
        store
            .insert(NewRestriction {
                user_id: 42,
                restriction_type: RestrictionType::TemporaryMute,
                reason: "old offense".into(),
                restricted_until: Some(Utc::now() - Duration::hours(1)),
                is_permanent: false,
                applied_by: None,
            })
            .await
            .unwrap();
        let ledger = RestrictionLedger::new(store);

        assert!(ledger.active_restriction(42).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_permanent_ban_never_expires() {
        let ledger = RestrictionLedger::new(MockRestrictionStore::new());

        ledger
            .apply(42, RestrictionType::Banned, "repeat offender", None, Some(7))
            .await
            .unwrap();

        let active = ledger.active_restriction(42).await.unwrap().unwrap();
        assert_eq!(active.restriction_type, RestrictionType::Banned);
        assert!(active.is_permanent);
        assert!(active.restricted_until.is_none());
    }

    #[tokio::test]
    async fn test_most_recent_active_restriction_wins() {
        let ledger = RestrictionLedger::new(MockRestrictionStore::new());

        ledger
            .apply(42, RestrictionType::TemporaryMute, "first", Some(24), None)
            .await
            .unwrap();
        ledger
            .apply(42, RestrictionType::Banned, "second", None, Some(7))
            .await
            .unwrap();

        let active = ledger.active_restriction(42).await.unwrap().unwrap();
        assert_eq!(active.reason, "second");
    }

    #[tokio::test]
    async fn test_behavior_warning_does_not_gate_sending() {
        let ledger = RestrictionLedger::new(MockRestrictionStore::new());

        ledger
            .apply(42, RestrictionType::BehaviorWarning, "watch it", None, Some(7))
            .await
            .unwrap();

        assert!(ledger.active_restriction(42).await.unwrap().is_none());
        assert_eq!(ledger.history(42).await.unwrap().len(), 1);
    }
}
