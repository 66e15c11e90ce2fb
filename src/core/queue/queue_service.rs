// Moderation queue - the prioritized, assignable worklist for human review.
//
// Multiple moderators race to claim the same item; the claim is an atomic
// conditional update in the store (no locks), so exactly one of them wins
// and the rest get a "not found or already assigned" answer. Losing that
// race is an expected outcome, not a fault.

use super::queue_models::{QueueFilters, QueueItem, QueueListing};
use async_trait::async_trait;
use thiserror::Error;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Queue item not found or already assigned")]
    AlreadyClaimed,

    #[error("Queue item not found")]
    NotFound,
}

// ============================================================================
// STORAGE TRAIT (PORT)
// ============================================================================

/// Trait for persisting review queue items.
///
/// Items are inserted by the message pipeline's atomic commit, never through
/// this port - the queue only lists, claims and resolves.
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// List items matching the filters, ordered `priority DESC,
    /// created_at ASC` - oldest high-priority work first.
    async fn list(
        &self,
        filters: &QueueFilters,
        page: u32,
        limit: u32,
    ) -> Result<Vec<QueueListing>, QueueError>;

    /// Atomically move a pending item to in_review and assign it. Returns
    /// `None` when the item does not exist or was no longer pending -
    /// i.e. the caller lost the race.
    async fn claim(&self, item_id: i64, moderator_id: i64)
        -> Result<Option<QueueItem>, QueueError>;

    /// Mark an item resolved. Returns false if it does not exist.
    async fn resolve(&self, item_id: i64) -> Result<bool, QueueError>;

    /// Item counts per status (backlog reporting).
    async fn status_counts(&self) -> Result<Vec<(String, i64)>, QueueError>;
}

// ============================================================================
// CORE SERVICE
// ============================================================================

pub struct ModerationQueue<S: QueueStore> {
    store: S,
}

impl<S: QueueStore> ModerationQueue<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn list(
        &self,
        filters: &QueueFilters,
        page: u32,
        limit: u32,
    ) -> Result<Vec<QueueListing>, QueueError> {
        self.store.list(filters, page, limit).await
    }

    /// Claim an item for a moderator. Exactly one concurrent caller
    /// succeeds; everyone else gets `AlreadyClaimed`.
    pub async fn claim(&self, item_id: i64, moderator_id: i64) -> Result<QueueItem, QueueError> {
        match self.store.claim(item_id, moderator_id).await? {
            Some(item) => {
                tracing::info!(item_id, moderator_id, "Queue item claimed");
                Ok(item)
            }
            None => Err(QueueError::AlreadyClaimed),
        }
    }

    /// Mark an item resolved. Normally invoked by the action executor as
    /// part of its transaction; exposed here for tooling.
    pub async fn resolve(&self, item_id: i64) -> Result<(), QueueError> {
        if self.store.resolve(item_id).await? {
            Ok(())
        } else {
            Err(QueueError::NotFound)
        }
    }

    pub async fn status_counts(&self) -> Result<Vec<(String, i64)>, QueueError> {
        self.store.status_counts().await
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::queue::queue_models::{ItemType, QueueStatus};
    use chrono::{Duration, Utc};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    /// In-memory store reproducing the conditional-claim semantics of the
    /// SQLite store: the pending check and the assignment happen under one
    /// lock, like a single conditional UPDATE.
    struct MockQueueStore {
        items: Mutex<HashMap<i64, QueueItem>>,
    }

    impl MockQueueStore {
        fn new() -> Self {
            Self {
                items: Mutex::new(HashMap::new()),
            }
        }

        fn seed(&self, id: i64, priority: i32, age_secs: i64) {
            self.items.lock().unwrap().insert(
                id,
                QueueItem {
                    id,
                    item_type: ItemType::Message,
                    item_id: id * 100,
                    priority,
                    violation_types: vec!["spam".into()],
                    status: QueueStatus::Pending,
                    assigned_to: None,
                    created_at: Utc::now() - Duration::seconds(age_secs),
                },
            );
        }
    }

    #[async_trait]
    impl QueueStore for MockQueueStore {
        async fn list(
            &self,
            filters: &QueueFilters,
            page: u32,
            limit: u32,
        ) -> Result<Vec<QueueListing>, QueueError> {
            let items = self.items.lock().unwrap();
            let mut matching: Vec<QueueItem> = items
                .values()
                .filter(|i| filters.status.map(|s| i.status == s).unwrap_or(true))
                .filter(|i| filters.item_type.map(|t| i.item_type == t).unwrap_or(true))
                .filter(|i| filters.min_priority.map(|p| i.priority >= p).unwrap_or(true))
                .filter(|i| {
                    filters
                        .assigned_to
                        .map(|m| i.assigned_to == Some(m))
                        .unwrap_or(true)
                })
                .cloned()
                .collect();
            matching.sort_by(|a, b| {
                b.priority
                    .cmp(&a.priority)
                    .then(a.created_at.cmp(&b.created_at))
            });
            Ok(matching
                .into_iter()
                .skip((page.saturating_sub(1) * limit) as usize)
                .take(limit as usize)
                .map(|item| QueueListing {
                    item,
                    content_preview: None,
                })
                .collect())
        }

        async fn claim(
            &self,
            item_id: i64,
            moderator_id: i64,
        ) -> Result<Option<QueueItem>, QueueError> {
            let mut items = self.items.lock().unwrap();
            match items.get_mut(&item_id) {
                Some(item) if item.status == QueueStatus::Pending => {
                    item.status = QueueStatus::InReview;
                    item.assigned_to = Some(moderator_id);
                    Ok(Some(item.clone()))
                }
                _ => Ok(None),
            }
        }

        async fn resolve(&self, item_id: i64) -> Result<bool, QueueError> {
            let mut items = self.items.lock().unwrap();
            match items.get_mut(&item_id) {
                Some(item) => {
                    item.status = QueueStatus::Resolved;
                    Ok(true)
                }
                None => Ok(false),
            }
        }

        async fn status_counts(&self) -> Result<Vec<(String, i64)>, QueueError> {
            let items = self.items.lock().unwrap();
            let mut counts: HashMap<String, i64> = HashMap::new();
            for item in items.values() {
                *counts.entry(item.status.to_string()).or_insert(0) += 1;
            }
            Ok(counts.into_iter().collect())
        }
    }

    #[tokio::test]
    async fn test_listing_orders_priority_desc_then_oldest_first() {
        let store = MockQueueStore::new();
        store.seed(1, 3, 100);
        store.seed(2, 5, 10); // newer urgent item
        store.seed(3, 5, 50); // older urgent item
        store.seed(4, 4, 5);
        let queue = ModerationQueue::new(store);

        let listed = queue.list(&QueueFilters::default(), 1, 10).await.unwrap();
        let ids: Vec<i64> = listed.iter().map(|l| l.item.id).collect();

        // Urgent first, and within the urgent band the older item leads.
        assert_eq!(ids, vec![3, 2, 4, 1]);
    }

    #[tokio::test]
    async fn test_listing_filters_by_min_priority_and_status() {
        let store = MockQueueStore::new();
        store.seed(1, 3, 0);
        store.seed(2, 5, 0);
        let queue = ModerationQueue::new(store);

        queue.claim(1, 7).await.unwrap();

        let filters = QueueFilters {
            status: Some(QueueStatus::Pending),
            min_priority: Some(4),
            ..Default::default()
        };
        let listed = queue.list(&filters, 1, 10).await.unwrap();

        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].item.id, 2);
    }

    #[tokio::test]
    async fn test_claim_assigns_and_moves_to_in_review() {
        let store = MockQueueStore::new();
        store.seed(1, 3, 0);
        let queue = ModerationQueue::new(store);

        let item = queue.claim(1, 42).await.unwrap();

        assert_eq!(item.status, QueueStatus::InReview);
        assert_eq!(item.assigned_to, Some(42));
    }

    #[tokio::test]
    async fn test_second_claim_loses_the_race() {
        let store = MockQueueStore::new();
        store.seed(1, 3, 0);
        let queue = ModerationQueue::new(store);

        queue.claim(1, 42).await.unwrap();
        let err = queue.claim(1, 43).await.unwrap_err();

        assert!(matches!(err, QueueError::AlreadyClaimed));
    }

    #[tokio::test]
    async fn test_concurrent_claims_have_exactly_one_winner() {
        let store = MockQueueStore::new();
        store.seed(1, 5, 0);
        let queue = Arc::new(ModerationQueue::new(store));

        let mut handles = Vec::new();
        for moderator_id in 0..8i64 {
            let queue = Arc::clone(&queue);
            handles.push(tokio::spawn(
                async move { queue.claim(1, moderator_id).await },
            ));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn test_claiming_missing_item_reports_already_claimed() {
        let queue = ModerationQueue::new(MockQueueStore::new());

        let err = queue.claim(999, 42).await.unwrap_err();

        assert!(matches!(err, QueueError::AlreadyClaimed));
    }

    #[tokio::test]
    async fn test_resolve_marks_item_resolved() {
        let store = MockQueueStore::new();
        store.seed(1, 3, 0);
        let queue = ModerationQueue::new(store);

        queue.resolve(1).await.unwrap();

        let filters = QueueFilters {
            status: Some(QueueStatus::Resolved),
            ..Default::default()
        };
        let listed = queue.list(&filters, 1, 10).await.unwrap();
        assert_eq!(listed.len(), 1);
    }
}
