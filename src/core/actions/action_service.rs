// Action executor - turns moderator decisions into state changes.
//
// Every action writes its audit row first, then the side effect, then
// resolves the originating queue item - all inside one store transaction
// so a half-applied decision can never exist.
//
// NO HTTP or database dependencies here - just pure domain logic.

use super::action_models::{
    ActionEffect, ActionRecord, ActionRequest, ActionType, ModerationAction, TargetType,
};
use crate::core::messaging::{Message, ModerationStatus};
use crate::core::restrictions::{NewRestriction, RestrictionType};
use async_trait::async_trait;
use thiserror::Error;

/// Warnings are recorded at this fixed severity.
pub const WARN_SEVERITY: i32 = 3;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum ActionError {
    #[error("Invalid action: {0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Storage error: {0}")]
    StorageError(String),
}

// ============================================================================
// STORAGE TRAIT (PORT)
// ============================================================================

/// Trait for persisting moderation actions and applying their effects.
#[async_trait]
pub trait ActionStore: Send + Sync {
    /// Look up a message so user-level actions can resolve its sender.
    async fn find_message(&self, message_id: i64) -> Result<Option<Message>, ActionError>;

    /// Commit the audit row, the effect and the queue resolution in one
    /// atomic unit. Fails with `NotFound` if a supplied queue item id does
    /// not exist.
    async fn commit_action(&self, record: ActionRecord) -> Result<ModerationAction, ActionError>;
}

// ============================================================================
// CORE SERVICE
// ============================================================================

pub struct ActionExecutor<S: ActionStore> {
    store: S,
}

impl<S: ActionStore> ActionExecutor<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Execute one moderator decision.
    pub async fn execute(
        &self,
        moderator_id: i64,
        request: ActionRequest,
    ) -> Result<ModerationAction, ActionError> {
        if request.reason.trim().is_empty() {
            return Err(ActionError::Validation("reason must not be empty".into()));
        }

        let effect = self.resolve_effect(&request).await?;

        let record = ActionRecord {
            moderator_id,
            target_type: request.target_type,
            target_id: request.target_id,
            action_type: request.action_type,
            reason: request.reason,
            duration_hours: request.duration_hours,
            notes: request.notes,
            effect,
            queue_item_id: request.queue_item_id,
        };

        let action = self.store.commit_action(record).await?;
        tracing::info!(
            moderator_id,
            action_type = %action.action_type,
            target_type = %action.target_type,
            target_id = action.target_id,
            "Executed moderation action"
        );
        Ok(action)
    }

    /// Work out the concrete state mutation for a request, resolving message
    /// targets to their sender where the action lands on a user.
    async fn resolve_effect(&self, request: &ActionRequest) -> Result<ActionEffect, ActionError> {
        match request.action_type {
            ActionType::DeleteContent => {
                let message = self.require_message(request).await?;
                Ok(ActionEffect::SoftDeleteMessage {
                    message_id: message.id,
                })
            }
            ActionType::ApproveContent => {
                let message = self.require_message(request).await?;
                // Only pending|flagged may move to approved; blocked stays
                // blocked.
                if message.moderation_status == ModerationStatus::Blocked {
                    return Err(ActionError::Validation(
                        "blocked messages cannot be approved".into(),
                    ));
                }
                Ok(ActionEffect::ApproveMessage {
                    message_id: message.id,
                })
            }
            ActionType::Ban => {
                let user_id = self.resolve_user(request).await?;
                Ok(ActionEffect::Restrict(NewRestriction {
                    user_id,
                    restriction_type: RestrictionType::Banned,
                    reason: request.reason.clone(),
                    restricted_until: None,
                    is_permanent: true,
                    applied_by: None, // filled from the audit row by the store
                }))
            }
            ActionType::Mute => {
                let user_id = self.resolve_user(request).await?;
                let restricted_until = request
                    .duration_hours
                    .map(|h| chrono::Utc::now() + chrono::Duration::hours(h));
                Ok(ActionEffect::Restrict(NewRestriction {
                    user_id,
                    restriction_type: RestrictionType::TemporaryMute,
                    reason: request.reason.clone(),
                    restricted_until,
                    // A mute without a duration is a permanent mute.
                    is_permanent: request.duration_hours.is_none(),
                    applied_by: None,
                }))
            }
            ActionType::Warn => {
                let user_id = self.resolve_user(request).await?;
                Ok(ActionEffect::Restrict(NewRestriction {
                    user_id,
                    restriction_type: RestrictionType::BehaviorWarning,
                    reason: format!("Warning (severity {}): {}", WARN_SEVERITY, request.reason),
                    restricted_until: None,
                    is_permanent: false,
                    applied_by: None,
                }))
            }
        }
    }

    async fn require_message(&self, request: &ActionRequest) -> Result<Message, ActionError> {
        if request.target_type != TargetType::Message {
            return Err(ActionError::Validation(format!(
                "{} requires a message target",
                request.action_type
            )));
        }
        self.store
            .find_message(request.target_id)
            .await?
            .ok_or(ActionError::NotFound("message"))
    }

    /// Ban/mute/warn land on a user; a message target resolves to its sender.
    async fn resolve_user(&self, request: &ActionRequest) -> Result<i64, ActionError> {
        match request.target_type {
            TargetType::User => Ok(request.target_id),
            TargetType::Message => {
                let message = self
                    .store
                    .find_message(request.target_id)
                    .await?
                    .ok_or(ActionError::NotFound("message"))?;
                Ok(message.sender_id)
            }
            TargetType::Post => Err(ActionError::Validation(
                "user-level actions on posts are not supported".into(),
            )),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::messaging::ModerationStatus;
    use chrono::Utc;
    use dashmap::DashMap;
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::sync::Mutex;

    struct MockActionStore {
        messages: DashMap<i64, Message>,
        committed: Mutex<Vec<ActionRecord>>,
        next_id: AtomicI64,
    }

    impl MockActionStore {
        fn new() -> Self {
            Self {
                messages: DashMap::new(),
                committed: Mutex::new(Vec::new()),
                next_id: AtomicI64::new(1),
            }
        }

        fn seed_message(&self, id: i64, sender_id: i64, status: ModerationStatus) {
            self.messages.insert(
                id,
                Message {
                    id,
                    conversation_id: 1,
                    sender_id,
                    content: "flagged content".into(),
                    message_type: "text".into(),
                    safety_score: 60,
                    flagged_terms: vec!["spam".into()],
                    is_blocked: status == ModerationStatus::Blocked,
                    moderation_status: status,
                    parent_message_id: None,
                    is_deleted: false,
                    created_at: Utc::now(),
                },
            );
        }

        fn last_record(&self) -> ActionRecord {
            self.committed.lock().unwrap().last().unwrap().clone()
        }
    }

    #[async_trait]
    impl ActionStore for MockActionStore {
        async fn find_message(&self, message_id: i64) -> Result<Option<Message>, ActionError> {
            Ok(self.messages.get(&message_id).map(|m| m.clone()))
        }

        async fn commit_action(
            &self,
            record: ActionRecord,
        ) -> Result<ModerationAction, ActionError> {
            let action = ModerationAction {
                id: self.next_id.fetch_add(1, Ordering::SeqCst),
                moderator_id: record.moderator_id,
                target_type: record.target_type,
                target_id: record.target_id,
                action_type: record.action_type,
                reason: record.reason.clone(),
                duration_hours: record.duration_hours,
                notes: record.notes.clone(),
                created_at: Utc::now(),
            };
            self.committed.lock().unwrap().push(record);
            Ok(action)
        }
    }

    fn request(action_type: ActionType, target_type: TargetType, target_id: i64) -> ActionRequest {
        ActionRequest {
            target_type,
            target_id,
            action_type,
            reason: "breaks community guidelines".into(),
            duration_hours: None,
            notes: None,
            queue_item_id: None,
        }
    }

    #[tokio::test]
    async fn test_delete_content_soft_deletes_the_message() {
        let store = MockActionStore::new();
        store.seed_message(5, 10, ModerationStatus::Flagged);
        let executor = ActionExecutor::new(store);

        let action = executor
            .execute(99, request(ActionType::DeleteContent, TargetType::Message, 5))
            .await
            .unwrap();

        assert_eq!(action.action_type, ActionType::DeleteContent);
        let record = executor.store.last_record();
        assert!(matches!(
            record.effect,
            ActionEffect::SoftDeleteMessage { message_id: 5 }
        ));
    }

    #[tokio::test]
    async fn test_ban_on_a_message_resolves_the_sender() {
        let store = MockActionStore::new();
        store.seed_message(5, 10, ModerationStatus::Flagged);
        let executor = ActionExecutor::new(store);

        executor
            .execute(99, request(ActionType::Ban, TargetType::Message, 5))
            .await
            .unwrap();

        let record = executor.store.last_record();
        match record.effect {
            ActionEffect::Restrict(ref r) => {
                assert_eq!(r.user_id, 10);
                assert_eq!(r.restriction_type, RestrictionType::Banned);
                assert!(r.is_permanent);
            }
            ref other => panic!("expected a restriction, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_mute_with_duration_is_time_boxed() {
        let executor = ActionExecutor::new(MockActionStore::new());

        let mut req = request(ActionType::Mute, TargetType::User, 10);
        req.duration_hours = Some(48);
        executor.execute(99, req).await.unwrap();

        let record = executor.store.last_record();
        match record.effect {
            ActionEffect::Restrict(ref r) => {
                assert_eq!(r.restriction_type, RestrictionType::TemporaryMute);
                assert!(!r.is_permanent);
                assert!(r.restricted_until.is_some());
            }
            ref other => panic!("expected a restriction, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_mute_without_duration_is_permanent() {
        let executor = ActionExecutor::new(MockActionStore::new());

        executor
            .execute(99, request(ActionType::Mute, TargetType::User, 10))
            .await
            .unwrap();

        let record = executor.store.last_record();
        match record.effect {
            ActionEffect::Restrict(ref r) => {
                assert!(r.is_permanent);
                assert!(r.restricted_until.is_none());
            }
            ref other => panic!("expected a restriction, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_warn_records_a_behavior_warning() {
        let executor = ActionExecutor::new(MockActionStore::new());

        executor
            .execute(99, request(ActionType::Warn, TargetType::User, 10))
            .await
            .unwrap();

        let record = executor.store.last_record();
        match record.effect {
            ActionEffect::Restrict(ref r) => {
                assert_eq!(r.restriction_type, RestrictionType::BehaviorWarning);
                assert!(r.reason.contains("severity 3"));
            }
            ref other => panic!("expected a restriction, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_approve_content_targets_the_message() {
        let store = MockActionStore::new();
        store.seed_message(5, 10, ModerationStatus::Flagged);
        let executor = ActionExecutor::new(store);

        executor
            .execute(99, request(ActionType::ApproveContent, TargetType::Message, 5))
            .await
            .unwrap();

        let record = executor.store.last_record();
        assert!(matches!(
            record.effect,
            ActionEffect::ApproveMessage { message_id: 5 }
        ));
    }

    #[tokio::test]
    async fn test_approve_rejects_a_blocked_message() {
        let store = MockActionStore::new();
        store.seed_message(5, 10, ModerationStatus::Blocked);
        let executor = ActionExecutor::new(store);

        let err = executor
            .execute(99, request(ActionType::ApproveContent, TargetType::Message, 5))
            .await
            .unwrap_err();

        assert!(matches!(err, ActionError::Validation(_)));
        assert!(executor.store.committed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_message_target_is_not_found() {
        let executor = ActionExecutor::new(MockActionStore::new());

        let err = executor
            .execute(99, request(ActionType::DeleteContent, TargetType::Message, 404))
            .await
            .unwrap_err();

        assert!(matches!(err, ActionError::NotFound("message")));
    }

    #[tokio::test]
    async fn test_empty_reason_is_rejected() {
        let executor = ActionExecutor::new(MockActionStore::new());

        let mut req = request(ActionType::Warn, TargetType::User, 10);
        req.reason = "  ".into();
        let err = executor.execute(99, req).await.unwrap_err();

        assert!(matches!(err, ActionError::Validation(_)));
    }

    #[tokio::test]
    async fn test_queue_item_id_travels_with_the_record() {
        let store = MockActionStore::new();
        store.seed_message(5, 10, ModerationStatus::Flagged);
        let executor = ActionExecutor::new(store);

        let mut req = request(ActionType::DeleteContent, TargetType::Message, 5);
        req.queue_item_id = Some(33);
        executor.execute(99, req).await.unwrap();

        assert_eq!(executor.store.last_record().queue_item_id, Some(33));
    }
}
