// Message pipeline - orchestrates send-time safety checks.
//
// A send attempt walks through: restriction check -> participant check ->
// content analysis -> one atomic commit of message + safety logs + review
// queue item + conversation touch + (possibly) an automatic restriction.
//
// NO HTTP or database dependencies here - just pure domain logic. The
// atomicity of the write set is the store's contract (commit_send).

use super::messaging_models::{
    Conversation, Message, ModerationStatus, NewMessage, ReviewFlag, SafetyInfo, SafetyLogRecord,
    SendMessage, SendOutcome, SendRecord,
};
use crate::core::restrictions::{
    NewRestriction, RestrictionError, RestrictionLedger, RestrictionStore, RestrictionType,
    UserRestriction,
};
use crate::core::safety::{FlaggedTermStore, SafetyAnalyzer, SafetyVerdict};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use thiserror::Error;

/// Violations at or above this severity trigger an automatic mute,
/// a strictly higher bar than the block threshold.
pub const AUTO_RESTRICT_SEVERITY: i32 = 5;
/// How long the automatic mute lasts.
pub const AUTO_RESTRICT_HOURS: i64 = 24;
const AUTO_RESTRICT_REASON: &str = "Automatic restriction due to severe content violation";

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum MessagingError {
    #[error("Message content must not be empty")]
    EmptyContent,

    #[error("Sender has an active restriction")]
    Restricted(UserRestriction),

    #[error("Conversation not found")]
    ConversationNotFound,

    #[error("Conversation is no longer active")]
    ConversationClosed,

    #[error("Sender is not a participant of this conversation")]
    NotParticipant,

    #[error("Message not found")]
    MessageNotFound,

    #[error("Storage error: {0}")]
    StorageError(String),
}

impl From<RestrictionError> for MessagingError {
    fn from(e: RestrictionError) -> Self {
        MessagingError::StorageError(e.to_string())
    }
}

// ============================================================================
// STORAGE TRAITS (PORTS)
// ============================================================================

/// Read access to conversations and their participant sets. Membership
/// management itself belongs to another part of the platform; the pipeline
/// only ever asks questions about it.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn find(&self, conversation_id: i64) -> Result<Option<Conversation>, MessagingError>;

    async fn is_participant(
        &self,
        conversation_id: i64,
        user_id: i64,
    ) -> Result<bool, MessagingError>;
}

/// Trait for persisting messages and their safety side effects.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Persist the whole write set of a send attempt in one atomic unit:
    /// message row, safety log rows, review queue item, conversation
    /// `last_message_at` touch and the automatic restriction. Either all of
    /// it lands or none of it does.
    async fn commit_send(&self, record: SendRecord) -> Result<Message, MessagingError>;

    /// Page through a conversation's history, newest first. Soft-deleted
    /// messages are hidden from everyone; blocked messages are only visible
    /// to their own sender.
    async fn list_for_conversation(
        &self,
        conversation_id: i64,
        viewer_id: i64,
        page: u32,
        limit: u32,
    ) -> Result<Vec<Message>, MessagingError>;

    /// Violation-type counts from the safety log since a point in time.
    async fn violation_counts_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<(String, i64)>, MessagingError>;

    /// How many messages were blocked since a point in time.
    async fn blocked_count_since(&self, since: DateTime<Utc>) -> Result<i64, MessagingError>;
}

// ============================================================================
// CORE SERVICE
// ============================================================================

/// The send-time pipeline tying the analyzer, the restriction ledger and the
/// conversation/message stores together.
pub struct MessagePipeline<T, R, C, M>
where
    T: FlaggedTermStore,
    R: RestrictionStore,
    C: ConversationStore,
    M: MessageStore,
{
    analyzer: Arc<SafetyAnalyzer<T>>,
    ledger: Arc<RestrictionLedger<R>>,
    conversations: C,
    messages: M,
}

impl<T, R, C, M> MessagePipeline<T, R, C, M>
where
    T: FlaggedTermStore,
    R: RestrictionStore,
    C: ConversationStore,
    M: MessageStore,
{
    pub fn new(
        analyzer: Arc<SafetyAnalyzer<T>>,
        ledger: Arc<RestrictionLedger<R>>,
        conversations: C,
        messages: M,
    ) -> Self {
        Self {
            analyzer,
            ledger,
            conversations,
            messages,
        }
    }

    /// Run one send attempt end to end.
    ///
    /// A blocked message is not an error: it is persisted (blocked, queued
    /// for review) and returned as a normal outcome. Errors mean nothing was
    /// written at all.
    pub async fn send_message(
        &self,
        conversation_id: i64,
        sender_id: i64,
        request: SendMessage,
    ) -> Result<SendOutcome, MessagingError> {
        // 1. Restricted senders are turned away before any side effect.
        if let Some(restriction) = self.ledger.active_restriction(sender_id).await? {
            return Err(MessagingError::Restricted(restriction));
        }

        // 2. The conversation must exist, be open, and include the sender.
        let conversation = self
            .conversations
            .find(conversation_id)
            .await?
            .ok_or(MessagingError::ConversationNotFound)?;
        if !conversation.is_active {
            return Err(MessagingError::ConversationClosed);
        }
        if !self
            .conversations
            .is_participant(conversation_id, sender_id)
            .await?
        {
            return Err(MessagingError::NotParticipant);
        }

        if request.content.trim().is_empty() {
            return Err(MessagingError::EmptyContent);
        }

        // 3. Score the content. The analyzer fails open internally.
        let verdict = self.analyzer.analyze(&request.content).await;

        let record = Self::build_send_record(conversation_id, sender_id, request, &verdict);

        let message = self.messages.commit_send(record).await?;

        if verdict.is_blocked {
            tracing::warn!(
                message_id = message.id,
                sender_id,
                score = verdict.safety_score,
                "Blocked outbound message"
            );
        } else if !verdict.matched_terms.is_empty() {
            tracing::info!(
                message_id = message.id,
                sender_id,
                score = verdict.safety_score,
                "Flagged outbound message for review"
            );
        }

        let safety = SafetyInfo {
            is_blocked: verdict.is_blocked,
            safety_score: verdict.safety_score,
            moderation_status: message.moderation_status,
            violations: verdict.violations,
        };
        Ok(SendOutcome { message, safety })
    }

    /// Translate a verdict into the full write set for one send.
    fn build_send_record(
        conversation_id: i64,
        sender_id: i64,
        request: SendMessage,
        verdict: &SafetyVerdict,
    ) -> SendRecord {
        let moderation_status = if verdict.is_blocked {
            ModerationStatus::Blocked
        } else if !verdict.matched_terms.is_empty() {
            ModerationStatus::Flagged
        } else {
            ModerationStatus::Pending
        };

        let action_taken = if verdict.is_blocked { "blocked" } else { "flagged" };
        let safety_logs = verdict
            .violations
            .iter()
            .map(|v| SafetyLogRecord {
                user_id: sender_id,
                violation_type: v.violation_type.clone(),
                severity_level: v.severity,
                flagged_terms: v.terms.clone(),
                action_taken: action_taken.to_string(),
            })
            .collect();

        let review_flag = if verdict.is_blocked || !verdict.matched_terms.is_empty() {
            Some(ReviewFlag {
                priority: review_priority(verdict.max_severity()),
                violation_types: verdict
                    .violations
                    .iter()
                    .map(|v| v.violation_type.clone())
                    .collect(),
            })
        } else {
            None
        };

        let auto_restriction = if verdict.max_severity() >= AUTO_RESTRICT_SEVERITY {
            Some(NewRestriction {
                user_id: sender_id,
                restriction_type: RestrictionType::TemporaryMute,
                reason: AUTO_RESTRICT_REASON.to_string(),
                restricted_until: Some(Utc::now() + Duration::hours(AUTO_RESTRICT_HOURS)),
                is_permanent: false,
                applied_by: None,
            })
        } else {
            None
        };

        SendRecord {
            message: NewMessage {
                conversation_id,
                sender_id,
                content: request.content,
                message_type: request.message_type.unwrap_or_else(|| "text".to_string()),
                parent_message_id: request.parent_message_id,
                safety_score: verdict.safety_score,
                flagged_terms: verdict.matched_terms.clone(),
                is_blocked: verdict.is_blocked,
                moderation_status,
            },
            safety_logs,
            review_flag,
            auto_restriction,
        }
    }

    /// Page through a conversation's history. Same participant gate as
    /// sending.
    pub async fn list_messages(
        &self,
        conversation_id: i64,
        viewer_id: i64,
        page: u32,
        limit: u32,
    ) -> Result<Vec<Message>, MessagingError> {
        let conversation = self
            .conversations
            .find(conversation_id)
            .await?
            .ok_or(MessagingError::ConversationNotFound)?;
        if !self
            .conversations
            .is_participant(conversation.id, viewer_id)
            .await?
        {
            return Err(MessagingError::NotParticipant);
        }
        self.messages
            .list_for_conversation(conversation_id, viewer_id, page, limit)
            .await
    }

    pub async fn violation_counts_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<(String, i64)>, MessagingError> {
        self.messages.violation_counts_since(since).await
    }

    pub async fn blocked_count_since(&self, since: DateTime<Utc>) -> Result<i64, MessagingError> {
        self.messages.blocked_count_since(since).await
    }
}

/// Review priority from the worst violation severity: urgent (5) for
/// block-level severity, elevated (4) for severity 3, routine (3) otherwise.
pub fn review_priority(max_severity: i32) -> i32 {
    if max_severity >= 4 {
        5
    } else if max_severity >= 3 {
        4
    } else {
        3
    }
}

// ============================================================================
// TESTS
// ============================================================================
