// Messaging domain models.
//
// These are pure domain types with no HTTP or database dependencies.
// The api layer converts these into response payloads.

use crate::core::restrictions::NewRestriction;
use crate::core::safety::Violation;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Review state of a message.
///
/// A message with zero rule matches deliberately starts as `Pending`, not
/// `Approved` - moderator tooling depends on that default, so changing it
/// needs a product decision first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModerationStatus {
    Pending,
    Flagged,
    Blocked,
    Approved,
}

impl std::fmt::Display for ModerationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModerationStatus::Pending => write!(f, "pending"),
            ModerationStatus::Flagged => write!(f, "flagged"),
            ModerationStatus::Blocked => write!(f, "blocked"),
            ModerationStatus::Approved => write!(f, "approved"),
        }
    }
}

impl std::str::FromStr for ModerationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ModerationStatus::Pending),
            "flagged" => Ok(ModerationStatus::Flagged),
            "blocked" => Ok(ModerationStatus::Blocked),
            "approved" => Ok(ModerationStatus::Approved),
            other => Err(format!("unknown moderation status: {}", other)),
        }
    }
}

/// A persisted message with its safety verdict baked in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub conversation_id: i64,
    pub sender_id: i64,
    pub content: String,
    pub message_type: String,
    pub safety_score: i32,
    pub flagged_terms: Vec<String>,
    pub is_blocked: bool,
    pub moderation_status: ModerationStatus,
    pub parent_message_id: Option<i64>,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
}

/// A conversation, as far as the pipeline cares: does it exist, is it open,
/// and when did it last see a message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: i64,
    pub title: Option<String>,
    pub is_active: bool,
    pub last_message_at: Option<DateTime<Utc>>,
}

/// What a sender submits.
#[derive(Debug, Clone, Deserialize)]
pub struct SendMessage {
    pub content: String,
    pub message_type: Option<String>,
    pub parent_message_id: Option<i64>,
}

/// The message row to be written, verdict included.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub conversation_id: i64,
    pub sender_id: i64,
    pub content: String,
    pub message_type: String,
    pub parent_message_id: Option<i64>,
    pub safety_score: i32,
    pub flagged_terms: Vec<String>,
    pub is_blocked: bool,
    pub moderation_status: ModerationStatus,
}

/// One safety log row per distinct violation. The message id is filled in
/// by the store once the message row exists.
#[derive(Debug, Clone)]
pub struct SafetyLogRecord {
    pub user_id: i64,
    pub violation_type: String,
    pub severity_level: i32,
    pub flagged_terms: Vec<String>,
    /// "blocked" or "flagged".
    pub action_taken: String,
}

/// Instruction to enqueue the message for human review. The store links it
/// to the freshly inserted message id.
#[derive(Debug, Clone)]
pub struct ReviewFlag {
    /// 3-5; higher is reviewed first.
    pub priority: i32,
    pub violation_types: Vec<String>,
}

/// The full write set of one send attempt. Everything in here commits in a
/// single transaction or not at all.
#[derive(Debug, Clone)]
pub struct SendRecord {
    pub message: NewMessage,
    pub safety_logs: Vec<SafetyLogRecord>,
    pub review_flag: Option<ReviewFlag>,
    pub auto_restriction: Option<NewRestriction>,
}

/// Safety metadata returned to the sender alongside (or instead of) the
/// persisted message.
#[derive(Debug, Clone, Serialize)]
pub struct SafetyInfo {
    pub is_blocked: bool,
    pub safety_score: i32,
    pub moderation_status: ModerationStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub violations: Vec<Violation>,
}

/// Result of a committed send attempt. Blocked messages are still persisted
/// (for audit and review); the api layer decides what the sender gets back.
#[derive(Debug, Clone)]
pub struct SendOutcome {
    pub message: Message,
    pub safety: SafetyInfo,
}
