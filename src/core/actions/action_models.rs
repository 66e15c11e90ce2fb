// Moderation action domain models.

use crate::core::restrictions::NewRestriction;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The decisions a moderator can take on a reviewed item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    DeleteContent,
    Ban,
    Mute,
    Warn,
    ApproveContent,
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionType::DeleteContent => write!(f, "delete_content"),
            ActionType::Ban => write!(f, "ban"),
            ActionType::Mute => write!(f, "mute"),
            ActionType::Warn => write!(f, "warn"),
            ActionType::ApproveContent => write!(f, "approve_content"),
        }
    }
}

impl std::str::FromStr for ActionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "delete_content" => Ok(ActionType::DeleteContent),
            "ban" => Ok(ActionType::Ban),
            "mute" => Ok(ActionType::Mute),
            "warn" => Ok(ActionType::Warn),
            "approve_content" => Ok(ActionType::ApproveContent),
            other => Err(format!("unknown action type: {}", other)),
        }
    }
}

/// What a moderation action is aimed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    Message,
    Post,
    User,
}

impl std::fmt::Display for TargetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetType::Message => write!(f, "message"),
            TargetType::Post => write!(f, "post"),
            TargetType::User => write!(f, "user"),
        }
    }
}

impl std::str::FromStr for TargetType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "message" => Ok(TargetType::Message),
            "post" => Ok(TargetType::Post),
            "user" => Ok(TargetType::User),
            other => Err(format!("unknown target type: {}", other)),
        }
    }
}

/// What a moderator submits.
#[derive(Debug, Clone, Deserialize)]
pub struct ActionRequest {
    pub target_type: TargetType,
    pub target_id: i64,
    pub action_type: ActionType,
    pub reason: String,
    pub duration_hours: Option<i64>,
    pub notes: Option<String>,
    /// The queue item this decision resolves, if it came off the queue.
    pub queue_item_id: Option<i64>,
}

/// The append-only audit row written for every executed action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationAction {
    pub id: i64,
    pub moderator_id: i64,
    pub target_type: TargetType,
    pub target_id: i64,
    pub action_type: ActionType,
    pub reason: String,
    pub duration_hours: Option<i64>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// The state mutation an action performs, resolved from the request.
#[derive(Debug, Clone)]
pub enum ActionEffect {
    /// Soft delete - content is retained for audit.
    SoftDeleteMessage { message_id: i64 },
    ApproveMessage { message_id: i64 },
    Restrict(NewRestriction),
}

/// The full write set of one action: audit row first, then the effect, then
/// the queue resolution. Committed as one transaction by the store.
#[derive(Debug, Clone)]
pub struct ActionRecord {
    pub moderator_id: i64,
    pub target_type: TargetType,
    pub target_id: i64,
    pub action_type: ActionType,
    pub reason: String,
    pub duration_hours: Option<i64>,
    pub notes: Option<String>,
    pub effect: ActionEffect,
    pub queue_item_id: Option<i64>,
}
