// Review queue domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What kind of thing a queue item points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    Message,
    Post,
    UserReport,
}

impl std::fmt::Display for ItemType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ItemType::Message => write!(f, "message"),
            ItemType::Post => write!(f, "post"),
            ItemType::UserReport => write!(f, "user_report"),
        }
    }
}

impl std::str::FromStr for ItemType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "message" => Ok(ItemType::Message),
            "post" => Ok(ItemType::Post),
            "user_report" => Ok(ItemType::UserReport),
            other => Err(format!("unknown item type: {}", other)),
        }
    }
}

/// Lifecycle: created by the pipeline -> claimed by a moderator -> resolved
/// by the action executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueStatus {
    Pending,
    InReview,
    Resolved,
}

impl std::fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueueStatus::Pending => write!(f, "pending"),
            QueueStatus::InReview => write!(f, "in_review"),
            QueueStatus::Resolved => write!(f, "resolved"),
        }
    }
}

impl std::str::FromStr for QueueStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(QueueStatus::Pending),
            "in_review" => Ok(QueueStatus::InReview),
            "resolved" => Ok(QueueStatus::Resolved),
            other => Err(format!("unknown queue status: {}", other)),
        }
    }
}

/// One item awaiting (or through) human review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueItem {
    pub id: i64,
    pub item_type: ItemType,
    /// Id of the message/post/report this item points at.
    pub item_id: i64,
    /// 3 (routine) to 5 (urgent).
    pub priority: i32,
    pub violation_types: Vec<String>,
    pub status: QueueStatus,
    pub assigned_to: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// A queue item plus a denormalized preview of the content it points at,
/// so moderators can triage without a second lookup.
#[derive(Debug, Clone, Serialize)]
pub struct QueueListing {
    #[serde(flatten)]
    pub item: QueueItem,
    pub content_preview: Option<String>,
}

/// Filters for listing the queue.
#[derive(Debug, Clone, Default)]
pub struct QueueFilters {
    pub status: Option<QueueStatus>,
    pub item_type: Option<ItemType>,
    pub min_priority: Option<i32>,
    pub assigned_to: Option<i64>,
}
