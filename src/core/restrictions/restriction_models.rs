// Restriction domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What kind of limitation is placed on a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestrictionType {
    /// Cannot send messages until `restricted_until`.
    TemporaryMute,
    /// Cannot send messages, permanently.
    Banned,
    /// A recorded warning. Never gates sending - it exists so the user's
    /// record and the audit trail live in one place.
    BehaviorWarning,
}

impl RestrictionType {
    /// Whether this restriction type prevents the user from sending.
    pub fn gates_sending(&self) -> bool {
        !matches!(self, RestrictionType::BehaviorWarning)
    }
}

impl std::fmt::Display for RestrictionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RestrictionType::TemporaryMute => write!(f, "temporary_mute"),
            RestrictionType::Banned => write!(f, "banned"),
            RestrictionType::BehaviorWarning => write!(f, "behavior_warning"),
        }
    }
}

/// One restriction row. Multiple rows may exist per user; the most recent
/// still-active one wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRestriction {
    pub id: i64,
    pub user_id: i64,
    pub restriction_type: RestrictionType,
    pub reason: String,
    /// `None` for permanent restrictions.
    pub restricted_until: Option<DateTime<Utc>>,
    pub is_permanent: bool,
    /// Moderator who applied it; `None` for automatic restrictions.
    pub applied_by: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl UserRestriction {
    /// A restriction is active iff it is permanent or not yet expired.
    /// Expiry is evaluated lazily at query time - there is no sweeper.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.is_permanent || self.restricted_until.map(|until| until > now).unwrap_or(false)
    }
}

/// Payload for writing a new restriction.
#[derive(Debug, Clone)]
pub struct NewRestriction {
    pub user_id: i64,
    pub restriction_type: RestrictionType,
    pub reason: String,
    pub restricted_until: Option<DateTime<Utc>>,
    pub is_permanent: bool,
    pub applied_by: Option<i64>,
}
