// Moderation endpoints: review queue, actions, rules and stats.
// Everything here is gated on the moderator/admin role.

use super::error::ApiError;
use super::identity::Identity;
use super::messages::PageParams;
use super::state::AppState;
use crate::core::actions::{ActionRequest, ModerationAction};
use crate::core::audit::AuditEvent;
use crate::core::queue::{ItemType, QueueFilters, QueueItem, QueueListing, QueueStatus};
use crate::core::restrictions::UserRestriction;
use crate::core::safety::{FlaggedTerm, NewFlaggedTerm};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::str::FromStr;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct QueueParams {
    pub status: Option<String>,
    pub item_type: Option<String>,
    pub priority: Option<i32>,
    pub assigned_to_me: Option<bool>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// GET /moderation/queue
pub async fn list_queue(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Query(params): Query<QueueParams>,
) -> Result<Json<Vec<QueueListing>>, ApiError> {
    identity.require_moderator()?;

    let status = params
        .status
        .as_deref()
        .map(QueueStatus::from_str)
        .transpose()
        .map_err(ApiError::BadRequest)?;
    let item_type = params
        .item_type
        .as_deref()
        .map(ItemType::from_str)
        .transpose()
        .map_err(ApiError::BadRequest)?;

    let filters = QueueFilters {
        status,
        item_type,
        min_priority: params.priority,
        assigned_to: if params.assigned_to_me.unwrap_or(false) {
            Some(identity.user_id)
        } else {
            None
        },
    };

    let paging = PageParams {
        page: params.page,
        limit: params.limit,
    };
    let items = state
        .queue
        .list(&filters, paging.page(), paging.limit())
        .await?;

    state
        .audit
        .log_data_access(identity.user_id, "moderation_queue", None)
        .await;

    Ok(Json(items))
}

#[derive(Debug, Deserialize)]
pub struct AssignRequest {
    pub assign_to_id: Option<i64>,
}

/// POST /moderation/queue/:item_id/assign
pub async fn assign_queue_item(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Path(item_id): Path<i64>,
    body: Option<Json<AssignRequest>>,
) -> Result<Json<QueueItem>, ApiError> {
    identity.require_moderator()?;

    let assignee = body
        .and_then(|Json(b)| b.assign_to_id)
        .unwrap_or(identity.user_id);
    let item = state.queue.claim(item_id, assignee).await?;

    state
        .audit
        .log_event(
            AuditEvent::new(identity.user_id, "queue.assign", "queue_item", Some(item_id))
                .with_detail(json!({ "assigned_to": assignee })),
        )
        .await;

    Ok(Json(item))
}

/// POST /moderation/actions
pub async fn create_action(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Json(request): Json<ActionRequest>,
) -> Result<(StatusCode, Json<ModerationAction>), ApiError> {
    identity.require_moderator()?;

    let action = state.actions.execute(identity.user_id, request).await?;

    state
        .audit
        .log_event(
            AuditEvent::new(identity.user_id, "moderation.action", "moderation_action", Some(action.id))
                .with_detail(json!({
                    "action_type": action.action_type,
                    "target_type": action.target_type,
                    "target_id": action.target_id,
                })),
        )
        .await;

    Ok((StatusCode::CREATED, Json(action)))
}

/// POST /moderation/flagged-terms
pub async fn upsert_flagged_term(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Json(rule): Json<NewFlaggedTerm>,
) -> Result<(StatusCode, Json<FlaggedTerm>), ApiError> {
    identity.require_moderator()?;

    let term = state.analyzer.upsert_term(rule).await?;

    state
        .audit
        .log_event(
            AuditEvent::new(identity.user_id, "rules.upsert", "flagged_term", Some(term.id))
                .with_detail(json!({ "term": term.term, "severity": term.severity })),
        )
        .await;

    Ok((StatusCode::CREATED, Json(term)))
}

/// GET /moderation/flagged-terms
pub async fn list_flagged_terms(
    State(state): State<Arc<AppState>>,
    identity: Identity,
) -> Result<Json<Vec<FlaggedTerm>>, ApiError> {
    identity.require_moderator()?;
    Ok(Json(state.analyzer.list_terms().await?))
}

/// GET /moderation/users/:user_id/restrictions
pub async fn list_user_restrictions(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Path(user_id): Path<i64>,
) -> Result<Json<Vec<UserRestriction>>, ApiError> {
    identity.require_moderator()?;
    let history = state.ledger.history(user_id).await?;

    state
        .audit
        .log_data_access(identity.user_id, "user_restrictions", Some(user_id))
        .await;

    Ok(Json(history))
}

#[derive(Debug, Deserialize)]
pub struct StatsParams {
    pub period: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SafetyStats {
    pub period: String,
    pub violations: Vec<ViolationCount>,
    pub blocked_messages: i64,
    pub queue: Vec<StatusCount>,
}

#[derive(Debug, Serialize)]
pub struct ViolationCount {
    pub violation_type: String,
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct StatusCount {
    pub status: String,
    pub count: i64,
}

fn period_window(period: &str) -> Result<Duration, ApiError> {
    match period {
        "1h" => Ok(Duration::hours(1)),
        "24h" => Ok(Duration::hours(24)),
        "7d" => Ok(Duration::days(7)),
        "30d" => Ok(Duration::days(30)),
        "90d" => Ok(Duration::days(90)),
        other => Err(ApiError::BadRequest(format!(
            "unknown period '{}', expected one of 1h, 24h, 7d, 30d, 90d",
            other
        ))),
    }
}

/// GET /moderation/safety-stats
pub async fn safety_stats(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Query(params): Query<StatsParams>,
) -> Result<Json<SafetyStats>, ApiError> {
    identity.require_moderator()?;

    let period = params.period.unwrap_or_else(|| "24h".to_string());
    let since = Utc::now() - period_window(&period)?;

    let violations = state
        .pipeline
        .violation_counts_since(since)
        .await?
        .into_iter()
        .map(|(violation_type, count)| ViolationCount {
            violation_type,
            count,
        })
        .collect();
    let blocked_messages = state.pipeline.blocked_count_since(since).await?;
    let queue = state
        .queue
        .status_counts()
        .await?
        .into_iter()
        .map(|(status, count)| StatusCount { status, count })
        .collect();

    Ok(Json(SafetyStats {
        period,
        violations,
        blocked_messages,
        queue,
    }))
}
