// Conversation message endpoints.

use super::error::ApiError;
use super::identity::Identity;
use super::state::AppState;
use crate::core::audit::AuditEvent;
use crate::core::messaging::{Message, SafetyInfo, SendMessage};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct SendMessageResponse {
    /// `null` when the message was blocked - the sender gets the verdict,
    /// not the persisted row.
    pub message: Option<Message>,
    pub safety: SafetyInfo,
}

/// POST /conversations/:id/messages
pub async fn send_message(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Path(conversation_id): Path<i64>,
    Json(request): Json<SendMessage>,
) -> Result<(StatusCode, Json<SendMessageResponse>), ApiError> {
    let outcome = state
        .pipeline
        .send_message(conversation_id, identity.user_id, request)
        .await?;

    // Best-effort: a failed audit emit never fails the send.
    state
        .audit
        .log_event(
            AuditEvent::new(
                identity.user_id,
                "message.send",
                "message",
                Some(outcome.message.id),
            )
            .with_detail(json!({
                "conversation_id": conversation_id,
                "safety_score": outcome.safety.safety_score,
                "blocked": outcome.safety.is_blocked,
            })),
        )
        .await;

    if outcome.safety.is_blocked {
        Ok((
            StatusCode::BAD_REQUEST,
            Json(SendMessageResponse {
                message: None,
                safety: outcome.safety,
            }),
        ))
    } else {
        Ok((
            StatusCode::CREATED,
            Json(SendMessageResponse {
                message: Some(outcome.message),
                safety: outcome.safety,
            }),
        ))
    }
}

#[derive(Debug, Deserialize)]
pub struct PageParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl PageParams {
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn limit(&self) -> u32 {
        self.limit.unwrap_or(20).clamp(1, 100)
    }
}

/// GET /conversations/:id/messages
pub async fn list_messages(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Path(conversation_id): Path<i64>,
    Query(params): Query<PageParams>,
) -> Result<Json<Vec<Message>>, ApiError> {
    let messages = state
        .pipeline
        .list_messages(
            conversation_id,
            identity.user_id,
            params.page(),
            params.limit(),
        )
        .await?;
    Ok(Json(messages))
}
