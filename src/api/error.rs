// HTTP error mapping for core domain errors.
//
// Storage failures never leak their internals to the caller - they are
// logged here and surface as a plain 500.

use crate::core::actions::ActionError;
use crate::core::messaging::MessagingError;
use crate::core::queue::QueueError;
use crate::core::restrictions::{RestrictionError, UserRestriction};
use crate::core::safety::SafetyError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Forbidden(String),
    /// 403 carrying the active restriction so clients can show the user
    /// what is limiting them and until when.
    Restricted(UserRestriction),
    NotFound(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": message })),
            )
                .into_response(),
            ApiError::Forbidden(message) => (
                StatusCode::FORBIDDEN,
                Json(json!({ "error": message })),
            )
                .into_response(),
            ApiError::Restricted(restriction) => (
                StatusCode::FORBIDDEN,
                Json(json!({
                    "error": "You are currently restricted from sending messages",
                    "restriction": restriction,
                })),
            )
                .into_response(),
            ApiError::NotFound(message) => (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": message })),
            )
                .into_response(),
            ApiError::Internal(message) => {
                tracing::error!("Internal error serving request: {}", message);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Internal server error" })),
                )
                    .into_response()
            }
        }
    }
}

impl From<MessagingError> for ApiError {
    fn from(e: MessagingError) -> Self {
        match e {
            MessagingError::EmptyContent => ApiError::BadRequest(e.to_string()),
            MessagingError::Restricted(restriction) => ApiError::Restricted(restriction),
            MessagingError::ConversationNotFound | MessagingError::MessageNotFound => {
                ApiError::NotFound(e.to_string())
            }
            MessagingError::ConversationClosed | MessagingError::NotParticipant => {
                ApiError::Forbidden(e.to_string())
            }
            MessagingError::StorageError(message) => ApiError::Internal(message),
        }
    }
}

impl From<QueueError> for ApiError {
    fn from(e: QueueError) -> Self {
        match e {
            // Losing the claim race is an expected outcome, reported the
            // same way as a missing item.
            QueueError::AlreadyClaimed | QueueError::NotFound => ApiError::NotFound(e.to_string()),
            QueueError::StorageError(message) => ApiError::Internal(message),
        }
    }
}

impl From<ActionError> for ApiError {
    fn from(e: ActionError) -> Self {
        match e {
            ActionError::Validation(message) => ApiError::BadRequest(message),
            ActionError::NotFound(_) => ApiError::NotFound(e.to_string()),
            ActionError::StorageError(message) => ApiError::Internal(message),
        }
    }
}

impl From<SafetyError> for ApiError {
    fn from(e: SafetyError) -> Self {
        match e {
            SafetyError::InvalidRule(message) => ApiError::BadRequest(message),
            SafetyError::StorageError(message) => ApiError::Internal(message),
        }
    }
}

impl From<RestrictionError> for ApiError {
    fn from(e: RestrictionError) -> Self {
        match e {
            RestrictionError::StorageError(message) => ApiError::Internal(message),
        }
    }
}
