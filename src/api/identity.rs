// Request identity, as injected by the platform's auth gateway.
//
// Session issuance and verification happen upstream; by the time a request
// reaches this service the gateway has stamped `x-user-id` and
// `x-user-role` headers on it. A request without them never came through
// the gateway and is refused.

use super::error::ApiError;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Member,
    Moderator,
    Admin,
}

#[derive(Debug, Clone, Copy)]
pub struct Identity {
    pub user_id: i64,
    pub role: Role,
}

impl Identity {
    pub fn is_moderator(&self) -> bool {
        matches!(self.role, Role::Moderator | Role::Admin)
    }

    /// Gate for the moderation surface.
    pub fn require_moderator(&self) -> Result<(), ApiError> {
        if self.is_moderator() {
            Ok(())
        } else {
            Err(ApiError::Forbidden(
                "Moderator access required".to_string(),
            ))
        }
    }
}

impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get("x-user-id")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<i64>().ok())
            .ok_or_else(|| ApiError::Forbidden("Missing or invalid identity".to_string()))?;

        let role = match parts
            .headers
            .get("x-user-role")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("member")
        {
            "admin" => Role::Admin,
            "moderator" => Role::Moderator,
            _ => Role::Member,
        };

        Ok(Identity { user_id, role })
    }
}
