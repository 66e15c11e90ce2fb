// Route table.

use super::state::AppState;
use super::{messages, moderation};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/conversations/{id}/messages",
            post(messages::send_message).get(messages::list_messages),
        )
        .route("/moderation/queue", get(moderation::list_queue))
        .route(
            "/moderation/queue/{item_id}/assign",
            post(moderation::assign_queue_item),
        )
        .route("/moderation/actions", post(moderation::create_action))
        .route(
            "/moderation/flagged-terms",
            post(moderation::upsert_flagged_term).get(moderation::list_flagged_terms),
        )
        .route(
            "/moderation/users/{user_id}/restrictions",
            get(moderation::list_user_restrictions),
        )
        .route("/moderation/safety-stats", get(moderation::safety_stats))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
