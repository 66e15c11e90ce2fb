// The api module is the HTTP adapter: axum routes, request identity and
// error mapping. It translates between the wire and core services.

#[path = "error.rs"]
pub mod error;

#[path = "identity.rs"]
pub mod identity;

#[path = "state.rs"]
pub mod state;

#[path = "messages.rs"]
pub mod messages;

#[path = "moderation.rs"]
pub mod moderation;

#[path = "router.rs"]
pub mod router;
