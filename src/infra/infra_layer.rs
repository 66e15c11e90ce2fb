// The infra module contains implementations of core traits.
// Each feature implementation goes in its own submodule.

#[path = "safety/sqlite_term_store.rs"]
pub mod safety;

#[path = "restrictions/sqlite_restriction_store.rs"]
pub mod restrictions;

#[path = "messaging/mod.rs"]
pub mod messaging;

#[path = "queue/sqlite_queue_store.rs"]
pub mod queue;

#[path = "actions/sqlite_action_store.rs"]
pub mod actions;

#[path = "audit/tracing_sink.rs"]
pub mod audit;
