// The core module contains all business logic.
// Each feature gets its own submodule.

#[path = "safety/mod.rs"]
pub mod safety;

#[path = "restrictions/mod.rs"]
pub mod restrictions;

#[path = "messaging/mod.rs"]
pub mod messaging;

#[path = "queue/mod.rs"]
pub mod queue;

#[path = "actions/mod.rs"]
pub mod actions;

#[path = "audit.rs"]
pub mod audit;
