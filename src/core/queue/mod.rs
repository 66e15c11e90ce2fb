// Core queue module - the prioritized human-review worklist.

pub mod queue_models;
pub mod queue_service;

pub use queue_models::*;
pub use queue_service::*;
