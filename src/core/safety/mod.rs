// Core safety module - rule-based content scanning.
// Following the same pattern as the other core modules.

pub mod safety_models;
pub mod safety_service;

pub use safety_models::*;
pub use safety_service::*;
