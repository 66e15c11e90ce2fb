// Core messaging module - the send-time content-safety pipeline.

pub mod messaging_models;
pub mod messaging_service;

pub use messaging_models::*;
pub use messaging_service::*;
