// Core actions module - applies moderator decisions.

pub mod action_models;
pub mod action_service;

pub use action_models::*;
pub use action_service::*;
