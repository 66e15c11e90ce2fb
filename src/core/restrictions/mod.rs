// Core restrictions module - per-user messaging restrictions.

pub mod restriction_models;
pub mod restriction_service;

pub use restriction_models::*;
pub use restriction_service::*;
