//! Profiles domain - per-user profile, notification preferences and role

pub mod actions;
pub mod models;

pub use models::{ProfileRecord, UserRoleRecord};
