// Common types and utilities shared across the application

pub mod auth;
pub mod entity_ids;
pub mod error;
pub mod id;
pub mod pagination;
pub mod utils;

pub use auth::{Actor, AuthError, Capability};
pub use entity_ids::*;
pub use error::{is_unique_violation, ApiError, ApiResult};
pub use id::Id;
pub use pagination::Page;
