//! Authorization checks for admin-only operations.
//!
//! ```rust,ignore
//! use crate::common::auth::{Actor, Capability};
//!
//! Actor::load(user_id, &deps.db_pool)
//!     .await?
//!     .can(Capability::ManageNews)
//!     .check()?;
//! ```
//!
//! Roles are read from `user_roles` on every check so a demotion takes
//! effect on the next request.

mod builder;
mod capability;
mod errors;

pub use builder::{Actor, CapabilityCheck};
pub use capability::Capability;
pub use errors::AuthError;
