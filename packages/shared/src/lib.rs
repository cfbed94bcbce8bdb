//! Wire types shared by the newsdesk server and the admin console core.
//!
//! Everything here is plain data plus the form rules both sides enforce.
//! Postgres enum mappings are compiled in only with the `sqlx` feature.

pub mod analytics;
pub mod auth;
pub mod news;
pub mod notifications;
pub mod realtime;
pub mod validation;

pub use analytics::*;
pub use auth::*;
pub use news::*;
pub use notifications::*;
pub use realtime::*;
pub use validation::FormErrors;
