// Newsdesk - API Core
//
// Backend for the news aggregation admin console: email/password sessions,
// profiles and roles, article and category management, saved articles,
// notifications with push fan-out, scheduled delivery, analytics events and
// a realtime change feed over SSE.

pub mod common;
pub mod config;
pub mod domains;
pub mod kernel;
pub mod server;

pub use config::*;
