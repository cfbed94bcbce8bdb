//! Notifications domain - composition, push fan-out and scheduled delivery
//!
//! Architecture:
//!   compose ─► notifications row ─► (mobile/both, immediate) push gateway
//!   cron / HTTP ─► claim due rows ─► resolve recipients ─► push gateway

pub mod actions;
pub mod models;
pub mod recipients;

pub use models::{NewNotification, NotificationRecord};
pub use recipients::{resolve_push_tokens, Recipients};
