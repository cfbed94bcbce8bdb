//! News domain - articles, their audit trail and stored images
//!
//! Every write publishes a `ChangeEvent` on the `news` topic after it commits.

pub mod actions;
pub mod models;

pub use models::{ArticleFilter, ArticleRecord, AuditEntryRecord};
