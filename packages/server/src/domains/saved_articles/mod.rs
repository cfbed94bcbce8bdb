//! Saved articles domain - per-user bookmarks with read state
//!
//! Changes publish on `saved_articles:<user_id>` so only the owner sees them.

pub mod actions;
pub mod models;

pub use models::SavedArticleRecord;
