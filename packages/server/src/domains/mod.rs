// Business domains

pub mod analytics;
pub mod auth;
pub mod categories;
pub mod news;
pub mod notifications;
pub mod profiles;
pub mod saved_articles;
