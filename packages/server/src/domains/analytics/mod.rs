//! Analytics domain - article view/share/save events and their aggregates

pub mod actions;
pub mod models;

pub use models::AnalyticsEventRecord;
