//! Categories domain - article categories and their filter options

pub mod actions;
pub mod models;

pub use models::CategoryRecord;
