//! News actions

mod images;
mod manage;
mod queries;

pub use images::{managed_image_path, upload_image, ImageUpload};
pub use manage::{create_article, delete_article, update_article};
pub use queries::{article_history, get_article, list_articles, ListArticlesQuery};
