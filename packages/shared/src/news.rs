use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::realtime::Versioned;
use crate::validation::FormErrors;

/// Longest summary accepted by the news form, in words.
pub const MAX_SUMMARY_WORDS: usize = 60;

/// Publication status of an article.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "news_status", rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum NewsStatus {
    #[default]
    Draft,
    Published,
}

impl NewsStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NewsStatus::Draft => "draft",
            NewsStatus::Published => "published",
        }
    }
}

/// Status filter used by the management list (`all` shows both).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Draft,
    Published,
}

impl StatusFilter {
    pub fn status(&self) -> Option<NewsStatus> {
        match self {
            StatusFilter::All => None,
            StatusFilter::Draft => Some(NewsStatus::Draft),
            StatusFilter::Published => Some(NewsStatus::Published),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsArticle {
    pub id: Uuid,
    pub title: String,
    pub summary: String,
    pub content: Option<String>,
    pub image_path: Option<String>,
    pub source_url: Option<String>,
    pub source_name: Option<String>,
    pub source_icon: Option<String>,
    pub category_id: Option<Uuid>,
    pub status: NewsStatus,
    pub created_by: Option<Uuid>,
    pub view_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Versioned for NewsArticle {
    fn id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> Option<DateTime<Utc>> {
        Some(self.updated_at)
    }
}

/// Data entered in the news form. Used for both create and update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewsArticleInput {
    pub title: String,
    pub summary: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub source_url: String,
    #[serde(default)]
    pub source_name: Option<String>,
    #[serde(default)]
    pub category_id: Option<Uuid>,
    #[serde(default)]
    pub status: NewsStatus,
}

/// Count whitespace-separated words, ignoring empty runs.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Validate the news form.
///
/// `has_image_file` is true when a new image is attached to the submission;
/// otherwise an existing `image_url` is required.
pub fn validate_news_form(input: &NewsArticleInput, has_image_file: bool) -> FormErrors {
    let mut errors = FormErrors::new();

    if input.title.trim().is_empty() {
        errors.add("title", "Title is required");
    }

    if input.summary.trim().is_empty() {
        errors.add("summary", "Summary is required");
    } else if word_count(&input.summary) > MAX_SUMMARY_WORDS {
        errors.add("summary", "Summary must be 60 words or less");
    }

    let has_image_url = input
        .image_url
        .as_deref()
        .is_some_and(|url| !url.trim().is_empty());
    if !has_image_file && !has_image_url {
        errors.add("image_url", "Image is required");
    }

    if input.source_url.trim().is_empty() {
        errors.add("source_url", "Source URL is required");
    }

    if input.category_id.is_none() {
        errors.add("category", "Category is required");
    }

    errors
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub article_count: Option<i32>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoryInput {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

/// One entry of the category filter dropdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryOption {
    pub value: String,
    pub label: String,
}

/// Filter options: "All Categories" first, then one entry per category.
pub fn category_options(categories: &[Category]) -> Vec<CategoryOption> {
    std::iter::once(CategoryOption {
        value: "all".to_string(),
        label: "All Categories".to_string(),
    })
    .chain(categories.iter().map(|c| CategoryOption {
        value: c.id.to_string(),
        label: c.name.clone(),
    }))
    .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedArticle {
    pub id: Uuid,
    pub user_id: Uuid,
    pub article_id: Uuid,
    pub is_read: bool,
    pub saved_at: DateTime<Utc>,
    pub article: Option<NewsArticle>,
}

impl Versioned for SavedArticle {
    fn id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> Option<DateTime<Utc>> {
        None
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveArticleRequest {
    pub article_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadStatusRequest {
    pub is_read: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_input() -> NewsArticleInput {
        NewsArticleInput {
            title: "Visa rules change".to_string(),
            summary: "New student visa rules take effect next month.".to_string(),
            image_url: Some("https://cdn.example.com/news-images/original/1.png".to_string()),
            source_url: "https://example.com/visa".to_string(),
            category_id: Some(Uuid::new_v4()),
            ..Default::default()
        }
    }

    #[test]
    fn valid_form_has_no_errors() {
        assert!(validate_news_form(&valid_input(), false).is_empty());
    }

    #[test]
    fn empty_title_is_rejected() {
        let input = NewsArticleInput {
            title: "   ".to_string(),
            ..valid_input()
        };
        let errors = validate_news_form(&input, false);
        assert_eq!(errors.get("title"), Some("Title is required"));
    }

    #[test]
    fn summary_word_limit() {
        let sixty = vec!["word"; 60].join(" ");
        let sixty_one = vec!["word"; 61].join(" ");

        let ok = NewsArticleInput {
            summary: sixty,
            ..valid_input()
        };
        assert!(validate_news_form(&ok, false).get("summary").is_none());

        let too_long = NewsArticleInput {
            summary: sixty_one,
            ..valid_input()
        };
        assert_eq!(
            validate_news_form(&too_long, false).get("summary"),
            Some("Summary must be 60 words or less")
        );
    }

    #[test]
    fn image_file_satisfies_image_requirement() {
        let input = NewsArticleInput {
            image_url: None,
            ..valid_input()
        };
        assert_eq!(
            validate_news_form(&input, false).get("image_url"),
            Some("Image is required")
        );
        assert!(validate_news_form(&input, true).is_empty());
    }

    #[test]
    fn missing_source_and_category() {
        let input = NewsArticleInput {
            source_url: String::new(),
            category_id: None,
            ..valid_input()
        };
        let errors = validate_news_form(&input, false);
        assert_eq!(errors.get("source_url"), Some("Source URL is required"));
        assert_eq!(errors.get("category"), Some("Category is required"));
    }

    #[test]
    fn word_count_ignores_extra_whitespace() {
        assert_eq!(word_count("  one   two\nthree  "), 3);
        assert_eq!(word_count(""), 0);
    }

    #[test]
    fn category_options_start_with_all() {
        let category = Category {
            id: Uuid::new_v4(),
            name: "Visa".to_string(),
            description: None,
            is_active: true,
            article_count: None,
            created_at: Utc::now(),
        };
        let options = category_options(&[category.clone()]);
        assert_eq!(options[0].value, "all");
        assert_eq!(options[0].label, "All Categories");
        assert_eq!(options[1].value, category.id.to_string());
    }
}
