//! Submit flows for the news and notification forms.
//!
//! Both validate locally first and make no network call when the form has
//! errors. Field errors returned by the server land on the same form.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use newsdesk_shared::{
    validate_news_form, validate_notification_draft, FormErrors, NewsArticle, NewsArticleInput,
    Notification, NotificationDraft,
};
use tracing::{error, info};
use uuid::Uuid;

use crate::api::{ApiClient, ImageFile};
use crate::error::ClientError;

pub const FIX_ERRORS: &str = "Please fix the errors in the form";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Toast {
    Success(String),
    Error(String),
}

impl Toast {
    fn success(message: &str) -> Self {
        Toast::Success(message.to_string())
    }

    fn error(message: &str) -> Self {
        Toast::Error(message.to_string())
    }

    pub fn message(&self) -> &str {
        match self {
            Toast::Success(m) | Toast::Error(m) => m,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Toast::Error(_))
    }
}

/// Writes the news form needs.
#[async_trait]
pub trait NewsWriter: Send + Sync {
    async fn upload_image(
        &self,
        file: Option<&ImageFile>,
        existing_url: Option<&str>,
    ) -> Result<String, ClientError>;
    async fn create_news(&self, input: &NewsArticleInput) -> Result<NewsArticle, ClientError>;
    async fn update_news(
        &self,
        id: Uuid,
        input: &NewsArticleInput,
    ) -> Result<NewsArticle, ClientError>;
}

#[async_trait]
impl NewsWriter for ApiClient {
    async fn upload_image(
        &self,
        file: Option<&ImageFile>,
        existing_url: Option<&str>,
    ) -> Result<String, ClientError> {
        ApiClient::upload_image(self, file, existing_url).await
    }

    async fn create_news(&self, input: &NewsArticleInput) -> Result<NewsArticle, ClientError> {
        ApiClient::create_news(self, input).await
    }

    async fn update_news(
        &self,
        id: Uuid,
        input: &NewsArticleInput,
    ) -> Result<NewsArticle, ClientError> {
        ApiClient::update_news(self, id, input).await
    }
}

/// Writes the notification form needs.
#[async_trait]
pub trait NotificationWriter: Send + Sync {
    async fn compose_notification(
        &self,
        draft: &NotificationDraft,
    ) -> Result<Notification, ClientError>;
}

#[async_trait]
impl NotificationWriter for ApiClient {
    async fn compose_notification(
        &self,
        draft: &NotificationDraft,
    ) -> Result<Notification, ClientError> {
        ApiClient::compose_notification(self, draft).await
    }
}

/// State of the news create/edit form.
#[derive(Debug, Clone, Default)]
pub struct NewsForm {
    pub input: NewsArticleInput,
    pub image_file: Option<ImageFile>,
    /// Article being edited; `None` for a new article.
    pub editing: Option<Uuid>,
    pub errors: FormErrors,
    pub submitting: bool,
}

impl NewsForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Form prefilled from an existing article.
    pub fn edit(article: &NewsArticle) -> Self {
        Self {
            input: NewsArticleInput {
                title: article.title.clone(),
                summary: article.summary.clone(),
                content: article.content.clone(),
                image_url: article.image_path.clone(),
                source_url: article.source_url.clone().unwrap_or_default(),
                source_name: article.source_name.clone(),
                category_id: article.category_id,
                status: article.status,
            },
            editing: Some(article.id),
            ..Self::default()
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub async fn submit<W: NewsWriter + ?Sized>(
        &mut self,
        writer: &W,
    ) -> (Option<NewsArticle>, Toast) {
        self.errors = validate_news_form(&self.input, self.image_file.is_some());
        if !self.errors.is_empty() {
            return (None, Toast::error(FIX_ERRORS));
        }

        self.submitting = true;
        let result = self.save(writer).await;
        self.submitting = false;

        match result {
            Ok(article) => {
                info!(article_id = %article.id, "article saved");
                let toast = if self.editing.is_some() {
                    Toast::success("Article updated successfully")
                } else {
                    self.reset();
                    Toast::success("Article created successfully")
                };
                (Some(article), toast)
            }
            Err(ClientError::Validation(fields)) => {
                self.errors = fields;
                (None, Toast::error(FIX_ERRORS))
            }
            Err(e) => {
                error!(error = %e, "Error submitting article");
                (None, Toast::error("Failed to save article"))
            }
        }
    }

    async fn save<W: NewsWriter + ?Sized>(&mut self, writer: &W) -> Result<NewsArticle, ClientError> {
        if let Some(file) = &self.image_file {
            let url = writer
                .upload_image(Some(file), self.input.image_url.as_deref())
                .await?;
            self.input.image_url = Some(url);
            self.image_file = None;
        }

        match self.editing {
            Some(id) => writer.update_news(id, &self.input).await,
            None => writer.create_news(&self.input).await,
        }
    }
}

/// State of the notification compose form.
#[derive(Debug, Clone, Default)]
pub struct NotificationForm {
    pub draft: NotificationDraft,
    pub errors: FormErrors,
    pub submitting: bool,
}

impl NotificationForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub async fn submit<W: NotificationWriter + ?Sized>(
        &mut self,
        writer: &W,
        now: DateTime<Utc>,
    ) -> (Option<Notification>, Toast) {
        self.errors = validate_notification_draft(&self.draft, now);
        if !self.errors.is_empty() {
            return (None, Toast::error(FIX_ERRORS));
        }

        self.submitting = true;
        let result = writer.compose_notification(&self.draft).await;
        self.submitting = false;

        match result {
            Ok(notification) => {
                let toast = if self.draft.schedule_later {
                    Toast::success("Notification scheduled successfully")
                } else {
                    Toast::success("Notification sent successfully")
                };
                self.reset();
                (Some(notification), toast)
            }
            Err(ClientError::Validation(fields)) => {
                self.errors = fields;
                (None, Toast::error(FIX_ERRORS))
            }
            Err(e) => {
                error!(error = %e, "Error sending notification");
                (None, Toast::error("Failed to send notification"))
            }
        }
    }
}
