//! Article CRUD, audit history and image uploads.

use axum::{
    extract::{DefaultBodyLimit, Extension, Multipart, Path, Query},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use newsdesk_shared::{NewsArticle, NewsArticleInput};
use serde::Serialize;

use crate::common::{ApiError, ApiResult, ArticleId};
use crate::domains::news::actions::{self, ImageUpload, ListArticlesQuery};
use crate::domains::news::AuditEntryRecord;
use crate::server::app::AxumAppState;
use crate::server::middleware::AuthUser;
use crate::server::routes::idempotency_key;

const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

pub fn router() -> Router {
    Router::new()
        .route("/api/news", get(list).post(create))
        .route("/api/news/:id", get(show).put(update).delete(remove))
        .route("/api/news/:id/history", get(history))
        .route(
            "/api/images",
            post(upload_image).layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES)),
        )
}

async fn list(
    Extension(state): Extension<AxumAppState>,
    user: AuthUser,
    Query(query): Query<ListArticlesQuery>,
) -> ApiResult<Json<Vec<NewsArticle>>> {
    let viewer = user.actor(&state.deps).await?;
    Ok(Json(actions::list_articles(viewer, query, &state.deps).await?))
}

async fn show(
    Extension(state): Extension<AxumAppState>,
    user: AuthUser,
    Path(id): Path<ArticleId>,
) -> ApiResult<Json<NewsArticle>> {
    let viewer = user.actor(&state.deps).await?;
    Ok(Json(actions::get_article(viewer, id, &state.deps).await?))
}

async fn create(
    Extension(state): Extension<AxumAppState>,
    user: AuthUser,
    headers: HeaderMap,
    Json(input): Json<NewsArticleInput>,
) -> ApiResult<(StatusCode, Json<NewsArticle>)> {
    let actor = user.actor(&state.deps).await?;
    let article =
        actions::create_article(actor, input, idempotency_key(&headers), &state.deps).await?;
    Ok((StatusCode::CREATED, Json(article)))
}

async fn update(
    Extension(state): Extension<AxumAppState>,
    user: AuthUser,
    Path(id): Path<ArticleId>,
    Json(input): Json<NewsArticleInput>,
) -> ApiResult<Json<NewsArticle>> {
    let actor = user.actor(&state.deps).await?;
    Ok(Json(actions::update_article(actor, id, input, &state.deps).await?))
}

async fn remove(
    Extension(state): Extension<AxumAppState>,
    user: AuthUser,
    Path(id): Path<ArticleId>,
) -> ApiResult<StatusCode> {
    let actor = user.actor(&state.deps).await?;
    actions::delete_article(actor, id, &state.deps).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn history(
    Extension(state): Extension<AxumAppState>,
    user: AuthUser,
    Path(id): Path<ArticleId>,
) -> ApiResult<Json<Vec<AuditEntryRecord>>> {
    let actor = user.actor(&state.deps).await?;
    Ok(Json(actions::article_history(actor, id, &state.deps).await?))
}

#[derive(Serialize)]
struct UploadResponse {
    url: String,
}

/// Multipart fields: `file` (the image) and `existing_url` (kept when no file is sent).
async fn upload_image(
    Extension(state): Extension<AxumAppState>,
    user: AuthUser,
    mut multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    let actor = user.actor(&state.deps).await?;

    let mut file = None;
    let mut existing_url = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid upload: {}", e)))?
    {
        match field.name() {
            Some("file") => {
                let file_name = field.file_name().map(String::from);
                let content_type = field.content_type().map(String::from);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Invalid upload: {}", e)))?;
                if !bytes.is_empty() {
                    file = Some(ImageUpload {
                        file_name,
                        content_type,
                        bytes: bytes.to_vec(),
                    });
                }
            }
            Some("existing_url") => {
                existing_url = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| ApiError::bad_request(format!("Invalid upload: {}", e)))?,
                );
            }
            _ => {}
        }
    }

    let url = actions::upload_image(actor, file, existing_url, &state.deps).await?;
    Ok(Json(UploadResponse { url }))
}
