use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    routing::{delete, get, put},
    Json, Router,
};
use newsdesk_shared::{ReadStatusRequest, SaveArticleRequest, SavedArticle};

use crate::common::{ApiResult, ArticleId, SavedArticleId};
use crate::domains::saved_articles::actions;
use crate::server::app::AxumAppState;
use crate::server::middleware::AuthUser;

pub fn router() -> Router {
    Router::new()
        .route("/api/saved-articles", get(list).post(save))
        // DELETE takes the article id, the read toggle takes the saved row id
        .route("/api/saved-articles/:id", delete(unsave))
        .route("/api/saved-articles/:id/read", put(set_read))
}

async fn list(
    Extension(state): Extension<AxumAppState>,
    user: AuthUser,
) -> ApiResult<Json<Vec<SavedArticle>>> {
    Ok(Json(
        actions::list_saved_articles(user.user_id, &state.deps).await?,
    ))
}

async fn save(
    Extension(state): Extension<AxumAppState>,
    user: AuthUser,
    Json(request): Json<SaveArticleRequest>,
) -> ApiResult<(StatusCode, Json<SavedArticle>)> {
    let saved = actions::save_article(
        user.user_id,
        ArticleId::from_uuid(request.article_id),
        &state.deps,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(saved)))
}

async fn unsave(
    Extension(state): Extension<AxumAppState>,
    user: AuthUser,
    Path(article_id): Path<ArticleId>,
) -> ApiResult<StatusCode> {
    actions::unsave_article(user.user_id, article_id, &state.deps).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn set_read(
    Extension(state): Extension<AxumAppState>,
    user: AuthUser,
    Path(id): Path<SavedArticleId>,
    Json(request): Json<ReadStatusRequest>,
) -> ApiResult<Json<SavedArticle>> {
    Ok(Json(
        actions::set_read_status(user.user_id, id, request.is_read, &state.deps).await?,
    ))
}
