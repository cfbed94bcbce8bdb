use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use newsdesk_shared::{Category, CategoryInput};

use crate::common::{ApiResult, CategoryId};
use crate::domains::categories::actions;
use crate::server::app::AxumAppState;
use crate::server::middleware::AuthUser;

pub fn router() -> Router {
    Router::new()
        .route("/api/categories", get(list).post(create))
        .route("/api/categories/:id", put(update).delete(remove))
}

async fn list(
    Extension(state): Extension<AxumAppState>,
    _user: AuthUser,
) -> ApiResult<Json<Vec<Category>>> {
    Ok(Json(actions::list_categories(&state.deps).await?))
}

async fn create(
    Extension(state): Extension<AxumAppState>,
    user: AuthUser,
    Json(input): Json<CategoryInput>,
) -> ApiResult<(StatusCode, Json<Category>)> {
    let actor = user.actor(&state.deps).await?;
    let category = actions::create_category(actor, input, &state.deps).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

async fn update(
    Extension(state): Extension<AxumAppState>,
    user: AuthUser,
    Path(id): Path<CategoryId>,
    Json(input): Json<CategoryInput>,
) -> ApiResult<Json<Category>> {
    let actor = user.actor(&state.deps).await?;
    Ok(Json(
        actions::update_category(actor, id, input, &state.deps).await?,
    ))
}

async fn remove(
    Extension(state): Extension<AxumAppState>,
    user: AuthUser,
    Path(id): Path<CategoryId>,
) -> ApiResult<StatusCode> {
    let actor = user.actor(&state.deps).await?;
    actions::delete_category(actor, id, &state.deps).await?;
    Ok(StatusCode::NO_CONTENT)
}
