//! Category actions

use newsdesk_shared::{Category, CategoryInput};
use tracing::info;

use crate::common::{is_unique_violation, Actor, ApiError, ApiResult, Capability, CategoryId};
use crate::domains::categories::models::CategoryRecord;
use crate::kernel::ServerDeps;

pub async fn list_categories(deps: &ServerDeps) -> ApiResult<Vec<Category>> {
    let records = CategoryRecord::find_all(&deps.db_pool).await?;
    Ok(records.iter().map(CategoryRecord::to_category).collect())
}

pub async fn create_category(
    actor: Actor,
    input: CategoryInput,
    deps: &ServerDeps,
) -> ApiResult<Category> {
    actor.can(Capability::ManageNews).check()?;
    validate(&input)?;

    let record = CategoryRecord::create(&input, &deps.db_pool)
        .await?
        .ok_or_else(|| ApiError::Conflict("Category already exists".to_string()))?;

    info!(category_id = %record.id, name = %record.name, "category created");
    Ok(record.to_category())
}

pub async fn update_category(
    actor: Actor,
    id: CategoryId,
    input: CategoryInput,
    deps: &ServerDeps,
) -> ApiResult<Category> {
    actor.can(Capability::ManageNews).check()?;
    validate(&input)?;

    let record = match CategoryRecord::update(id, &input, &deps.db_pool).await {
        Ok(Some(record)) => record,
        Ok(None) => return Err(ApiError::NotFound("Category")),
        Err(e) if is_unique_violation(&e) => {
            return Err(ApiError::Conflict("Category already exists".to_string()))
        }
        Err(e) => return Err(e.into()),
    };
    Ok(record.to_category())
}

pub async fn delete_category(actor: Actor, id: CategoryId, deps: &ServerDeps) -> ApiResult<()> {
    actor.can(Capability::ManageNews).check()?;
    if !CategoryRecord::delete(id, &deps.db_pool).await? {
        return Err(ApiError::NotFound("Category"));
    }
    info!(category_id = %id, "category deleted");
    Ok(())
}

fn validate(input: &CategoryInput) -> ApiResult<()> {
    if input.name.trim().is_empty() {
        return Err(ApiError::bad_request("Name is required"));
    }
    Ok(())
}
