//! Category API endpoints.

use axum::{extract::State, http::StatusCode, Json};

use super::{ApiResult, Payload};
use crate::auth::Caller;
use crate::db::DUPLICATE_CATEGORY;
use crate::errors::{AppError, FieldErrors};
use crate::models::{Category, CreateCategoryRequest, CATEGORY_NAME};
use crate::permissions::{authorize, Action, Endpoint};
use crate::AppState;

/// GET /categories/ - List all categories.
pub async fn list_categories(
    State(state): State<AppState>,
    caller: Caller,
) -> ApiResult<Json<Vec<Category>>> {
    authorize(&caller, Endpoint::Categories, Action::List)?;

    Ok(Json(state.repo.list_categories().await?))
}

/// POST /categories/ - Create a category (staff only).
pub async fn create_category(
    State(state): State<AppState>,
    caller: Caller,
    body: Result<Payload<CreateCategoryRequest>, AppError>,
) -> ApiResult<(StatusCode, Json<Category>)> {
    let user = authorize(&caller, Endpoint::Categories, Action::Create)?;
    let Payload(request) = body?;

    let name = request.validate()?;
    if state.repo.category_name_exists(&name).await? {
        return Err(AppError::Validation(FieldErrors::single(
            CATEGORY_NAME.name,
            DUPLICATE_CATEGORY,
        )));
    }

    let category = state.repo.create_category(&name).await?;
    tracing::info!(
        category_id = category.id,
        created_by = %user.username,
        "Created category {}",
        category.name
    );

    Ok((StatusCode::CREATED, Json(category)))
}
