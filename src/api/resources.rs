//! Resource API endpoints.
//!
//! `/resources/{key}/` serves two purposes: an all-digit key addresses a resource by
//! id, any other key lists the resources filed under that category name.

use axum::{
    extract::{Path, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use super::{is_id_segment, parse_id, ApiResult, Payload};
use crate::auth::{AuthUser, Caller};
use crate::db::DUPLICATE_TITLE;
use crate::errors::{AppError, FieldErrors};
use crate::models::{
    title_case, Resource, ResourceRequest, RESOURCE_CATEGORIES, RESOURCE_TITLE,
};
use crate::permissions::{authorize, authorize_object, Action, Endpoint};
use crate::AppState;

/// GET /resources/ - List all resources.
pub async fn list_resources(
    State(state): State<AppState>,
    caller: Caller,
) -> ApiResult<Json<Vec<Resource>>> {
    authorize(&caller, Endpoint::Resources, Action::List)?;

    Ok(Json(state.repo.list_resources().await?))
}

/// POST /resources/ - Create a resource owned by the caller.
pub async fn create_resource(
    State(state): State<AppState>,
    caller: Caller,
    body: Result<Payload<ResourceRequest>, AppError>,
) -> ApiResult<(StatusCode, Json<Resource>)> {
    let user = authorize(&caller, Endpoint::Resources, Action::Create)?;
    let Payload(request) = body?;

    let new = request.validate_create()?;
    check_references(&state, Some(&new.title), Some(&new.categories), None).await?;

    let resource = state.repo.create_resource(user.id, &new).await?;
    tracing::info!(
        resource_id = resource.id,
        owner = %user.username,
        "Created resource {:?}",
        resource.title
    );

    Ok((StatusCode::CREATED, Json(resource)))
}

/// GET /resources/{key}/ - Retrieve a resource, or list a category's resources.
pub async fn get_resource_or_category(
    State(state): State<AppState>,
    caller: Caller,
    Path(key): Path<String>,
) -> ApiResult<Response> {
    if is_id_segment(&key) {
        authorize(&caller, Endpoint::Resources, Action::Retrieve)?;
        let resource = find_resource(&state, &key).await?;
        return Ok(Json(resource).into_response());
    }

    authorize(&caller, Endpoint::Resources, Action::List)?;
    let name = title_case(&key);
    let category = state
        .repo
        .find_category_by_name(&name)
        .await?
        .ok_or(AppError::NotFound)?;

    let resources = state.repo.list_resources_in_category(category.id).await?;
    Ok(Json(resources).into_response())
}

/// PUT|PATCH /resources/{key}/ - Partially update a resource (owner only).
pub async fn update_resource(
    State(state): State<AppState>,
    caller: Caller,
    method: Method,
    Path(key): Path<String>,
    body: Result<Payload<ResourceRequest>, AppError>,
) -> ApiResult<Json<Resource>> {
    let user = authorize(&caller, Endpoint::Resources, Action::Update)?;
    let resource = owned_resource(&state, user, &key, &method, Action::Update).await?;
    let Payload(request) = body?;

    let changes = request.validate_update()?;
    check_references(
        &state,
        changes.title.as_deref(),
        changes.categories.as_deref(),
        Some(resource.id),
    )
    .await?;

    let updated = state.repo.update_resource(resource.id, &changes).await?;
    tracing::info!(resource_id = updated.id, "Updated resource");

    Ok(Json(updated))
}

/// DELETE /resources/{key}/ - Delete a resource and its comments (owner only).
pub async fn delete_resource(
    State(state): State<AppState>,
    caller: Caller,
    method: Method,
    Path(key): Path<String>,
) -> ApiResult<StatusCode> {
    let user = authorize(&caller, Endpoint::Resources, Action::Destroy)?;
    let resource = owned_resource(&state, user, &key, &method, Action::Destroy).await?;

    state.repo.delete_resource(resource.id).await?;
    tracing::info!(
        resource_id = resource.id,
        comments = resource.comment_set.len(),
        "Deleted resource"
    );

    Ok(StatusCode::NO_CONTENT)
}

async fn find_resource(state: &AppState, key: &str) -> Result<Resource, AppError> {
    let id = parse_id(key)?;
    state.repo.get_resource(id).await?.ok_or(AppError::NotFound)
}

/// Resolve a resource for a write and run the ownership check on it.
async fn owned_resource(
    state: &AppState,
    user: &AuthUser,
    key: &str,
    method: &Method,
    action: Action,
) -> Result<Resource, AppError> {
    // Category listings are read-only.
    if !is_id_segment(key) {
        return Err(AppError::MethodNotAllowed(method.to_string()));
    }

    let resource = find_resource(state, key).await?;
    authorize_object(user, Endpoint::Resources, action, &resource)?;
    Ok(resource)
}

/// Uniqueness and foreign-key checks that need the store.
async fn check_references(
    state: &AppState,
    title: Option<&str>,
    categories: Option<&[i64]>,
    current: Option<i64>,
) -> Result<(), AppError> {
    let mut errors = FieldErrors::new();

    if let Some(title) = title {
        if state.repo.title_taken(title, current).await? {
            errors.add(RESOURCE_TITLE.name, DUPLICATE_TITLE);
        }
    }

    if let Some(categories) = categories {
        if let Some(missing) = state.repo.missing_category_ids(categories).await?.first() {
            errors.add(
                RESOURCE_CATEGORIES,
                format!("Invalid pk \"{}\" - object does not exist.", missing),
            );
        }
    }

    errors.finish(())
}
