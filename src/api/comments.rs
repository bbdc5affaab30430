//! Comment API endpoints, nested under `/resources/{key}/comments/`.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use super::{parse_id, ApiResult, Payload};
use crate::auth::{AuthUser, Caller};
use crate::errors::AppError;
use crate::models::{Comment, CommentRequest};
use crate::permissions::{authorize, authorize_object, Action, Endpoint};
use crate::AppState;

/// GET /resources/{key}/comments/ - List a resource's comments.
pub async fn list_comments(
    State(state): State<AppState>,
    caller: Caller,
    Path(key): Path<String>,
) -> ApiResult<Json<Vec<Comment>>> {
    authorize(&caller, Endpoint::Comments, Action::List)?;
    let resource_id = parent_resource(&state, &key).await?;

    Ok(Json(state.repo.list_comments(resource_id).await?))
}

/// POST /resources/{key}/comments/ - Comment on a resource as the caller.
pub async fn create_comment(
    State(state): State<AppState>,
    caller: Caller,
    Path(key): Path<String>,
    body: Result<Payload<CommentRequest>, AppError>,
) -> ApiResult<(StatusCode, Json<Comment>)> {
    let user = authorize(&caller, Endpoint::Comments, Action::Create)?;
    let resource_id = parent_resource(&state, &key).await?;
    let Payload(request) = body?;

    let content = request.validate_create()?;
    let comment = state
        .repo
        .create_comment(resource_id, user.id, &content)
        .await?;
    tracing::info!(
        resource_id,
        comment_id = comment.id,
        author = %user.username,
        "Posted comment"
    );

    Ok((StatusCode::CREATED, Json(comment)))
}

/// GET /resources/{key}/comments/{comment_id}/ - Retrieve one comment.
pub async fn get_comment(
    State(state): State<AppState>,
    caller: Caller,
    Path((key, comment_id)): Path<(String, String)>,
) -> ApiResult<Json<Comment>> {
    authorize(&caller, Endpoint::Comments, Action::Retrieve)?;
    let resource_id = parent_resource(&state, &key).await?;

    Ok(Json(find_comment(&state, resource_id, &comment_id).await?))
}

/// PUT|PATCH /resources/{key}/comments/{comment_id}/ - Edit a comment (author only).
pub async fn update_comment(
    State(state): State<AppState>,
    caller: Caller,
    Path((key, comment_id)): Path<(String, String)>,
    body: Result<Payload<CommentRequest>, AppError>,
) -> ApiResult<Json<Comment>> {
    let user = authorize(&caller, Endpoint::Comments, Action::Update)?;
    let comment = authored_comment(&state, user, &key, &comment_id, Action::Update).await?;
    let Payload(request) = body?;

    let Some(content) = request.validate_update()? else {
        return Ok(Json(comment));
    };

    let updated = state
        .repo
        .update_comment(comment.resource_id, comment.id, &content)
        .await?;
    tracing::info!(comment_id = updated.id, "Updated comment");

    Ok(Json(updated))
}

/// DELETE /resources/{key}/comments/{comment_id}/ - Delete a comment (author only).
pub async fn delete_comment(
    State(state): State<AppState>,
    caller: Caller,
    Path((key, comment_id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    let user = authorize(&caller, Endpoint::Comments, Action::Destroy)?;
    let comment = authored_comment(&state, user, &key, &comment_id, Action::Destroy).await?;

    state
        .repo
        .delete_comment(comment.resource_id, comment.id)
        .await?;
    tracing::info!(comment_id = comment.id, "Deleted comment");

    Ok(StatusCode::NO_CONTENT)
}

/// Resolve the resource a comment route is nested under.
async fn parent_resource(state: &AppState, key: &str) -> Result<i64, AppError> {
    let resource_id = parse_id(key)?;
    if !state.repo.resource_exists(resource_id).await? {
        return Err(AppError::NotFound);
    }
    Ok(resource_id)
}

async fn find_comment(
    state: &AppState,
    resource_id: i64,
    comment_id: &str,
) -> Result<Comment, AppError> {
    let comment_id = parse_id(comment_id)?;
    state
        .repo
        .get_comment(resource_id, comment_id)
        .await?
        .ok_or(AppError::NotFound)
}

/// Resolve a comment for a write and run the authorship check on it.
async fn authored_comment(
    state: &AppState,
    user: &AuthUser,
    key: &str,
    comment_id: &str,
    action: Action,
) -> Result<Comment, AppError> {
    let resource_id = parent_resource(state, key).await?;
    let comment = find_comment(state, resource_id, comment_id).await?;
    authorize_object(user, Endpoint::Comments, action, &comment)?;
    Ok(comment)
}
