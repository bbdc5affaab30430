//! Registration and login endpoints. Neither requires a token.

use axum::{extract::State, http::StatusCode, Json};

use super::{ApiResult, Payload};
use crate::auth::{hash_password, verify_password};
use crate::errors::{AppError, FieldErrors};
use crate::models::{
    LoginRequest, LoginResponse, RegisterRequest, RegisteredUser, DUPLICATE_USERNAME, USERNAME,
};
use crate::AppState;

/// POST /register/ - Create an account and its auth token.
pub async fn register(
    State(state): State<AppState>,
    Payload(request): Payload<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<RegisteredUser>)> {
    let new_user = request.validate()?;
    if state.repo.username_exists(&new_user.username).await? {
        return Err(AppError::Validation(FieldErrors::single(
            USERNAME.name,
            DUPLICATE_USERNAME,
        )));
    }

    let password_hash = hash_password(new_user.password).await?;
    let (id, token) = state
        .repo
        .create_user(&new_user.username, &password_hash, false)
        .await?;
    tracing::info!(user_id = id, "Registered user {}", new_user.username);

    Ok((
        StatusCode::CREATED,
        Json(RegisteredUser {
            id,
            username: new_user.username,
            token,
        }),
    ))
}

/// POST /login/ - Exchange credentials for the account's token.
pub async fn login(
    State(state): State<AppState>,
    Payload(request): Payload<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let (username, password) = request.validate()?;

    let Some(credentials) = state.repo.find_credentials(&username).await? else {
        tracing::debug!("Login failed: unknown user {}", username);
        return Err(AppError::InvalidCredentials);
    };

    if !verify_password(password, credentials.password_hash).await? {
        tracing::debug!("Login failed: bad password for {}", username);
        return Err(AppError::InvalidCredentials);
    }

    let token = state.repo.token_for_user(credentials.id).await?;

    Ok(Json(LoginResponse {
        token,
        id: credentials.id,
        username: credentials.username,
    }))
}
