//! Error handling module for the resource share backend.
//!
//! Provides centralized error types with mapping to HTTP status codes and response bodies.

use std::collections::BTreeMap;

use axum::{
    extract::rejection::JsonRejection,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Fixed messages surfaced to API clients.
pub mod messages {
    pub const NOT_AUTHENTICATED: &str = "Authentication credentials were not provided.";
    pub const NOT_FOUND: &str = "Not found.";
    pub const INVALID_CREDENTIALS: &str = "Unable to login with the provided credentials.";
    pub const SERVER_ERROR: &str = "A server error occurred.";
    pub const REQUIRED: &str = "This field is required.";
    pub const NULL: &str = "This field may not be null.";
    pub const BLANK: &str = "This field may not be blank.";
    pub const INVALID_URL: &str = "Enter a valid URL.";
    pub const NOT_A_STRING: &str = "Not a valid string.";
}

/// Field-keyed validation messages, serialized as `{"field": ["message", ...]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message against a field.
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// Build an error for a single field.
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    /// `Ok(value)` when nothing was recorded, otherwise a validation error.
    pub fn finish<T>(self, value: T) -> Result<T, AppError> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(AppError::Validation(self))
        }
    }
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    /// No credentials were supplied for a protected endpoint
    NotAuthenticated,
    /// Credentials were supplied but could not be verified
    AuthenticationFailed(String),
    /// Caller is authenticated but lacks the required permission
    PermissionDenied(String),
    /// Target entity (or its parent) does not exist
    NotFound,
    /// Route exists but not for this method
    MethodNotAllowed(String),
    /// Field-level validation failures
    Validation(FieldErrors),
    /// Login with an unknown username or wrong password
    InvalidCredentials,
    /// Malformed request body
    BadRequest(String),
    /// Request body not sent as JSON
    UnsupportedMediaType(String),
    /// Database error
    Database(String),
    /// Internal server error
    Internal(String),
}

impl AppError {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotAuthenticated => StatusCode::UNAUTHORIZED,
            AppError::AuthenticationFailed(_) => StatusCode::UNAUTHORIZED,
            AppError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidCredentials => StatusCode::BAD_REQUEST,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error message.
    pub fn message(&self) -> String {
        match self {
            AppError::NotAuthenticated => messages::NOT_AUTHENTICATED.to_string(),
            AppError::AuthenticationFailed(msg) => msg.clone(),
            AppError::PermissionDenied(msg) => msg.clone(),
            AppError::NotFound => messages::NOT_FOUND.to_string(),
            AppError::MethodNotAllowed(method) => format!("Method \"{}\" not allowed.", method),
            AppError::Validation(errors) => {
                serde_json::to_string(errors).unwrap_or_else(|_| "Invalid input.".to_string())
            }
            AppError::InvalidCredentials => messages::INVALID_CREDENTIALS.to_string(),
            AppError::BadRequest(msg) => msg.clone(),
            AppError::UnsupportedMediaType(msg) => msg.clone(),
            AppError::Database(msg) => msg.clone(),
            AppError::Internal(msg) => msg.clone(),
        }
    }

    /// Build the JSON body returned to the client.
    fn body(&self) -> serde_json::Value {
        match self {
            AppError::Validation(errors) => serde_json::to_value(errors)
                .unwrap_or_else(|_| serde_json::json!({ "detail": "Invalid input." })),
            AppError::InvalidCredentials => {
                serde_json::json!({ "message": messages::INVALID_CREDENTIALS })
            }
            // Storage and internal details stay in the logs.
            AppError::Database(_) | AppError::Internal(_) => {
                serde_json::json!({ "detail": messages::SERVER_ERROR })
            }
            other => serde_json::json!({ "detail": other.message() }),
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.status_code().as_u16(), self.message())
    }
}

impl std::error::Error for AppError {}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!("Database error: {:?}", err);
        AppError::Database(format!("Database error: {}", err))
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!("Rejected request body: {}", rejection.body_text());
        match rejection {
            JsonRejection::MissingJsonContentType(_) => AppError::UnsupportedMediaType(
                "Unsupported media type in request, expected application/json.".to_string(),
            ),
            other => AppError::BadRequest(format!("JSON parse error - {}", other.body_text())),
        }
    }
}

impl From<argon2::password_hash::Error> for AppError {
    fn from(err: argon2::password_hash::Error) -> Self {
        tracing::error!("Password hashing error: {}", err);
        AppError::Internal(format!("Password hashing error: {}", err))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let mut response = (status, Json(self.body())).into_response();

        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Token"));
        }

        response
    }
}
