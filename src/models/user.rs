//! User-facing account models: the embedded user view and the auth payloads.

use serde::{Deserialize, Serialize};

use super::{CharField, Field};
use crate::errors::{AppError, FieldErrors};

pub const USERNAME: CharField = CharField::new("username").min_length(3).max_length(150);
pub const PASSWORD: CharField = CharField::new("password").min_length(6);

/// Credentials at login are only checked for presence.
const LOGIN_USERNAME: CharField = CharField::new("username");
const LOGIN_PASSWORD: CharField = CharField::new("password");

pub const INVALID_USERNAME: &str = "Enter a valid username. This value may contain only \
                                    letters, numbers, and @/./+/-/_ characters.";
pub const DUPLICATE_USERNAME: &str = "A user with that username already exists.";

/// The only user fields ever embedded in resource and comment payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub username: String,
}

/// Cleaned registration input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub password: String,
}

/// Request body for `POST /register/`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: Field,
    #[serde(default)]
    pub password: Field,
}

impl RegisterRequest {
    pub fn validate(&self) -> Result<NewUser, AppError> {
        let mut errors = FieldErrors::new();

        let username = USERNAME.required(&self.username, &mut errors);
        if let Some(name) = &username {
            if !is_valid_username(name) {
                errors.add(USERNAME.name, INVALID_USERNAME);
            }
        }
        let password = PASSWORD.required(&self.password, &mut errors);

        errors.finish(NewUser {
            username: username.unwrap_or_default(),
            password: password.unwrap_or_default(),
        })
    }
}

/// Response body for a successful registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisteredUser {
    pub id: i64,
    pub username: String,
    pub token: String,
}

/// Request body for `POST /login/`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: Field,
    #[serde(default)]
    pub password: Field,
}

impl LoginRequest {
    /// Returns `(username, password)`.
    pub fn validate(&self) -> Result<(String, String), AppError> {
        let mut errors = FieldErrors::new();
        let username = LOGIN_USERNAME.required(&self.username, &mut errors);
        let password = LOGIN_PASSWORD.required(&self.password, &mut errors);
        errors.finish((username.unwrap_or_default(), password.unwrap_or_default()))
    }
}

/// Response body for a successful login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub id: i64,
    pub username: String,
}

/// Letters, digits and `@ . + - _` only.
pub fn is_valid_username(username: &str) -> bool {
    !username.is_empty()
        && username
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '@' | '.' | '+' | '-'))
}
