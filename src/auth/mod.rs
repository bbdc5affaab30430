//! Token authentication and password handling.
//!
//! Clients send `Authorization: Token <key>` (or `Bearer <key>`). A missing header or an
//! unrecognized scheme leaves the caller anonymous; a recognized scheme with a bad key
//! is rejected outright.

use argon2::password_hash::{rand_core::OsRng, PasswordHash, SaltString};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderValue},
};

use crate::config::AdminAccount;
use crate::db::Repository;
use crate::errors::AppError;
use crate::AppState;

/// Authorization schemes accepted in front of the token key.
const TOKEN_KEYWORDS: [&str; 2] = ["token", "bearer"];

/// An authenticated account, resolved from a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: i64,
    pub username: String,
    pub is_staff: bool,
}

/// Identity of whoever sent the request; `None` when no credentials were supplied.
#[derive(Debug, Clone, Default)]
pub struct Caller(pub Option<AuthUser>);

impl Caller {
    pub fn anonymous() -> Self {
        Self(None)
    }

    pub fn user(&self) -> Option<&AuthUser> {
        self.0.as_ref()
    }
}

impl FromRequestParts<AppState> for Caller {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(key) = token_from_header(parts.headers.get(header::AUTHORIZATION))? else {
            return Ok(Caller::anonymous());
        };

        match state.repo.user_for_token(&key).await? {
            Some(user) => Ok(Caller(Some(user))),
            None => {
                tracing::debug!("Rejected unknown auth token");
                Err(AppError::AuthenticationFailed("Invalid token.".to_string()))
            }
        }
    }
}

/// Extract the token key from an `Authorization` header value.
pub fn token_from_header(value: Option<&HeaderValue>) -> Result<Option<String>, AppError> {
    let Some(value) = value else {
        return Ok(None);
    };

    let parts: Vec<&[u8]> = value
        .as_bytes()
        .split(|b| b.is_ascii_whitespace())
        .filter(|part| !part.is_empty())
        .collect();

    let Some(keyword) = parts.first() else {
        return Ok(None);
    };
    let keyword = String::from_utf8_lossy(keyword).to_ascii_lowercase();
    if !TOKEN_KEYWORDS.contains(&keyword.as_str()) {
        return Ok(None);
    }

    match parts.len() {
        1 => Err(AppError::AuthenticationFailed(
            "Invalid token header. No credentials provided.".to_string(),
        )),
        2 => match std::str::from_utf8(parts[1]) {
            Ok(key) if key.is_ascii() => Ok(Some(key.to_string())),
            _ => Err(AppError::AuthenticationFailed(
                "Invalid token header. Token string should not contain invalid characters."
                    .to_string(),
            )),
        },
        _ => Err(AppError::AuthenticationFailed(
            "Invalid token header. Token string should not contain spaces.".to_string(),
        )),
    }
}

/// Generate a fresh opaque token key.
pub fn generate_token_key() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Hash a password into an Argon2id PHC string. Runs on the blocking pool.
pub async fn hash_password(password: String) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
    })
    .await
    .map_err(|e| AppError::Internal(format!("Password hashing task failed: {}", e)))?
    .map_err(AppError::from)
}

/// Check a password against a stored PHC string. Runs on the blocking pool.
pub async fn verify_password(password: String, stored_hash: String) -> Result<bool, AppError> {
    tokio::task::spawn_blocking(move || {
        let parsed = PasswordHash::new(&stored_hash)?;
        match Argon2::default().verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(e),
        }
    })
    .await
    .map_err(|e| AppError::Internal(format!("Password verification task failed: {}", e)))?
    .map_err(AppError::from)
}

/// Make sure the configured staff account exists, promoting it if it is a plain user.
pub async fn ensure_admin(repo: &Repository, admin: &AdminAccount) -> Result<(), AppError> {
    match repo.find_credentials(&admin.username).await? {
        Some(existing) if existing.is_staff => {
            tracing::info!("Admin account {} already present", existing.username);
        }
        Some(existing) => {
            repo.set_staff(existing.id, true).await?;
            tracing::info!("Promoted {} to staff", existing.username);
        }
        None => {
            let password_hash = hash_password(admin.password.clone()).await?;
            let (id, _) = repo
                .create_user(&admin.username, &password_hash, true)
                .await?;
            tracing::info!(user_id = id, "Created admin account {}", admin.username);
        }
    }
    Ok(())
}
