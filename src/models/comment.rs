//! Comment model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CharField, Field, UserSummary};
use crate::errors::{AppError, FieldErrors};

pub const COMMENT_CONTENT: CharField = CharField::new("content").max_length(255);

/// A comment on a resource, as returned to clients.
#[derive(Debug, Clone, Serialize)]
pub struct Comment {
    pub id: i64,
    pub content: String,
    pub author: UserSummary,
    pub posted_on: DateTime<Utc>,
    #[serde(skip)]
    pub author_id: i64,
    #[serde(skip)]
    pub resource_id: i64,
}

/// Request body for creating or updating a comment. Author and resource are
/// taken from the caller and the path.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommentRequest {
    #[serde(default)]
    pub content: Field,
}

impl CommentRequest {
    pub fn validate_create(&self) -> Result<String, AppError> {
        let mut errors = FieldErrors::new();
        let content = COMMENT_CONTENT.required(&self.content, &mut errors);
        errors.finish(content.unwrap_or_default())
    }

    pub fn validate_update(&self) -> Result<Option<String>, AppError> {
        let mut errors = FieldErrors::new();
        let content = COMMENT_CONTENT.optional(&self.content, &mut errors);
        errors.finish(content)
    }
}
