//! Resource model.

use serde::{Deserialize, Serialize};

use super::{primary_keys, Category, CharField, Comment, Field, UrlField, UserSummary};
use crate::errors::{AppError, FieldErrors};

pub const RESOURCE_TITLE: CharField = CharField::new("title").max_length(255);
pub const RESOURCE_URL: UrlField = UrlField::new("resource_url", 200);
pub const RESOURCE_CATEGORIES: &str = "categories";

/// A shared link, as returned to clients.
#[derive(Debug, Clone, Serialize)]
pub struct Resource {
    pub id: i64,
    pub title: String,
    pub categories: Vec<Category>,
    pub resource_url: String,
    pub owner: UserSummary,
    pub comment_set: Vec<Comment>,
    #[serde(skip)]
    pub owner_id: i64,
}

/// Cleaned input for a new resource. The owner comes from the caller, never the body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewResource {
    pub title: String,
    pub resource_url: String,
    pub categories: Vec<i64>,
}

/// Cleaned partial update; `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceChanges {
    pub title: Option<String>,
    pub resource_url: Option<String>,
    pub categories: Option<Vec<i64>>,
}

/// Request body for creating or updating a resource.
///
/// Unknown keys such as `owner` are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResourceRequest {
    #[serde(default)]
    pub title: Field,
    #[serde(default)]
    pub resource_url: Field,
    #[serde(default)]
    pub categories: Field,
}

impl ResourceRequest {
    pub fn validate_create(&self) -> Result<NewResource, AppError> {
        let mut errors = FieldErrors::new();
        let title = RESOURCE_TITLE.required(&self.title, &mut errors);
        let resource_url = RESOURCE_URL.required(&self.resource_url, &mut errors);
        let categories = primary_keys(RESOURCE_CATEGORIES, &self.categories, &mut errors);

        errors.finish(NewResource {
            title: title.unwrap_or_default(),
            resource_url: resource_url.unwrap_or_default(),
            categories: categories.unwrap_or_default(),
        })
    }

    pub fn validate_update(&self) -> Result<ResourceChanges, AppError> {
        let mut errors = FieldErrors::new();
        let changes = ResourceChanges {
            title: RESOURCE_TITLE.optional(&self.title, &mut errors),
            resource_url: RESOURCE_URL.optional(&self.resource_url, &mut errors),
            categories: primary_keys(RESOURCE_CATEGORIES, &self.categories, &mut errors),
        };
        errors.finish(changes)
    }
}
