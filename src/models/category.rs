//! Category model.

use serde::{Deserialize, Serialize};

use super::{CharField, Field};
use crate::errors::{AppError, FieldErrors};

pub const CATEGORY_NAME: CharField = CharField::new("name").max_length(50);

/// A label resources can be filed under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

/// Request body for creating a category.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateCategoryRequest {
    #[serde(default)]
    pub name: Field,
}

impl CreateCategoryRequest {
    /// Validate the body, returning the cleaned name.
    pub fn validate(&self) -> Result<String, AppError> {
        let mut errors = FieldErrors::new();
        let name = CATEGORY_NAME.required(&self.name, &mut errors);
        errors.finish(name.unwrap_or_default())
    }
}

/// Normalize a category path segment the way stored names are written:
/// the first letter of every alphabetic run upper-cased, the rest lower-cased.
pub fn title_case(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    let mut previous_is_alpha = false;
    for ch in segment.chars() {
        if ch.is_alphabetic() {
            if previous_is_alpha {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            previous_is_alpha = true;
        } else {
            out.push(ch);
            previous_is_alpha = false;
        }
    }
    out
}
