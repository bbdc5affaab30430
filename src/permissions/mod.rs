//! Per-action permission resolution.
//!
//! Every (endpoint, action) pair maps to an ordered list of checks. View-level checks
//! run before the target is looked up; object-level checks run once it is resolved.
//! The first failing check decides the rejection.

use crate::auth::{AuthUser, Caller};
use crate::errors::AppError;
use crate::models::{Comment, Resource};

/// Endpoint families with their own permission rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Categories,
    Resources,
    Comments,
}

/// Operations a handler performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    List,
    Retrieve,
    Create,
    Update,
    Destroy,
}

/// A single capability check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    IsAuthenticated,
    IsAdminUser,
    IsResourceOwner,
    IsCommentAuthor,
}

/// Anything with a single user holding mutation rights over it.
pub trait Owned {
    fn owner_id(&self) -> i64;
}

impl Owned for Resource {
    fn owner_id(&self) -> i64 {
        self.owner_id
    }
}

impl Owned for Comment {
    fn owner_id(&self) -> i64 {
        self.author_id
    }
}

impl Permission {
    /// Message returned to an authenticated caller who fails this check.
    pub fn message(self) -> &'static str {
        match self {
            Permission::IsResourceOwner => "You are not the resource owner.",
            Permission::IsCommentAuthor => "You can delete only your own comments.",
            Permission::IsAuthenticated | Permission::IsAdminUser => {
                "You do not have permission to perform this action."
            }
        }
    }

    /// View-level check, evaluated before any lookup.
    pub fn has_permission(self, caller: Option<&AuthUser>) -> bool {
        match self {
            Permission::IsAuthenticated => caller.is_some(),
            Permission::IsAdminUser => caller.is_some_and(|user| user.is_staff),
            Permission::IsResourceOwner | Permission::IsCommentAuthor => true,
        }
    }

    /// Object-level check, evaluated against the resolved target.
    pub fn has_object_permission(self, user: &AuthUser, target: &dyn Owned) -> bool {
        match self {
            Permission::IsResourceOwner | Permission::IsCommentAuthor => {
                target.owner_id() == user.id
            }
            Permission::IsAuthenticated | Permission::IsAdminUser => true,
        }
    }
}

/// Checks required for an action, in evaluation order.
pub fn required(endpoint: Endpoint, action: Action) -> &'static [Permission] {
    use Permission::*;

    match (endpoint, action) {
        (Endpoint::Categories, Action::Create) => &[IsAuthenticated, IsAdminUser],
        (Endpoint::Resources, Action::Update | Action::Destroy) => {
            &[IsAuthenticated, IsResourceOwner]
        }
        (Endpoint::Comments, Action::Update | Action::Destroy) => {
            &[IsAuthenticated, IsCommentAuthor]
        }
        _ => &[IsAuthenticated],
    }
}

fn deny(caller: Option<&AuthUser>, permission: Permission) -> AppError {
    match caller {
        None => AppError::NotAuthenticated,
        Some(user) => {
            tracing::debug!(
                user = %user.username,
                ?permission,
                "Permission denied"
            );
            AppError::PermissionDenied(permission.message().to_string())
        }
    }
}

/// Run the view-level checks, returning the authenticated user on success.
pub fn authorize<'a>(
    caller: &'a Caller,
    endpoint: Endpoint,
    action: Action,
) -> Result<&'a AuthUser, AppError> {
    let user = caller.user();
    for &permission in required(endpoint, action) {
        if !permission.has_permission(user) {
            return Err(deny(user, permission));
        }
    }
    user.ok_or(AppError::NotAuthenticated)
}

/// Run the object-level checks against a resolved target.
pub fn authorize_object(
    user: &AuthUser,
    endpoint: Endpoint,
    action: Action,
    target: &dyn Owned,
) -> Result<(), AppError> {
    for &permission in required(endpoint, action) {
        if !permission.has_object_permission(user, target) {
            return Err(deny(Some(user), permission));
        }
    }
    Ok(())
}
