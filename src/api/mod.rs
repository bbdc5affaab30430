//! REST API module.
//!
//! Contains all API routes and handlers. Handlers authorize first, then resolve the
//! target, then read and validate the body.

mod categories;
mod comments;
mod resources;
mod users;

pub use categories::*;
pub use comments::*;
pub use resources::*;
pub use users::*;

use axum::extract::FromRequest;

use crate::errors::AppError;

/// JSON request body whose parse failures are reported as [`AppError`].
///
/// Handlers take `Result<Payload<T>, AppError>` so that authentication and lookups
/// are answered before the body is looked at.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct Payload<T>(pub T);

/// Response type for handlers.
pub type ApiResult<T> = Result<T, AppError>;

/// Parse a numeric path id. Anything else cannot name a row.
pub fn parse_id(raw: &str) -> Result<i64, AppError> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AppError::NotFound);
    }
    raw.parse().map_err(|_| AppError::NotFound)
}

/// Whether a `/resources/{key}/` segment addresses a resource id rather than a category.
pub fn is_id_segment(raw: &str) -> bool {
    !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id("42").unwrap(), 42);
        assert!(matches!(parse_id("music"), Err(AppError::NotFound)));
        assert!(matches!(parse_id("-1"), Err(AppError::NotFound)));
        assert!(matches!(parse_id(""), Err(AppError::NotFound)));
        assert!(matches!(
            parse_id("99999999999999999999999"),
            Err(AppError::NotFound)
        ));
    }

    #[test]
    fn test_is_id_segment() {
        assert!(is_id_segment("7"));
        assert!(!is_id_segment("music"));
        assert!(!is_id_segment("7a"));
    }
}
