//! Wire models for the resource share API.
//!
//! Read views are what leaves the system; request bodies carry raw fields that are
//! validated into cleaned values before anything reaches the repository.

mod category;
mod comment;
mod fields;
mod resource;
mod user;

pub use category::*;
pub use comment::*;
pub use fields::*;
pub use resource::*;
pub use user::*;
