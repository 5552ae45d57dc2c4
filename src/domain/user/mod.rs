//! User domain
//!
//! User records, the public projection handed to callers, and validation of
//! user-supplied fields.

mod entity;
mod validation;

pub use entity::{HashedPassword, PublicUser, User, UserId};
pub use validation::{normalize_email, validate_name, validate_password, UserValidationError};
