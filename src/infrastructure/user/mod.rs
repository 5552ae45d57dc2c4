//! User infrastructure module
//!
//! Argon2id password hashing and the identity service built on it.

mod password;
mod service;

pub use password::{Argon2idHasher, PasswordHasher};
pub use service::IdentityService;
