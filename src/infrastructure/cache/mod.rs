//! Cache infrastructure - process-local identity cache using moka

mod identity;

pub use identity::{IdentityCache, IdentityKey};
