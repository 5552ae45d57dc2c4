//! Infrastructure layer - hashing, storage, tokens, caching, mail and logging

pub mod cache;
pub mod logging;
pub mod mail;
pub mod storage;
pub mod token;
pub mod user;
