//! Token domain

mod entity;

pub use entity::{Token, TokenType};
