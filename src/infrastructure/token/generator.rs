//! Random token values
//!
//! Values are URL-safe base64 without padding so they can be embedded
//! directly in a link path segment.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::RngCore;

/// Generator for unguessable token values
#[derive(Debug, Clone)]
pub struct TokenGenerator {
    /// Number of random bytes before encoding
    token_bytes: usize,
}

impl TokenGenerator {
    pub fn new(token_bytes: usize) -> Self {
        Self { token_bytes }
    }

    pub fn generate(&self) -> String {
        let mut random_bytes = vec![0u8; self.token_bytes];
        rand::thread_rng().fill_bytes(&mut random_bytes);

        URL_SAFE_NO_PAD.encode(&random_bytes)
    }
}

impl Default for TokenGenerator {
    fn default() -> Self {
        Self::new(32)
    }
}
