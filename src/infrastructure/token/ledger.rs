//! Issuance and consumption of single-use tokens
//!
//! The ledger holds no state of its own; every call runs on the statement set
//! of the caller's transaction, so the token change commits or rolls back
//! together with whatever it authorizes.

use tracing::debug;

use super::TokenGenerator;
use crate::config::TokenConfig;
use crate::domain::{StoreError, Token, TokenType};
use crate::infrastructure::storage::Queries;

#[derive(Debug, Clone)]
pub struct TokenLedger {
    generator: TokenGenerator,
    signup_ttl_ms: i64,
    reset_ttl_ms: i64,
}

impl TokenLedger {
    pub fn new(generator: TokenGenerator, config: &TokenConfig) -> Self {
        Self {
            generator,
            signup_ttl_ms: secs_to_ms(config.signup_ttl_secs),
            reset_ttl_ms: secs_to_ms(config.reset_ttl_secs),
        }
    }

    pub fn from_config(config: &TokenConfig) -> Self {
        Self::new(TokenGenerator::new(config.token_bytes), config)
    }

    fn ttl_ms(&self, token_type: TokenType) -> i64 {
        match token_type {
            TokenType::Signup => self.signup_ttl_ms,
            TokenType::PasswordReset => self.reset_ttl_ms,
        }
    }

    /// Supersede every token of `token_type` for `email` with a fresh one
    pub async fn issue(
        &self,
        queries: &mut Queries<'_>,
        email: &str,
        token_type: TokenType,
        now: i64,
    ) -> Result<Token, StoreError> {
        let superseded = queries
            .delete_tokens_by_email_and_type(email, token_type)
            .await?;

        let token = Token::new(
            self.generator.generate(),
            token_type,
            email,
            now.saturating_add(self.ttl_ms(token_type)),
        );
        queries.create_token(&token).await?;

        debug!(email, %token_type, superseded, "Issued token");

        Ok(token)
    }

    /// Find a live token and delete it, returning the row that was consumed
    pub async fn consume(
        &self,
        queries: &mut Queries<'_>,
        value: &str,
        token_type: TokenType,
        now: i64,
    ) -> Result<Option<Token>, StoreError> {
        let Some(token) = self.peek(queries, value, token_type, now).await? else {
            return Ok(None);
        };

        queries.delete_token(token.value()).await?;

        debug!(email = token.email(), %token_type, "Consumed token");

        Ok(Some(token))
    }

    /// Look up a live token without consuming it
    pub async fn peek(
        &self,
        queries: &mut Queries<'_>,
        value: &str,
        token_type: TokenType,
        now: i64,
    ) -> Result<Option<Token>, StoreError> {
        let token = queries.get_live_token(value, token_type, now).await?;
        Ok(token.filter(|token| token.is_live(now)))
    }

    /// Delete every token that is no longer live at `now`
    pub async fn purge_expired(
        &self,
        queries: &mut Queries<'_>,
        now: i64,
    ) -> Result<u64, StoreError> {
        queries.purge_expired_tokens(now).await
    }
}

fn secs_to_ms(secs: u64) -> i64 {
    i64::try_from(secs.saturating_mul(1_000)).unwrap_or(i64::MAX)
}
