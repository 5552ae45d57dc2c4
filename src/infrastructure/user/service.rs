//! Identity service: signup, signin and self-service credential recovery
//!
//! Every mutating operation runs as one unit of work on a [`WriteTx`]: the
//! user row, the token change and the outgoing mail either all take effect or
//! none do. Passwords are hashed on the blocking pool before the transaction
//! is opened so the writer lock is never held across an Argon2id run.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, instrument};

use super::password::PasswordHasher;
use crate::domain::user::{normalize_email, validate_name, validate_password};
use crate::domain::{
    HashError, HashedPassword, IdentityError, Mail, Mailer, PublicUser, SiteDomain, StoreError,
    TokenType, User, UserId,
};
use crate::infrastructure::cache::{IdentityCache, IdentityKey};
use crate::infrastructure::storage::{Queries, Store};
use crate::infrastructure::token::TokenLedger;

/// Orchestrates the hasher, the store, the token ledger, the cache and the mailer
pub struct IdentityService<H: PasswordHasher + 'static> {
    store: Store,
    hasher: Arc<H>,
    mailer: Arc<dyn Mailer>,
    cache: IdentityCache,
    ledger: TokenLedger,
    domain: SiteDomain,
}

impl<H: PasswordHasher + 'static> std::fmt::Debug for IdentityService<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityService")
            .field("hasher", &self.hasher)
            .field("ledger", &self.ledger)
            .field("domain", &self.domain)
            .finish_non_exhaustive()
    }
}

impl<H: PasswordHasher + 'static> IdentityService<H> {
    pub fn new(
        store: Store,
        hasher: Arc<H>,
        mailer: Arc<dyn Mailer>,
        cache: IdentityCache,
        ledger: TokenLedger,
        domain: SiteDomain,
    ) -> Self {
        Self {
            store,
            hasher,
            mailer,
            cache,
            ledger,
            domain,
        }
    }

    pub fn cache(&self) -> &IdentityCache {
        &self.cache
    }

    /// Register an unverified user and mail the confirmation link
    #[instrument(skip_all, fields(email = %email))]
    pub async fn signup(&self, email: &str, name: &str, password: &str) -> Result<(), IdentityError> {
        let email = normalize_email(email)?;
        let name = validate_name(name)?;
        validate_password(password)?;

        let hashed = self.hash_password(password).await?;
        let user = User::new(UserId::generate(), email, name, hashed);
        let now = now_millis();

        let mut tx = self.store.write().await?;
        let outcome = self.register(&mut tx.queries(), &user, now).await;
        tx.finish(outcome).await?;

        self.cache.remember(&user).await;

        info!(user_id = %user.id(), "User signed up");

        Ok(())
    }

    async fn register(
        &self,
        queries: &mut Queries<'_>,
        user: &User,
        now: i64,
    ) -> Result<(), IdentityError> {
        if queries.get_user_by_email(user.email()).await?.is_some() {
            return Err(IdentityError::EmailInUse);
        }

        queries.create_user(user).await.map_err(|e| match e {
            StoreError::Conflict { .. } => IdentityError::EmailInUse,
            other => other.into(),
        })?;

        let token = self
            .ledger
            .issue(queries, user.email(), TokenType::Signup, now)
            .await?;

        let mail = Mail::signup(&self.domain, user.email(), user.name(), token.value());
        self.mailer.send(&mail).await?;

        Ok(())
    }

    /// Authenticate a verified user
    ///
    /// An unknown email and a wrong password are indistinguishable to the caller.
    #[instrument(skip_all, fields(email = %email))]
    pub async fn signin(&self, email: &str, password: &str) -> Result<PublicUser, IdentityError> {
        let email = normalize_email(email).map_err(|_| IdentityError::InvalidCredentials)?;

        let user = {
            let mut conn = self.store.read().await?;
            conn.queries().get_user_by_email(&email).await?
        }
        .ok_or(IdentityError::InvalidCredentials)?;

        if !user.is_verified() {
            return Err(IdentityError::UserNotVerified);
        }

        match self.compare_password(&user, password).await {
            Ok(()) => {}
            Err(IdentityError::Hash(HashError::PasswordNotMatch | HashError::InvalidPassword)) => {
                debug!("Password mismatch");
                return Err(IdentityError::InvalidCredentials);
            }
            Err(e) => return Err(e),
        }

        info!(user_id = %user.id(), "User signed in");

        Ok(self.cache_read(&user).await)
    }

    /// Supersede the signup token of an unverified user and mail it again
    #[instrument(skip_all, fields(email = %email))]
    pub async fn resend_signup_token(&self, email: &str) -> Result<(), IdentityError> {
        let email = normalize_email(email)?;
        let now = now_millis();

        let mut tx = self.store.write().await?;
        let outcome = self.reissue_signup(&mut tx.queries(), &email, now).await;
        tx.finish(outcome).await?;

        debug!("Signup token resent");

        Ok(())
    }

    async fn reissue_signup(
        &self,
        queries: &mut Queries<'_>,
        email: &str,
        now: i64,
    ) -> Result<(), IdentityError> {
        let user = queries
            .get_user_by_email(email)
            .await?
            .ok_or(IdentityError::UserNotVerified)?;

        if user.is_verified() {
            return Err(IdentityError::UserAlreadyVerified);
        }

        let token = self
            .ledger
            .issue(queries, email, TokenType::Signup, now)
            .await?;

        let mail = Mail::signup(&self.domain, email, user.name(), token.value());
        self.mailer.send(&mail).await?;

        Ok(())
    }

    /// Consume a signup token and mark its owner verified
    #[instrument(skip_all)]
    pub async fn validate_signup_token(&self, token: &str) -> Result<PublicUser, IdentityError> {
        if token.is_empty() {
            return Err(IdentityError::InvalidToken);
        }

        let now = now_millis();

        let mut tx = self.store.write().await?;
        let outcome = self.verify(&mut tx.queries(), token, now).await;
        let user = tx.finish(outcome).await?;

        let public = user.to_public();
        self.cache.store(public.clone()).await;

        info!(user_id = %user.id(), "User verified");

        Ok(public)
    }

    async fn verify(
        &self,
        queries: &mut Queries<'_>,
        value: &str,
        now: i64,
    ) -> Result<User, IdentityError> {
        let token = self
            .ledger
            .consume(queries, value, TokenType::Signup, now)
            .await?
            .ok_or(IdentityError::InvalidToken)?;

        queries
            .set_user_verified(token.email(), now)
            .await?
            .ok_or(IdentityError::InvalidToken)
    }

    /// Mail a password reset link to a verified user
    #[instrument(skip_all, fields(email = %email))]
    pub async fn reset_password(&self, email: &str) -> Result<(), IdentityError> {
        let email = normalize_email(email)?;
        let now = now_millis();

        let mut tx = self.store.write().await?;
        let outcome = self.issue_reset(&mut tx.queries(), &email, now).await;
        tx.finish(outcome).await?;

        debug!("Password reset requested");

        Ok(())
    }

    async fn issue_reset(
        &self,
        queries: &mut Queries<'_>,
        email: &str,
        now: i64,
    ) -> Result<(), IdentityError> {
        let user = queries
            .get_user_by_email(email)
            .await?
            .ok_or(IdentityError::EmailNotFound)?;

        if !user.is_verified() {
            return Err(IdentityError::UserNotVerified);
        }

        let token = self
            .ledger
            .issue(queries, email, TokenType::PasswordReset, now)
            .await?;

        let mail = Mail::password_reset(&self.domain, email, user.name(), token.value());
        self.mailer.send(&mail).await?;

        Ok(())
    }

    /// Check that a reset token is live and its owner exists, without consuming it
    #[instrument(skip_all)]
    pub async fn reset_password_token(&self, token: &str) -> Result<(), IdentityError> {
        if token.is_empty() {
            return Err(IdentityError::InvalidToken);
        }

        let now = now_millis();
        let mut conn = self.store.read().await?;
        let mut queries = conn.queries();

        let token = self
            .ledger
            .peek(&mut queries, token, TokenType::PasswordReset, now)
            .await?
            .ok_or(IdentityError::InvalidToken)?;

        queries
            .get_user_by_email(token.email())
            .await?
            .ok_or(IdentityError::EmailNotFound)?;

        Ok(())
    }

    /// Consume a reset token and replace its owner's password
    #[instrument(skip_all)]
    pub async fn change_password_with_token(
        &self,
        token: &str,
        password: &str,
    ) -> Result<PublicUser, IdentityError> {
        validate_password(password)?;

        // Skip the hash for tokens that cannot succeed; the consume below is authoritative
        self.reset_password_token(token).await?;

        let hashed = self.hash_password(password).await?;
        let now = now_millis();

        let mut tx = self.store.write().await?;
        let outcome = self
            .replace_password_with_token(&mut tx.queries(), token, &hashed, now)
            .await;
        let user = tx.finish(outcome).await?;

        let public = user.to_public();
        self.cache.store(public.clone()).await;

        info!(user_id = %user.id(), "Password changed with reset token");

        Ok(public)
    }

    async fn replace_password_with_token(
        &self,
        queries: &mut Queries<'_>,
        value: &str,
        hashed: &HashedPassword,
        now: i64,
    ) -> Result<User, IdentityError> {
        let token = self
            .ledger
            .consume(queries, value, TokenType::PasswordReset, now)
            .await?
            .ok_or(IdentityError::InvalidToken)?;

        queries
            .update_user_password(token.email(), hashed)
            .await?
            .ok_or(IdentityError::EmailNotFound)
    }

    /// Replace the password of an already authenticated user
    ///
    /// Outstanding reset tokens for the user are revoked in the same unit of work.
    #[instrument(skip_all, fields(email = %email))]
    pub async fn change_password(&self, email: &str, password: &str) -> Result<(), IdentityError> {
        let email = normalize_email(email)?;
        validate_password(password)?;

        let hashed = self.hash_password(password).await?;

        let mut tx = self.store.write().await?;
        let outcome = Self::replace_password(&mut tx.queries(), &email, &hashed).await;
        let user = tx.finish(outcome).await?;

        self.cache.store(user.to_public()).await;

        info!(user_id = %user.id(), "Password changed");

        Ok(())
    }

    async fn replace_password(
        queries: &mut Queries<'_>,
        email: &str,
        hashed: &HashedPassword,
    ) -> Result<User, IdentityError> {
        let user = queries
            .update_user_password(email, hashed)
            .await?
            .ok_or(IdentityError::EmailNotFound)?;

        queries
            .delete_tokens_by_email_and_type(email, TokenType::PasswordReset)
            .await?;

        Ok(user)
    }

    /// Resolve a user by id, preferring the cache
    pub async fn get_user(&self, id: &str) -> Result<PublicUser, IdentityError> {
        if let Some(user) = self.cache.load(&IdentityKey::Id(id.to_string())).await {
            return Ok(user);
        }

        let user = {
            let mut conn = self.store.read().await?;
            conn.queries()
                .get_user_by_id(&UserId::from_stored(id))
                .await?
        }
        .ok_or(IdentityError::UserNotFound)?;

        Ok(self.cache_read(&user).await)
    }

    /// Resolve a user by email, preferring the cache
    pub async fn get_user_by_email(&self, email: &str) -> Result<PublicUser, IdentityError> {
        let email = normalize_email(email)?;

        if let Some(user) = self.cache.load(&IdentityKey::email(email.as_str())).await {
            return Ok(user);
        }

        let user = {
            let mut conn = self.store.read().await?;
            conn.queries().get_user_by_email(&email).await?
        }
        .ok_or(IdentityError::UserNotFound)?;

        Ok(self.cache_read(&user).await)
    }

    /// Record an identity resolved elsewhere, e.g. restored from a session
    pub async fn remember(&self, user: PublicUser) {
        self.cache.store(user).await;
    }

    /// Delete every token row that is no longer live
    #[instrument(skip_all)]
    pub async fn purge_expired_tokens(&self) -> Result<u64, IdentityError> {
        let now = now_millis();

        let mut tx = self.store.write().await?;
        let outcome = self
            .ledger
            .purge_expired(&mut tx.queries(), now)
            .await
            .map_err(IdentityError::from);
        let purged = tx.finish(outcome).await?;

        info!(purged, "Purged expired tokens");

        Ok(purged)
    }

    async fn cache_read(&self, user: &User) -> PublicUser {
        let public = self
            .cache
            .store_if_absent(IdentityKey::id(user.id()), user.to_public())
            .await;
        self.cache
            .store_if_absent(IdentityKey::email(user.email()), public.clone())
            .await;
        public
    }

    async fn hash_password(&self, password: &str) -> Result<HashedPassword, IdentityError> {
        let hasher = Arc::clone(&self.hasher);
        let password = password.as_bytes().to_vec();

        let hashed = tokio::task::spawn_blocking(move || hasher.generate_hash(&password, None))
            .await
            .map_err(|e| IdentityError::internal(format!("password hashing task failed: {}", e)))??;

        Ok(hashed)
    }

    async fn compare_password(&self, user: &User, password: &str) -> Result<(), IdentityError> {
        let hasher = Arc::clone(&self.hasher);
        let stored = user.password().clone();
        let password = password.as_bytes().to_vec();

        tokio::task::spawn_blocking(move || {
            hasher.compare(stored.hash(), stored.salt(), &password)
        })
        .await
        .map_err(|e| IdentityError::internal(format!("password comparison task failed: {}", e)))??;

        Ok(())
    }
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}
