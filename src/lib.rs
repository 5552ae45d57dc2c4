//! authkeep
//!
//! Credential and identity lifecycle engine:
//! - Argon2id password hashing with fixed, configured cost parameters
//! - SQLite-backed transactional store with scoped write transactions
//! - Single-use, typed, expiring signup and password reset tokens
//! - In-process cache of public user projections
//! - Signup, signin, confirmation resend and password recovery flows

pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use domain::SiteDomain;
use infrastructure::{
    cache::IdentityCache,
    mail::LogMailer,
    storage::Store,
    token::TokenLedger,
    user::{Argon2idHasher, IdentityService},
};

/// Connect to the configured database, applying pending migrations
pub async fn connect_store(config: &AppConfig) -> anyhow::Result<Store> {
    let store = Store::connect(&config.database)
        .await
        .context("failed to open the database")?;

    let version = store
        .migrate()
        .await
        .context("failed to apply migrations")?;
    info!(?version, "Database schema is up to date");

    Ok(store)
}

/// Build the identity service from configuration, delivering mail to the log
pub async fn build_identity_service(
    config: &AppConfig,
) -> anyhow::Result<IdentityService<Argon2idHasher>> {
    let store = connect_store(config).await?;

    let hasher = Argon2idHasher::new(&config.hasher).context("invalid hasher configuration")?;
    let domain = SiteDomain::new(config.mail.domain.clone()).context("invalid mail domain")?;

    Ok(IdentityService::new(
        store,
        Arc::new(hasher),
        Arc::new(LogMailer::new(config.mail.from.clone())),
        IdentityCache::new(config.cache.max_capacity),
        TokenLedger::from_config(&config.tokens),
        domain,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HasherConfig;

    #[tokio::test]
    async fn test_build_identity_service_from_config() {
        let path = std::env::temp_dir().join(format!("authkeep-{}.db", uuid::Uuid::new_v4()));
        let mut config = AppConfig::default();
        config.database.url = format!("sqlite://{}", path.display());
        config.hasher = HasherConfig {
            time_cost: 1,
            memory_kib: 1024,
            parallelism: 1,
            salt_length: 16,
            key_length: 32,
        };

        let service = build_identity_service(&config).await.unwrap();
        service.signup("a@x.com", "Ann", "pw123").await.unwrap();
        assert_eq!(service.purge_expired_tokens().await.unwrap(), 0);

        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn test_build_rejects_bad_domain() {
        let path = std::env::temp_dir().join(format!("authkeep-{}.db", uuid::Uuid::new_v4()));
        let mut config = AppConfig::default();
        config.database.url = format!("sqlite://{}", path.display());
        config.mail.domain = String::new();

        assert!(build_identity_service(&config).await.is_err());

        let _ = std::fs::remove_file(path);
    }
}
