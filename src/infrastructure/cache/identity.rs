//! Memoization of resolved identities using moka
//!
//! Entries never expire and are never invalidated by changes made outside
//! this process; a row updated elsewhere keeps its old projection here until
//! the entry is evicted for capacity.

use moka::future::Cache as MokaCache;

use crate::domain::{PublicUser, User, UserId};

/// Identity a projection can be resolved by
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IdentityKey {
    Id(String),
    Email(String),
}

impl IdentityKey {
    pub fn id(id: &UserId) -> Self {
        Self::Id(id.as_str().to_string())
    }

    pub fn email(email: impl Into<String>) -> Self {
        Self::Email(email.into())
    }
}

/// Bounded, internally synchronized identity cache
///
/// Cloning shares the underlying storage.
#[derive(Debug, Clone)]
pub struct IdentityCache {
    cache: MokaCache<IdentityKey, PublicUser>,
}

impl IdentityCache {
    pub fn new(max_capacity: u64) -> Self {
        Self {
            cache: MokaCache::builder().max_capacity(max_capacity).build(),
        }
    }

    pub async fn load(&self, key: &IdentityKey) -> Option<PublicUser> {
        self.cache.get(key).await
    }

    /// Insert unless an entry exists; returns the projection that is now cached
    pub async fn store_if_absent(&self, key: IdentityKey, user: PublicUser) -> PublicUser {
        self.cache.entry(key).or_insert(user).await.into_value()
    }

    /// Record a projection under both its id and its email
    pub async fn store(&self, user: PublicUser) {
        self.cache.insert(IdentityKey::id(user.id()), user.clone()).await;
        self.cache
            .insert(IdentityKey::email(user.email()), user)
            .await;
    }

    /// Record the public projection of a user fresh from storage
    pub async fn remember(&self, user: &User) {
        self.store(user.to_public()).await;
    }

    pub async fn entry_count(&self) -> u64 {
        self.cache.run_pending_tasks().await;
        self.cache.entry_count()
    }
}

impl Default for IdentityCache {
    fn default() -> Self {
        Self::new(10_000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::HashedPassword;

    fn user(email: &str, name: &str) -> User {
        User::new(
            UserId::generate(),
            email,
            name,
            HashedPassword::new(vec![1; 32], vec![2; 16]),
        )
    }

    #[tokio::test]
    async fn test_remember_stores_under_both_keys() {
        let cache = IdentityCache::default();
        let ann = user("a@x.com", "Ann");

        cache.remember(&ann).await;

        let by_id = cache.load(&IdentityKey::id(ann.id())).await.unwrap();
        let by_email = cache.load(&IdentityKey::email("a@x.com")).await.unwrap();
        assert_eq!(by_id, by_email);
        assert_eq!(by_email.name(), "Ann");
        assert_eq!(cache.entry_count().await, 2);
    }

    #[tokio::test]
    async fn test_store_if_absent_keeps_existing() {
        let cache = IdentityCache::default();
        let key = IdentityKey::email("a@x.com");

        let first = cache
            .store_if_absent(key.clone(), user("a@x.com", "Ann").to_public())
            .await;
        let second = cache
            .store_if_absent(key.clone(), user("a@x.com", "Other").to_public())
            .await;

        assert_eq!(first.name(), "Ann");
        assert_eq!(second.name(), "Ann");
        assert_eq!(cache.load(&key).await.unwrap().name(), "Ann");
    }

    #[tokio::test]
    async fn test_load_missing() {
        let cache = IdentityCache::default();
        assert!(cache.load(&IdentityKey::email("a@x.com")).await.is_none());
        assert_eq!(cache.entry_count().await, 0);
    }

    #[tokio::test]
    async fn test_concurrent_store_if_absent() {
        let cache = IdentityCache::default();
        let key = IdentityKey::email("a@x.com");

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cache = cache.clone();
                let key = key.clone();
                tokio::spawn(async move {
                    let name = format!("user-{}", i);
                    cache
                        .store_if_absent(key, user("a@x.com", &name).to_public())
                        .await
                })
            })
            .collect();

        let mut winners = Vec::new();
        for handle in handles {
            winners.push(handle.await.unwrap());
        }

        // Every caller observes the single projection that won the race
        assert!(winners.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(cache.load(&key).await, winners.first().cloned());
    }
}
