//! User entity and related types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque user identifier, a random UUID rendered as a string
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Generate a fresh identifier
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Wrap an identifier read back from storage
    pub fn from_stored(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Argon2id output together with the salt it was derived from
///
/// The two only ever travel together so a user row can never carry a hash
/// without its salt or the other way round.
#[derive(Clone, PartialEq, Eq)]
pub struct HashedPassword {
    hash: Vec<u8>,
    salt: Vec<u8>,
}

impl HashedPassword {
    pub fn new(hash: Vec<u8>, salt: Vec<u8>) -> Self {
        Self { hash, salt }
    }

    pub fn hash(&self) -> &[u8] {
        &self.hash
    }

    pub fn salt(&self) -> &[u8] {
        &self.salt
    }
}

impl std::fmt::Debug for HashedPassword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HashedPassword")
            .field("hash_len", &self.hash.len())
            .field("salt_len", &self.salt.len())
            .finish()
    }
}

/// Stored user record
#[derive(Debug, Clone)]
pub struct User {
    id: UserId,
    email: String,
    name: String,
    password: HashedPassword,
    /// Milliseconds since the Unix epoch; 0 while unverified
    verified_at: i64,
}

impl User {
    /// Create a new, unverified user
    pub fn new(
        id: UserId,
        email: impl Into<String>,
        name: impl Into<String>,
        password: HashedPassword,
    ) -> Self {
        Self {
            id,
            email: email.into(),
            name: name.into(),
            password,
            verified_at: 0,
        }
    }

    /// Rebuild a user from a storage row
    pub fn restore(
        id: UserId,
        email: String,
        name: String,
        password: HashedPassword,
        verified_at: i64,
    ) -> Self {
        Self {
            id,
            email,
            name,
            password,
            verified_at,
        }
    }

    pub fn id(&self) -> &UserId {
        &self.id
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn password(&self) -> &HashedPassword {
        &self.password
    }

    pub fn verified_at(&self) -> i64 {
        self.verified_at
    }

    pub fn is_verified(&self) -> bool {
        self.verified_at > 0
    }

    /// Projection that is safe to cache and hand to callers
    pub fn to_public(&self) -> PublicUser {
        PublicUser {
            id: self.id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
        }
    }
}

/// Public view of a user: no hash, no salt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicUser {
    id: UserId,
    name: String,
    email: String,
}

impl PublicUser {
    pub fn id(&self) -> &UserId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &str {
        &self.email
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User::new(
            UserId::generate(),
            "a@x.com",
            "Ann",
            HashedPassword::new(vec![1; 32], vec![2; 16]),
        )
    }

    #[test]
    fn test_new_user_is_unverified() {
        let user = sample_user();
        assert_eq!(user.verified_at(), 0);
        assert!(!user.is_verified());
    }

    #[test]
    fn test_restored_user_verification() {
        let user = User::restore(
            UserId::from_stored("id-1"),
            "a@x.com".to_string(),
            "Ann".to_string(),
            HashedPassword::new(vec![1], vec![2]),
            1_700_000_000_000,
        );
        assert!(user.is_verified());
        assert_eq!(user.id().as_str(), "id-1");
    }

    #[test]
    fn test_generated_ids_are_unique() {
        assert_ne!(UserId::generate(), UserId::generate());
    }

    #[test]
    fn test_public_projection_omits_credentials() {
        let user = sample_user();
        let public = user.to_public();
        assert_eq!(public.email(), "a@x.com");
        assert_eq!(public.name(), "Ann");
        assert_eq!(public.id(), user.id());

        let json = serde_json::to_value(&public).unwrap();
        let fields: Vec<&str> = json.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(fields.len(), 3);
        assert!(!fields.contains(&"password"));
        assert!(!fields.contains(&"salt"));
    }

    #[test]
    fn test_hashed_password_debug_is_redacted() {
        let hashed = HashedPassword::new(vec![0xAB; 4], vec![0xCD; 2]);
        let rendered = format!("{:?}", hashed);
        assert_eq!(rendered, "HashedPassword { hash_len: 4, salt_len: 2 }");
    }
}
