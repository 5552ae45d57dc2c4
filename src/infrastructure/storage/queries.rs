//! Statements against the `users` and `tokens` tables

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use crate::domain::{HashedPassword, StoreError, Token, TokenType, User, UserId};

const USER_COLUMNS: &str = "id, email, name, password, salt, verified_at";

/// Typed statements bound to one connection or transaction
pub struct Queries<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> Queries<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        Self { conn }
    }

    pub async fn get_user_by_email(&mut self, email: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?"))
            .bind(email)
            .fetch_optional(&mut *self.conn)
            .await
            .map_err(|e| StoreError::query("failed to get the user by email", e))?;

        row.as_ref().map(row_to_user).transpose()
    }

    pub async fn get_user_by_id(&mut self, id: &UserId) -> Result<Option<User>, StoreError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
            .bind(id.as_str())
            .fetch_optional(&mut *self.conn)
            .await
            .map_err(|e| StoreError::query("failed to get the user by id", e))?;

        row.as_ref().map(row_to_user).transpose()
    }

    /// Insert a user; a taken email surfaces as [`StoreError::Conflict`]
    pub async fn create_user(&mut self, user: &User) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, name, password, salt, verified_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(user.id().as_str())
        .bind(user.email())
        .bind(user.name())
        .bind(user.password().hash())
        .bind(user.password().salt())
        .bind(user.verified_at())
        .execute(&mut *self.conn)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::Conflict {
                    context: "failed to create the user",
                }
            } else {
                StoreError::query("failed to create the user", e)
            }
        })?;

        Ok(())
    }

    /// Replace hash and salt together, returning the updated row
    pub async fn update_user_password(
        &mut self,
        email: &str,
        password: &HashedPassword,
    ) -> Result<Option<User>, StoreError> {
        let row = sqlx::query(&format!(
            "UPDATE users SET password = ?, salt = ? WHERE email = ? RETURNING {USER_COLUMNS}"
        ))
        .bind(password.hash())
        .bind(password.salt())
        .bind(email)
        .fetch_optional(&mut *self.conn)
        .await
        .map_err(|e| StoreError::query("failed to update the user password", e))?;

        row.as_ref().map(row_to_user).transpose()
    }

    /// Stamp the verification instant; an already verified user keeps the first one
    pub async fn set_user_verified(
        &mut self,
        email: &str,
        now: i64,
    ) -> Result<Option<User>, StoreError> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE users
            SET verified_at = CASE WHEN verified_at = 0 THEN ? ELSE verified_at END
            WHERE email = ?
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(now)
        .bind(email)
        .fetch_optional(&mut *self.conn)
        .await
        .map_err(|e| StoreError::query("failed to set the user as verified", e))?;

        row.as_ref().map(row_to_user).transpose()
    }

    pub async fn create_token(&mut self, token: &Token) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO tokens (token, type, email, expires_at) VALUES (?, ?, ?, ?)")
            .bind(token.value())
            .bind(token.token_type().as_str())
            .bind(token.email())
            .bind(token.expires_at())
            .execute(&mut *self.conn)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StoreError::Conflict {
                        context: "failed to create the token",
                    }
                } else {
                    StoreError::query("failed to create the token", e)
                }
            })?;

        Ok(())
    }

    /// Token matching value and type whose expiry is still ahead of `now`
    pub async fn get_live_token(
        &mut self,
        token: &str,
        token_type: TokenType,
        now: i64,
    ) -> Result<Option<Token>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT token, type, email, expires_at
            FROM tokens
            WHERE token = ? AND type = ? AND expires_at > ?
            "#,
        )
        .bind(token)
        .bind(token_type.as_str())
        .bind(now)
        .fetch_optional(&mut *self.conn)
        .await
        .map_err(|e| StoreError::query("failed to get the token", e))?;

        row.as_ref().map(row_to_token).transpose()
    }

    pub async fn delete_tokens_by_email_and_type(
        &mut self,
        email: &str,
        token_type: TokenType,
    ) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM tokens WHERE email = ? AND type = ?")
            .bind(email)
            .bind(token_type.as_str())
            .execute(&mut *self.conn)
            .await
            .map_err(|e| StoreError::query("failed to delete the tokens for the email", e))?;

        Ok(result.rows_affected())
    }

    pub async fn delete_token(&mut self, token: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM tokens WHERE token = ?")
            .bind(token)
            .execute(&mut *self.conn)
            .await
            .map_err(|e| StoreError::query("failed to delete the token", e))?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete every token whose expiry is at or before `now`
    pub async fn purge_expired_tokens(&mut self, now: i64) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM tokens WHERE expires_at <= ?")
            .bind(now)
            .execute(&mut *self.conn)
            .await
            .map_err(|e| StoreError::query("failed to purge expired tokens", e))?;

        Ok(result.rows_affected())
    }

    pub async fn count_users(&mut self) -> Result<i64, StoreError> {
        sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&mut *self.conn)
            .await
            .map_err(|e| StoreError::query("failed to count users", e))
    }

    /// Number of token rows, live or not, of a type for an email
    pub async fn count_tokens(
        &mut self,
        email: &str,
        token_type: TokenType,
    ) -> Result<i64, StoreError> {
        sqlx::query_scalar("SELECT COUNT(*) FROM tokens WHERE email = ? AND type = ?")
            .bind(email)
            .bind(token_type.as_str())
            .fetch_one(&mut *self.conn)
            .await
            .map_err(|e| StoreError::query("failed to count tokens", e))
    }
}

fn is_unique_violation(error: &sqlx::Error) -> bool {
    matches!(error, sqlx::Error::Database(db) if db.is_unique_violation())
}

fn row_to_user(row: &SqliteRow) -> Result<User, StoreError> {
    let get_err = |e| StoreError::query("failed to decode the user row", e);

    let id: String = row.try_get("id").map_err(get_err)?;
    let email: String = row.try_get("email").map_err(get_err)?;
    let name: String = row.try_get("name").map_err(get_err)?;
    let hash: Vec<u8> = row.try_get("password").map_err(get_err)?;
    let salt: Vec<u8> = row.try_get("salt").map_err(get_err)?;
    let verified_at: i64 = row.try_get("verified_at").map_err(get_err)?;

    Ok(User::restore(
        UserId::from_stored(id),
        email,
        name,
        HashedPassword::new(hash, salt),
        verified_at,
    ))
}

fn row_to_token(row: &SqliteRow) -> Result<Token, StoreError> {
    let get_err = |e| StoreError::query("failed to decode the token row", e);

    let value: String = row.try_get("token").map_err(get_err)?;
    let token_type: String = row.try_get("type").map_err(get_err)?;
    let email: String = row.try_get("email").map_err(get_err)?;
    let expires_at: i64 = row.try_get("expires_at").map_err(get_err)?;

    let token_type = token_type.parse::<TokenType>().map_err(StoreError::corrupt)?;

    Ok(Token::new(value, token_type, email, expires_at))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::storage::Store;

    fn user(email: &str) -> User {
        User::new(
            UserId::generate(),
            email,
            "Ann",
            HashedPassword::new(vec![7; 32], vec![8; 16]),
        )
    }

    #[tokio::test]
    async fn test_user_round_trip() {
        let store = Store::in_memory().await.unwrap();
        let created = user("a@x.com");

        let mut tx = store.write().await.unwrap();
        tx.queries().create_user(&created).await.unwrap();
        tx.commit().await.unwrap();

        let mut conn = store.read().await.unwrap();
        let mut q = conn.queries();

        let by_email = q.get_user_by_email("a@x.com").await.unwrap().unwrap();
        assert_eq!(by_email.id(), created.id());
        assert_eq!(by_email.password(), created.password());
        assert!(!by_email.is_verified());

        let by_id = q.get_user_by_id(created.id()).await.unwrap().unwrap();
        assert_eq!(by_id.email(), "a@x.com");

        assert!(q.get_user_by_email("b@x.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_is_conflict() {
        let store = Store::in_memory().await.unwrap();
        let mut tx = store.write().await.unwrap();
        let mut q = tx.queries();

        q.create_user(&user("a@x.com")).await.unwrap();
        let result = q.create_user(&user("a@x.com")).await;

        assert!(matches!(result, Err(StoreError::Conflict { .. })));
    }

    #[tokio::test]
    async fn test_set_user_verified_keeps_first_instant() {
        let store = Store::in_memory().await.unwrap();
        let mut tx = store.write().await.unwrap();
        let mut q = tx.queries();
        q.create_user(&user("a@x.com")).await.unwrap();

        let first = q.set_user_verified("a@x.com", 100).await.unwrap().unwrap();
        assert_eq!(first.verified_at(), 100);

        let second = q.set_user_verified("a@x.com", 200).await.unwrap().unwrap();
        assert_eq!(second.verified_at(), 100);

        assert!(q.set_user_verified("b@x.com", 300).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_user_password() {
        let store = Store::in_memory().await.unwrap();
        let mut tx = store.write().await.unwrap();
        let mut q = tx.queries();
        q.create_user(&user("a@x.com")).await.unwrap();

        let replacement = HashedPassword::new(vec![9; 32], vec![10; 16]);
        let updated = q
            .update_user_password("a@x.com", &replacement)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.password(), &replacement);

        assert!(q
            .update_user_password("b@x.com", &replacement)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_live_token_lookup_filters_type_and_expiry() {
        let store = Store::in_memory().await.unwrap();
        let mut tx = store.write().await.unwrap();
        let mut q = tx.queries();

        q.create_token(&Token::new("t1", TokenType::Signup, "a@x.com", 1_000))
            .await
            .unwrap();

        let found = q.get_live_token("t1", TokenType::Signup, 999).await.unwrap();
        assert_eq!(found.unwrap().email(), "a@x.com");

        assert!(q
            .get_live_token("t1", TokenType::PasswordReset, 999)
            .await
            .unwrap()
            .is_none());
        assert!(q
            .get_live_token("t1", TokenType::Signup, 1_000)
            .await
            .unwrap()
            .is_none());
        assert!(q
            .get_live_token("other", TokenType::Signup, 0)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_token_deletion_and_purge() {
        let store = Store::in_memory().await.unwrap();
        let mut tx = store.write().await.unwrap();
        let mut q = tx.queries();

        q.create_token(&Token::new("s1", TokenType::Signup, "a@x.com", 10))
            .await
            .unwrap();
        q.create_token(&Token::new("s2", TokenType::Signup, "a@x.com", 5_000))
            .await
            .unwrap();
        q.create_token(&Token::new("r1", TokenType::PasswordReset, "a@x.com", 20))
            .await
            .unwrap();

        assert_eq!(q.purge_expired_tokens(20).await.unwrap(), 2);
        assert_eq!(q.count_tokens("a@x.com", TokenType::Signup).await.unwrap(), 1);
        assert_eq!(
            q.count_tokens("a@x.com", TokenType::PasswordReset).await.unwrap(),
            0
        );

        assert!(q.delete_token("s2").await.unwrap());
        assert!(!q.delete_token("s2").await.unwrap());

        q.create_token(&Token::new("s3", TokenType::Signup, "a@x.com", 5_000))
            .await
            .unwrap();
        assert_eq!(
            q.delete_tokens_by_email_and_type("a@x.com", TokenType::Signup)
                .await
                .unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_duplicate_token_value_is_conflict() {
        let store = Store::in_memory().await.unwrap();
        let mut tx = store.write().await.unwrap();
        let mut q = tx.queries();

        let token = Token::new("dup", TokenType::Signup, "a@x.com", 10);
        q.create_token(&token).await.unwrap();

        assert!(matches!(
            q.create_token(&token).await,
            Err(StoreError::Conflict { .. })
        ));
    }
}
