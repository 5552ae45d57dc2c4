//! Versioned schema migrations recorded in `_migrations`

use sqlx::sqlite::SqlitePool;
use tracing::info;

use crate::domain::StoreError;

/// One schema step, applied atomically
#[derive(Debug, Clone)]
pub struct Migration {
    pub version: i64,
    pub description: &'static str,
    pub statements: Vec<&'static str>,
}

impl Migration {
    pub fn new(version: i64, description: &'static str, statements: Vec<&'static str>) -> Self {
        Self {
            version,
            description,
            statements,
        }
    }
}

/// Applies migrations that are not yet recorded
#[derive(Debug, Clone)]
pub struct Migrator {
    pool: SqlitePool,
}

impl Migrator {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn ensure_migrations_table(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS _migrations (
                version INTEGER PRIMARY KEY,
                description TEXT NOT NULL,
                installed_on TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::query("failed to create the migrations table", e))?;

        Ok(())
    }

    /// Run every pending migration in order, returning how many were applied
    pub async fn run(&self, migrations: &[Migration]) -> Result<usize, StoreError> {
        self.ensure_migrations_table().await?;

        let mut applied = 0;
        for migration in migrations {
            if self.apply(migration).await? {
                applied += 1;
            }
        }

        Ok(applied)
    }

    async fn apply(&self, migration: &Migration) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await.map_err(StoreError::Begin)?;

        let recorded: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM _migrations WHERE version = ?")
                .bind(migration.version)
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| StoreError::query("failed to check migration status", e))?;

        if recorded > 0 {
            return Ok(false);
        }

        for statement in &migration.statements {
            sqlx::query(*statement)
                .execute(&mut *tx)
                .await
                .map_err(|source| StoreError::Migration {
                    version: migration.version,
                    source,
                })?;
        }

        sqlx::query("INSERT INTO _migrations (version, description) VALUES (?, ?)")
            .bind(migration.version)
            .bind(migration.description)
            .execute(&mut *tx)
            .await
            .map_err(|source| StoreError::Migration {
                version: migration.version,
                source,
            })?;

        tx.commit().await.map_err(StoreError::Commit)?;

        info!(
            version = migration.version,
            description = migration.description,
            "Applied migration"
        );

        Ok(true)
    }

    /// Latest applied version, `None` on an empty database
    pub async fn current_version(&self) -> Result<Option<i64>, StoreError> {
        self.ensure_migrations_table().await?;

        sqlx::query_scalar("SELECT MAX(version) FROM _migrations")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::query("failed to get the migration version", e))
    }
}

/// Schema for users and tokens
pub fn schema_migrations() -> Vec<Migration> {
    vec![
        Migration::new(
            1,
            "Create users table",
            vec![
                r#"
                CREATE TABLE IF NOT EXISTS users (
                    id TEXT PRIMARY KEY,
                    email TEXT NOT NULL UNIQUE,
                    name TEXT NOT NULL,
                    password BLOB NOT NULL,
                    salt BLOB NOT NULL,
                    verified_at INTEGER NOT NULL DEFAULT 0
                )
                "#,
            ],
        ),
        Migration::new(
            2,
            "Create tokens table",
            vec![
                r#"
                CREATE TABLE IF NOT EXISTS tokens (
                    token TEXT PRIMARY KEY,
                    type TEXT NOT NULL,
                    email TEXT NOT NULL,
                    expires_at INTEGER NOT NULL
                )
                "#,
                "CREATE INDEX IF NOT EXISTS idx_tokens_email_type ON tokens(email, type)",
                "CREATE INDEX IF NOT EXISTS idx_tokens_expires_at ON tokens(expires_at)",
            ],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn memory_pool() -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .unwrap()
    }

    #[test]
    fn test_schema_migrations_order() {
        let migrations = schema_migrations();

        assert!(!migrations.is_empty());
        for pair in migrations.windows(2) {
            assert!(pair[1].version > pair[0].version);
        }
        for migration in &migrations {
            assert!(!migration.statements.is_empty());
        }
    }

    #[tokio::test]
    async fn test_run_is_idempotent() {
        let migrator = Migrator::new(memory_pool().await);
        let migrations = schema_migrations();

        assert_eq!(migrator.current_version().await.unwrap(), None);

        let first = migrator.run(&migrations).await.unwrap();
        assert_eq!(first, migrations.len());

        let second = migrator.run(&migrations).await.unwrap();
        assert_eq!(second, 0);

        assert_eq!(migrator.current_version().await.unwrap(), Some(2));
    }

    #[tokio::test]
    async fn test_failed_migration_is_not_recorded() {
        let migrator = Migrator::new(memory_pool().await);
        let broken = vec![Migration::new(
            7,
            "Broken",
            vec!["CREATE TABLE ok_table (id INTEGER)", "NOT VALID SQL"],
        )];

        let result = migrator.run(&broken).await;
        assert!(matches!(result, Err(StoreError::Migration { version: 7, .. })));
        assert_eq!(migrator.current_version().await.unwrap(), None);
    }
}
