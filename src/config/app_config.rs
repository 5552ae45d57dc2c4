use serde::Deserialize;

/// Application configuration
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub hasher: HasherConfig,
    pub tokens: TokenConfig,
    pub cache: CacheConfig,
    pub mail: MailConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
    /// How long SQLite waits on a locked database before failing
    pub busy_timeout_secs: u64,
}

/// Argon2id cost parameters, fixed system-wide
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HasherConfig {
    pub time_cost: u32,
    pub memory_kib: u32,
    pub parallelism: u32,
    pub salt_length: usize,
    pub key_length: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TokenConfig {
    pub signup_ttl_secs: u64,
    pub reset_ttl_secs: u64,
    /// Random bytes per token before encoding
    pub token_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub max_capacity: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    /// Public host links in mails point at
    pub domain: String,
    pub from: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://authkeep.db".to_string(),
            max_connections: 5,
            min_connections: 1,
            acquire_timeout_secs: 30,
            busy_timeout_secs: 5,
        }
    }
}

impl Default for HasherConfig {
    fn default() -> Self {
        Self {
            time_cost: 4,
            memory_kib: 64 * 1024,
            parallelism: 4,
            salt_length: 32,
            key_length: 256,
        }
    }
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            signup_ttl_secs: 12 * 60 * 60,
            reset_ttl_secs: 60 * 60,
            token_bytes: 32,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: 10_000,
        }
    }
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            domain: "localhost:3000".to_string(),
            from: "no-reply@localhost".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("AUTHKEEP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
