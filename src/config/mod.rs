//! Layered application configuration

mod app_config;

pub use app_config::{
    AppConfig, CacheConfig, DatabaseConfig, HasherConfig, LogFormat, LoggingConfig, MailConfig,
    TokenConfig,
};
