//! Layered application configuration

mod app_config;

pub use app_config::{
    AppConfig, CacheSettings, DatabaseConfig, LogFormat, LoggingConfig, ServerConfig,
    StorageSettings,
};
