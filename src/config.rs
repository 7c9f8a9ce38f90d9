//! Configuration management for Filedepot.
//!
//! Loads configuration from environment variables. The size ceiling and
//! extension allow-list are compile-time constants in the service layer;
//! only the bind address, database path and upload root come from the
//! environment.

use std::env;
use std::sync::OnceLock;

/// Global configuration instance
static CONFIG: OnceLock<Config> = OnceLock::new();

/// Get the global configuration
pub fn config() -> &'static Config {
    CONFIG.get_or_init(Config::from_env)
}

/// Initialize configuration (call once at startup)
pub fn init() -> &'static Config {
    config()
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub path: String,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Base directory under which all physical files are stored.
    pub upload_dir: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            server: ServerConfig {
                host: env_or("HOST", "0.0.0.0"),
                port: env_or("PORT", "8080").parse().expect("Invalid PORT"),
            },
            database: DatabaseConfig {
                path: env_or("DATABASE_PATH", "./data/filedepot.db"),
            },
            storage: StorageConfig {
                upload_dir: env_or("UPLOAD_DIR", "./data/uploads"),
            },
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}
