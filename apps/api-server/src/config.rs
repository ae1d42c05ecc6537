//! Application configuration loaded from environment variables.

use std::env;

use postflow_infra::database::DatabaseConfig;
use postflow_infra::{BitlyConfig, JwtConfig};

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// Base of the canonical post URLs handed to the link shortener.
    pub public_base_url: String,
    pub database: Option<DatabaseConfig>,
    /// Selects the Redis job queue when set.
    pub redis_url: Option<String>,
    pub jwt: JwtConfig,
    pub bitly: BitlyConfig,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);
        let public_base_url =
            env::var("PUBLIC_BASE_URL").unwrap_or_else(|_| format!("http://{}:{}", host, port));

        Self {
            host,
            port,
            public_base_url,
            database: DatabaseConfig::from_env(),
            redis_url: env::var("REDIS_URL").ok().filter(|u| !u.is_empty()),
            jwt: JwtConfig::from_env(),
            bitly: BitlyConfig::from_env(),
        }
    }
}
