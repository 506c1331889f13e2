use anyhow::{bail, Context};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::allocator::{CodePolicy, MAX_CODE_LENGTH, MIN_CODE_LENGTH};

#[derive(Debug, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub api_server: ServerConfig,
    /// Prefix joined with a short code to form `short_url`
    pub base_url: String,
    pub codes: CodeConfig,
    pub cache: CacheConfig,
    pub redirect_status: RedirectMode,
    /// Return the existing link when the same URL is shortened again
    pub deduplicate_urls: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub backend: DatabaseBackend,
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    Memory,
    Sqlite,
    Postgres,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct CodeConfig {
    pub policy: CodePolicy,
    pub length: usize,
    /// Candidates tried per create before giving up
    pub max_attempts: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// 0 disables the lookup cache
    pub max_entries: u64,
    pub ttl_secs: u64,
}

/// HTTP status used when redirecting a short code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RedirectMode {
    MovedPermanently,
    #[default]
    Found,
    TemporaryRedirect,
    PermanentRedirect,
}

impl RedirectMode {
    pub fn status_code(self) -> StatusCode {
        match self {
            RedirectMode::MovedPermanently => StatusCode::MOVED_PERMANENTLY,
            RedirectMode::Found => StatusCode::FOUND,
            RedirectMode::TemporaryRedirect => StatusCode::TEMPORARY_REDIRECT,
            RedirectMode::PermanentRedirect => StatusCode::PERMANENT_REDIRECT,
        }
    }
}

impl FromStr for RedirectMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "301" => Ok(RedirectMode::MovedPermanently),
            "302" => Ok(RedirectMode::Found),
            "307" => Ok(RedirectMode::TemporaryRedirect),
            "308" => Ok(RedirectMode::PermanentRedirect),
            other => bail!("unsupported REDIRECT_STATUS '{other}', expected 301, 302, 307 or 308"),
        }
    }
}

impl CacheConfig {
    const fn default_max_entries() -> u64 {
        10_000
    }

    const fn default_ttl_secs() -> u64 {
        300
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: Self::default_max_entries(),
            ttl_secs: Self::default_ttl_secs(),
        }
    }
}

impl Default for CodeConfig {
    fn default() -> Self {
        Self {
            policy: CodePolicy::Random,
            length: 7,
            max_attempts: 5,
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T>(key: &str, default: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw = env_or(key, default);
    raw.trim()
        .parse::<T>()
        .with_context(|| format!("{key} has invalid value '{raw}'"))
}

fn parse_flag(key: &str) -> bool {
    std::env::var(key)
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(false)
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let backend_str = env_or("DATABASE_BACKEND", "sqlite");
        let backend = match backend_str.to_lowercase().as_str() {
            "postgres" | "postgresql" => DatabaseBackend::Postgres,
            "memory" | "in-memory" => DatabaseBackend::Memory,
            "sqlite" => DatabaseBackend::Sqlite,
            other => {
                tracing::warn!(
                    "Unknown DATABASE_BACKEND '{other}', falling back to 'sqlite'. Supported values: memory, sqlite, postgres"
                );
                DatabaseBackend::Sqlite
            }
        };

        let database_url = env_or("DATABASE_URL", "sqlite://./snipper.db");
        let max_connections = parse_env::<u32>("DATABASE_MAX_CONNECTIONS", "5")?;

        let api_host = env_or("API_HOST", "127.0.0.1");
        let api_port = parse_env::<u16>("API_PORT", "8000")?;

        let base_url = env_or("BASE_URL", &format!("http://localhost:{api_port}"))
            .trim_end_matches('/')
            .to_string();

        let policy = env_or("CODE_POLICY", "random").parse::<CodePolicy>()?;
        let codes = CodeConfig {
            policy,
            length: parse_env::<usize>("CODE_LENGTH", "7")?,
            max_attempts: parse_env::<u32>("CODE_MAX_ATTEMPTS", "5")?,
        };

        let cache = CacheConfig {
            max_entries: parse_env::<u64>(
                "CACHE_MAX_ENTRIES",
                &CacheConfig::default_max_entries().to_string(),
            )?,
            ttl_secs: parse_env::<u64>(
                "CACHE_TTL_SECS",
                &CacheConfig::default_ttl_secs().to_string(),
            )?,
        };

        let redirect_status = env_or("REDIRECT_STATUS", "302").parse::<RedirectMode>()?;

        let config = Config {
            database: DatabaseConfig {
                backend,
                url: database_url,
                max_connections,
            },
            api_server: ServerConfig {
                host: api_host,
                port: api_port,
            },
            base_url,
            codes,
            cache,
            redirect_status,
            deduplicate_urls: parse_flag("DEDUPLICATE_URLS"),
        };
        config.validate()?;

        Ok(config)
    }

    /// Reject combinations the service cannot run with
    pub fn validate(&self) -> anyhow::Result<()> {
        if !(MIN_CODE_LENGTH..=MAX_CODE_LENGTH).contains(&self.codes.length) {
            bail!(
                "CODE_LENGTH must be between {MIN_CODE_LENGTH} and {MAX_CODE_LENGTH}, got {}",
                self.codes.length
            );
        }
        if self.codes.max_attempts == 0 {
            bail!("CODE_MAX_ATTEMPTS must be at least 1");
        }
        if self.database.max_connections == 0 {
            bail!("DATABASE_MAX_CONNECTIONS must be at least 1");
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            bail!("BASE_URL must start with http:// or https://");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Config {
        Config {
            database: DatabaseConfig {
                backend: DatabaseBackend::Memory,
                url: String::new(),
                max_connections: 1,
            },
            api_server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8000,
            },
            base_url: "http://localhost:8000".to_string(),
            codes: CodeConfig::default(),
            cache: CacheConfig::default(),
            redirect_status: RedirectMode::default(),
            deduplicate_urls: false,
        }
    }

    #[test]
    fn test_defaults_validate() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn test_code_length_bounds() {
        let mut config = sample();
        config.codes.length = 3;
        assert!(config.validate().is_err());
        config.codes.length = 11;
        assert!(config.validate().is_err());
        config.codes.length = 10;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let mut config = sample();
        config.codes.max_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_redirect_mode_parsing() {
        assert_eq!(
            "301".parse::<RedirectMode>().unwrap().status_code(),
            StatusCode::MOVED_PERMANENTLY
        );
        assert_eq!(RedirectMode::default().status_code(), StatusCode::FOUND);
        assert!("200".parse::<RedirectMode>().is_err());
    }
}
