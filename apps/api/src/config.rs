use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use uuid::Uuid;

use crate::upload::UploadMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub store_backend: StoreBackend,
    /// Required when `store_backend` is Postgres.
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub port: u16,
    pub rust_log: String,
    pub upload_mode: UploadMode,
    /// JSON fixture loaded into the memory backend.
    pub memory_seed: Option<PathBuf>,
    /// Bearer tokens accepted by the memory backend, `token:user-uuid` pairs.
    pub dev_auth_tokens: Vec<(String, Uuid)>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let store_backend = parse_backend(&optional_env("STORE_BACKEND").unwrap_or_default())?;
        let database_url = match store_backend {
            StoreBackend::Postgres => Some(require_env("DATABASE_URL")?),
            StoreBackend::Memory => optional_env("DATABASE_URL"),
        };
        let upload_root = optional_env("UPLOAD_DIR").unwrap_or_else(|| "uploads".to_string());

        Ok(Config {
            store_backend,
            database_url,
            database_max_connections: optional_env("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|| "10".to_string())
                .parse::<u32>()
                .context("DATABASE_MAX_CONNECTIONS must be a positive integer")?,
            port: optional_env("PORT")
                .unwrap_or_else(|| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: optional_env("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            upload_mode: UploadMode::detect(optional_env, PathBuf::from(upload_root)),
            memory_seed: optional_env("MEMORY_SEED").map(PathBuf::from),
            dev_auth_tokens: parse_dev_tokens(&optional_env("DEV_AUTH_TOKENS").unwrap_or_default())?,
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn parse_backend(raw: &str) -> Result<StoreBackend> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "" | "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
        "memory" => Ok(StoreBackend::Memory),
        other => bail!("STORE_BACKEND must be 'postgres' or 'memory', got '{other}'"),
    }
}

fn parse_dev_tokens(raw: &str) -> Result<Vec<(String, Uuid)>> {
    raw.split(',')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (token, user) = pair
                .split_once(':')
                .with_context(|| format!("DEV_AUTH_TOKENS entry '{pair}' is not token:user-id"))?;
            let user = user
                .trim()
                .parse::<Uuid>()
                .with_context(|| format!("DEV_AUTH_TOKENS entry '{pair}' has an invalid user id"))?;
            Ok((token.trim().to_string(), user))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_backend() {
        assert_eq!(parse_backend("").unwrap(), StoreBackend::Postgres);
        assert_eq!(parse_backend("Memory").unwrap(), StoreBackend::Memory);
        assert!(parse_backend("mongo").is_err());
    }

    #[test]
    fn test_parse_dev_tokens() {
        let user = Uuid::new_v4();
        let tokens = parse_dev_tokens(&format!("abc:{user}, ,def:{user}")).unwrap();
        assert_eq!(tokens, vec![("abc".to_string(), user), ("def".to_string(), user)]);
        assert!(parse_dev_tokens("abc").is_err());
        assert!(parse_dev_tokens("abc:not-a-uuid").is_err());
        assert!(parse_dev_tokens("").unwrap().is_empty());
    }
}
