//! Settings loaded from the environment (and `.env` when present).
//!
//! Every value has a default suitable for local development.

use std::{env, fmt::Display, net::SocketAddr, path::PathBuf, str::FromStr, time::Duration};

use anyhow::{anyhow, Context, Result};
use tracing::{info, warn};

const DEV_JWT_SECRET: &str = "yatube-development-secret";

#[derive(Clone)]
pub struct Config {
    /// Env: `SERVER_HOST`, default `127.0.0.1`
    pub host: String,
    /// Env: `SERVER_PORT`, default `3001`
    pub port: u16,
    /// Env: `DATABASE_URL`, default `sqlite://yatube.db`
    pub database_url: String,
    /// Env: `JWT_SECRET`
    pub jwt_secret: String,
    /// Uploaded images live under `<media_root>/posts/`.
    /// Env: `MEDIA_ROOT`, default `media`
    pub media_root: PathBuf,
    /// Env: `POSTS_PER_PAGE`, default `10`
    pub posts_per_page: i64,
    /// Expiry of the cached home page.
    /// Env: `INDEX_CACHE_SECONDS`, default `20`
    pub index_cache_ttl: Duration,
    /// Env: `SESSION_DAYS`, default `14`
    pub session_lifetime: time::Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let jwt_secret = env::var("JWT_SECRET").unwrap_or_else(|_| {
            warn!("JWT_SECRET not set, using the development secret");
            DEV_JWT_SECRET.to_string()
        });

        Ok(Self {
            host: try_load("SERVER_HOST", "127.0.0.1")?,
            port: try_load("SERVER_PORT", "3001")?,
            database_url: try_load("DATABASE_URL", "sqlite://yatube.db")?,
            jwt_secret,
            media_root: try_load("MEDIA_ROOT", "media")?,
            posts_per_page: try_load("POSTS_PER_PAGE", "10")?,
            index_cache_ttl: Duration::from_secs(try_load("INDEX_CACHE_SECONDS", "20")?),
            session_lifetime: time::Duration::days(try_load("SESSION_DAYS", "14")?),
        })
    }

    pub fn address(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("Invalid listen address {}:{}", self.host, self.port))
    }
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T>
where
    T::Err: Display,
{
    let value = env::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });
    value
        .parse()
        .map_err(|e| anyhow!("Invalid {key} value {value:?}: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_load_parses_default() {
        let value: u16 = try_load("YATUBE_TEST_UNSET_PORT", "8080").unwrap();
        assert_eq!(value, 8080);
    }

    #[test]
    fn test_try_load_rejects_garbage() {
        let result: Result<u16> = try_load("YATUBE_TEST_UNSET_PORT", "not-a-port");
        assert!(result.is_err());
    }
}
