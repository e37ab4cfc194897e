use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::warn;

const DEV_SECRET: &str = "dev-secret-change-me";

/// Used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "circulo=debug,circulo_api=debug,circulo_db=info,tower_http=debug";

pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub secret: String,
    pub session_days: i64,
    pub feed_limit: u32,
    pub secure_cookies: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let secret = get("CIRCULO_SECRET").unwrap_or_else(|| DEV_SECRET.into());
        if secret == DEV_SECRET {
            warn!("CIRCULO_SECRET is unset; using the development secret");
        }

        Ok(Self {
            host: get("CIRCULO_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: parse(&get, "CIRCULO_PORT", 8000)?,
            db_path: get("CIRCULO_DB_PATH")
                .unwrap_or_else(|| "circulo.db".into())
                .into(),
            secret,
            session_days: parse(&get, "CIRCULO_SESSION_DAYS", 14)?,
            feed_limit: parse(&get, "CIRCULO_FEED_LIMIT", 100)?,
            secure_cookies: parse(&get, "CIRCULO_SECURE_COOKIES", false)?,
        })
    }

    pub fn addr(&self) -> Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }
}

fn parse<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid value for {key}: {raw:?}")),
        None => Ok(default),
    }
}
