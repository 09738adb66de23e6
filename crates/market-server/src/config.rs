use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use tracing::warn;

const DEV_JWT_SECRET: &str = "dev-secret-change-me";

/// Runtime settings, read from the environment (and `.env` if present).
#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub password_scheme: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let host = var("MARKET_HOST", "0.0.0.0");
        let port: u16 = var("MARKET_PORT", "8080")
            .parse()
            .context("MARKET_PORT must be a port number")?;
        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", host, port))?;

        let jwt_secret = match lookup("MARKET_JWT_SECRET") {
            Some(secret) if !secret.is_empty() => secret,
            _ => {
                warn!("MARKET_JWT_SECRET not set, using the development secret");
                DEV_JWT_SECRET.to_string()
            }
        };

        let token_ttl_hours: i64 = var("MARKET_TOKEN_TTL_HOURS", "24")
            .parse()
            .context("MARKET_TOKEN_TTL_HOURS must be an integer")?;
        if token_ttl_hours <= 0 {
            bail!("MARKET_TOKEN_TTL_HOURS must be positive");
        }

        Ok(Self {
            addr,
            db_path: PathBuf::from(var("MARKET_DB_PATH", "market.db")),
            jwt_secret,
            token_ttl_hours,
            password_scheme: var("MARKET_PASSWORD_SCHEME", "argon2"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let config = config(&[]).unwrap();
        assert_eq!(config.addr, "0.0.0.0:8080".parse::<SocketAddr>().unwrap());
        assert_eq!(config.db_path, PathBuf::from("market.db"));
        assert_eq!(config.jwt_secret, DEV_JWT_SECRET);
        assert_eq!(config.token_ttl_hours, 24);
        assert_eq!(config.password_scheme, "argon2");
    }

    #[test]
    fn overrides() {
        let config = config(&[
            ("MARKET_HOST", "127.0.0.1"),
            ("MARKET_PORT", "9000"),
            ("MARKET_JWT_SECRET", "s3cret"),
            ("MARKET_PASSWORD_SCHEME", "plaintext"),
        ])
        .unwrap();
        assert_eq!(config.addr, "127.0.0.1:9000".parse::<SocketAddr>().unwrap());
        assert_eq!(config.jwt_secret, "s3cret");
        assert_eq!(config.password_scheme, "plaintext");
    }

    #[test]
    fn rejects_bad_numbers() {
        assert!(config(&[("MARKET_PORT", "eighty")]).is_err());
        assert!(config(&[("MARKET_TOKEN_TTL_HOURS", "0")]).is_err());
    }
}
