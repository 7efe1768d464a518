use std::time::Duration;

use anyhow::{Context, Result};

#[derive(Clone, Debug)]
pub struct ServiceConfig {
    pub database_url: String,
    pub redis_url: String,
    pub http_addr: String,
}

impl ServiceConfig {
    pub fn from_env(default_http_addr: &str) -> Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is required")?;
        let redis_url = std::env::var("REDIS_URL").context("REDIS_URL is required")?;
        let http_addr =
            std::env::var("HTTP_ADDR").unwrap_or_else(|_| default_http_addr.to_string());

        Ok(Self {
            database_url,
            redis_url,
            http_addr,
        })
    }

    pub fn worker_from_env() -> Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is required")?;
        let redis_url = std::env::var("REDIS_URL").context("REDIS_URL is required")?;

        Ok(Self {
            database_url,
            redis_url,
            http_addr: String::new(),
        })
    }
}

/// Settings for talking to the ledger REST API.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub base_url: String,
    pub bearer_token: Option<String>,
    pub timeout: Duration,
}

impl ClientConfig {
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            bearer_token: None,
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn from_env() -> Result<Self> {
        let base_url = std::env::var("LEDGER_API_URL").context("LEDGER_API_URL is required")?;
        let bearer_token = std::env::var("LEDGER_API_TOKEN")
            .ok()
            .filter(|token| !token.trim().is_empty());
        let timeout_secs = match std::env::var("LEDGER_API_TIMEOUT_SECS") {
            Ok(raw) => raw
                .trim()
                .parse::<u64>()
                .context("LEDGER_API_TIMEOUT_SECS must be a whole number of seconds")?,
            Err(_) => Self::DEFAULT_TIMEOUT_SECS,
        };

        Ok(Self {
            bearer_token,
            timeout: Duration::from_secs(timeout_secs),
            ..Self::new(base_url)
        })
    }
}
