use std::{env, net::SocketAddr};

use thiserror::Error;
use url::Url;

pub const DEFAULT_TERMINOLOGY_SERVER_URL: &str = "https://tx.fhir.org/r4";

#[derive(Debug, Clone)]
pub struct Config {
    pub api_token: Option<String>,
    pub bind_addr: String,
    pub bind_port: u16,
    pub terminology: TerminologyConfig,
}

/// Connection settings for the remote FHIR terminology server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminologyConfig {
    pub base_url: String,
}

impl TerminologyConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

impl Default for TerminologyConfig {
    fn default() -> Self {
        Self::new(DEFAULT_TERMINOLOGY_SERVER_URL)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("BIND_PORT must be a valid u16")]
    InvalidPort,
    #[error("invalid bind address or port")]
    InvalidSocket,
    #[error("TERMINOLOGY_SERVER_URL must be an absolute http(s) URL")]
    InvalidTerminologyUrl,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_token = lookup("MCP_API_TOKEN")
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty());

        let bind_addr = lookup("BIND_ADDR").unwrap_or_else(|| "127.0.0.1".to_string());
        let bind_port = lookup("BIND_PORT")
            .map(|value| value.parse::<u16>().map_err(|_| ConfigError::InvalidPort))
            .transpose()?
            .unwrap_or(8080);

        let terminology = lookup("TERMINOLOGY_SERVER_URL")
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .map(|value| {
                let parsed = Url::parse(&value).map_err(|_| ConfigError::InvalidTerminologyUrl)?;
                if !matches!(parsed.scheme(), "http" | "https") {
                    return Err(ConfigError::InvalidTerminologyUrl);
                }
                Ok(TerminologyConfig::new(value))
            })
            .transpose()?
            .unwrap_or_default();

        let config = Self {
            api_token,
            bind_addr,
            bind_port,
            terminology,
        };

        let _ = config.bind_socket()?;
        Ok(config)
    }

    pub fn bind_socket(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.bind_addr, self.bind_port)
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::InvalidSocket)
    }
}
