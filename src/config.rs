use std::{env, fmt, time::Duration};

use thiserror::Error;

pub const MCP_ENDPOINT_PATH: &str =
    "/api/method/frappe_assistant_core.api.fac_endpoint.handle_mcp";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_MAX_WORKERS: usize = 5;
pub const MAX_WORKERS_LIMIT: usize = 1024;

#[derive(Clone)]
pub struct Config {
    pub server_url: String,
    pub api_key: String,
    pub api_secret: String,
    pub timeout: Duration,
    pub debug: bool,
    pub max_workers: usize,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("FRAPPE_SERVER_URL environment variable is required")]
    MissingServerUrl,
    #[error("FRAPPE_API_KEY and FRAPPE_API_SECRET are required")]
    MissingCredentials,
    #[error("MCP_TIMEOUT must be a positive number of seconds")]
    InvalidTimeout,
    #[error("MCP_MAX_WORKERS must be an integer between 1 and 1024")]
    InvalidWorkers,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let server_url = non_empty_var("FRAPPE_SERVER_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
            .ok_or(ConfigError::MissingServerUrl)?;

        let (api_key, api_secret) =
            match (non_empty_var("FRAPPE_API_KEY"), non_empty_var("FRAPPE_API_SECRET")) {
                (Some(key), Some(secret)) => (key, secret),
                _ => return Err(ConfigError::MissingCredentials),
            };

        let timeout_secs = parse_positive("MCP_TIMEOUT", ConfigError::InvalidTimeout)?
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        let max_workers = match parse_positive("MCP_MAX_WORKERS", ConfigError::InvalidWorkers)? {
            None => DEFAULT_MAX_WORKERS,
            Some(workers) => usize::try_from(workers)
                .ok()
                .filter(|workers| *workers <= MAX_WORKERS_LIMIT)
                .ok_or(ConfigError::InvalidWorkers)?,
        };
        let debug = env::var("MCP_DEBUG").map(|value| value == "1").unwrap_or(false);

        Ok(Self {
            server_url,
            api_key,
            api_secret,
            timeout: Duration::from_secs(timeout_secs),
            debug,
            max_workers,
        })
    }

    pub fn endpoint_url(&self) -> String {
        format!("{}{}", self.server_url, MCP_ENDPOINT_PATH)
    }

    pub fn authorization_header(&self) -> String {
        format!("token {}:{}", self.api_key, self.api_secret)
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("server_url", &self.server_url)
            .field("api_key", &self.api_key)
            .field("api_secret", &"[REDACTED]")
            .field("timeout", &self.timeout)
            .field("debug", &self.debug)
            .field("max_workers", &self.max_workers)
            .finish()
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_positive(name: &str, error: ConfigError) -> Result<Option<u64>, ConfigError> {
    match non_empty_var(name) {
        None => Ok(None),
        Some(value) => match value.parse::<u64>() {
            Ok(parsed) if parsed > 0 => Ok(Some(parsed)),
            _ => Err(error),
        },
    }
}
