use crate::api_client::DEFAULT_API_URL;
use std::env;

/// Configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// SQLite database file shared by raw matches and the trie.
    pub database_path: String,
    pub api_url: String,
    /// Required only by the tracker; the compiler runs offline.
    pub api_token: Option<String>,
    pub rust_log: Option<String>,
}

#[derive(Debug)]
pub enum ConfigError {
    MissingVariable(String),
    InvalidValue(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::MissingVariable(var) => write!(f, "Missing environment variable: {}", var),
            ConfigError::InvalidValue(msg) => write!(f, "Invalid configuration value: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

impl RuntimeConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_path =
            env::var("DATABASE_PATH").unwrap_or_else(|_| "brawlflow.db".to_string());

        let api_url = env::var("BRAWL_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        if !api_url.starts_with("http://") && !api_url.starts_with("https://") {
            return Err(ConfigError::InvalidValue(
                "BRAWL_API_URL must start with http:// or https://".to_string(),
            ));
        }

        let api_token = env::var("BRAWL_API_TOKEN").ok();
        let rust_log = env::var("RUST_LOG").ok();

        Ok(Self {
            database_path,
            api_url,
            api_token,
            rust_log,
        })
    }

    pub fn require_api_token(&self) -> Result<&str, ConfigError> {
        self.api_token
            .as_deref()
            .ok_or_else(|| ConfigError::MissingVariable("BRAWL_API_TOKEN".to_string()))
    }
}
