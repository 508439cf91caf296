//! Game API client
//!
//! Fetches player battlelogs from the official REST API. Player tags are
//! URL-encoded with their leading `#` (`%23`). The API key is bound to a
//! caller IP upstream, so auth failures here usually mean the key/IP pair
//! is stale rather than the token being wrong.

use crate::match_core::raw::RawMatch;
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://api.brawlstars.com/v1";

#[derive(Debug)]
pub enum ApiError {
    Http(reqwest::Error),
    Status(u16),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Http(err)
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::Http(e) => write!(f, "HTTP error: {}", e),
            ApiError::Status(code) => write!(f, "API returned status {}", code),
        }
    }
}

impl std::error::Error for ApiError {}

#[derive(Debug, Deserialize)]
struct BattlelogResponse {
    #[serde(default)]
    items: Vec<RawMatch>,
}

pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    /// Recent matches for a player, newest first (API order).
    pub async fn recent_matches(&self, player_tag: &str) -> Result<Vec<RawMatch>, ApiError> {
        let tag = player_tag.trim_start_matches('#');
        let url = format!("{}/players/%23{}/battlelog", self.base_url, tag);

        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.token))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ApiError::Status(response.status().as_u16()));
        }

        let body: BattlelogResponse = response.json().await?;
        Ok(body.items)
    }
}
