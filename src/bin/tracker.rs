//! Battlelog tracker
//!
//! Polls the game API once for every tracked player and stores any new
//! raw match records as uncached. Pair with the compiler binary (cron or
//! back-to-back) to keep aggregates current.

use brawlflow::api_client::ApiClient;
use brawlflow::config::RuntimeConfig;
use brawlflow::pipeline::{track_recent_matches, MatchStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = RuntimeConfig::from_env()?;
    let token = config.require_api_token()?;

    log::info!("🚀 Starting battlelog tracker");
    log::info!("   Database: {}", config.database_path);
    log::info!("   API: {}", config.api_url);

    let store = MatchStore::open(&config.database_path)?;
    let api = ApiClient::new(&config.api_url, token)?;

    let tags = store.player_tags()?;
    log::info!("📊 {} tracked players", tags.len());

    let mut total = 0usize;
    for tag in &tags {
        total += track_recent_matches(&api, &store, tag).await?;
    }

    log::info!("✅ Tracking pass finished: {} new matches", total);
    Ok(())
}
