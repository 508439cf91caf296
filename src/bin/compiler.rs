//! Batch stats compiler
//!
//! Folds every tracked player's uncached matches into their lifetime
//! trie. Safe to re-run at any time: already-folded records are skipped
//! via the stats_cached flag.

use brawlflow::config::RuntimeConfig;
use brawlflow::pipeline::{MatchStore, StatsCompiler};
use brawlflow::trie_core::SqliteTrieStore;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = RuntimeConfig::from_env()?;

    log::info!("🚀 Starting stats compiler");
    log::info!("   Database: {}", config.database_path);

    let matches = Arc::new(MatchStore::open(&config.database_path)?);
    let store = Arc::new(SqliteTrieStore::open(&config.database_path)?);
    let overrides = matches.mode_overrides();
    let compiler = StatsCompiler::new(matches.clone(), store, overrides);

    let tags = matches.player_tags()?;
    log::info!("📊 {} tracked players", tags.len());

    let started = std::time::Instant::now();
    let mut compiled = 0usize;
    let mut failed = 0usize;

    for tag in &tags {
        match compiler.compile_player(tag).await {
            Ok(report) => {
                compiled += report.matches_compiled;
                failed += report.update.failed;
            }
            Err(e) => {
                log::error!("❌ {}: {}", tag, e);
            }
        }
    }

    log::info!(
        "✅ Compile pass finished: {} matches folded, {} path failures, {:.1}s",
        compiled,
        failed,
        started.elapsed().as_secs_f64()
    );
    Ok(())
}
