//! Battlelog polling
//!
//! Pulls a player's recent matches from the game API and stores whatever
//! is newer than the most recent record already on disk. An upstream
//! failure or empty battlelog is "nothing to track", never an error —
//! the next poll simply catches up.

use super::match_store::{MatchStore, MatchStoreError};
use crate::api_client::ApiClient;

/// Fetch and store new raw records for one player. Returns how many were
/// inserted.
pub async fn track_recent_matches(
    api: &ApiClient,
    store: &MatchStore,
    player_tag: &str,
) -> Result<usize, MatchStoreError> {
    let recent = match api.recent_matches(player_tag).await {
        Ok(matches) => matches,
        Err(e) => {
            log::warn!("⚠️ battlelog fetch failed for {}: {}", player_tag, e);
            return Ok(0);
        }
    };

    if recent.is_empty() {
        log::debug!("{}: empty battlelog", player_tag);
        return Ok(0);
    }

    // Battle times are lexicographically ordered timestamps; anything at
    // or before the stored high-water mark is already tracked.
    let most_recent = store.most_recent_battle_time(player_tag)?;
    let fresh: Vec<_> = recent
        .into_iter()
        .filter(|raw| {
            most_recent
                .as_deref()
                .map_or(true, |seen| raw.battle_time.as_str() > seen)
        })
        .collect();

    if fresh.is_empty() {
        log::debug!("{}: no new matches", player_tag);
        return Ok(0);
    }

    let inserted = store.insert_matches(player_tag, &fresh)?;
    log::info!("📥 {}: {} new matches tracked", player_tag, inserted);
    Ok(inserted)
}
