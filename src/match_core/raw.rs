//! Raw battlelog records as returned by the game API
//!
//! Field names follow the public API's camelCase wire format. Only the
//! fields the decoder consumes are modeled; anything else is ignored on
//! parse.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMatch {
    pub battle_time: String,
    #[serde(default)]
    pub event: RawEvent,
    pub battle: RawBattle,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawEvent {
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub map: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawBattle {
    #[serde(default)]
    pub mode: Option<String>,
    /// Queue type, e.g. "ranked" or "soloRanked".
    #[serde(rename = "type", default)]
    pub battle_type: Option<String>,
    /// "victory", "defeat" or "draw" for team-based shapes.
    #[serde(default)]
    pub result: Option<String>,
    /// Final placement; present only for elimination-style matches.
    #[serde(default)]
    pub rank: Option<u32>,
    #[serde(default)]
    pub duration: Option<u32>,
    #[serde(default)]
    pub trophy_change: Option<i64>,
    #[serde(default)]
    pub star_player: Option<RawPlayer>,
    #[serde(default)]
    pub teams: Option<Vec<Vec<RawPlayer>>>,
    #[serde(default)]
    pub players: Option<Vec<RawPlayer>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawPlayer {
    pub tag: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub brawler: Option<RawBrawler>,
    /// Multi-brawler shapes (duels) list every brawler the player used.
    #[serde(default)]
    pub brawlers: Option<Vec<RawBrawler>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawBrawler {
    pub name: String,
    /// Trophy count, or rank points in ranked queues.
    #[serde(default)]
    pub trophies: Option<i64>,
    #[serde(default)]
    pub trophy_change: Option<i64>,
}
