//! Normalized match outcomes produced by the decoder

use serde::{Deserialize, Serialize};

/// How one participant's match ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchResult {
    Win,
    Loss,
    Draw,
}

/// Queue classification carried as the leading path segment.
///
/// `LegendaryOrHigher` is an extra tag emitted alongside `Ranked` for
/// high-rank lobbies; it never appears on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchType {
    Regular,
    Ranked,
    LegendaryOrHigher,
}

impl MatchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchType::Regular => "regular",
            MatchType::Ranked => "ranked",
            MatchType::LegendaryOrHigher => "legendaryOrHigher",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "regular" => Some(MatchType::Regular),
            "ranked" => Some(MatchType::Ranked),
            "legendaryOrHigher" => Some(MatchType::LegendaryOrHigher),
            _ => None,
        }
    }

    /// The fixed set the reader iterates when the match type is unbound.
    pub fn known() -> [MatchType; 2] {
        [MatchType::Regular, MatchType::Ranked]
    }
}

/// Whether aggregates are being built for one subject or for everyone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Player,
    Global,
}

impl Scope {
    pub fn is_global(&self) -> bool {
        matches!(self, Scope::Global)
    }
}

/// One of the four path dimensions, used as an explicit accessor key
/// instead of reflective field lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attribute {
    MatchType,
    Mode,
    Map,
    Brawler,
}

impl Attribute {
    pub fn as_str(&self) -> &'static str {
        match self {
            Attribute::MatchType => "type",
            Attribute::Mode => "mode",
            Attribute::Map => "map",
            Attribute::Brawler => "brawler",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "type" => Some(Attribute::MatchType),
            "mode" => Some(Attribute::Mode),
            "map" => Some(Attribute::Map),
            "brawler" => Some(Attribute::Brawler),
            _ => None,
        }
    }
}

/// One participant's result in one match, decomposed per brawler and
/// match-type tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchOutcome {
    pub map: String,
    pub mode: String,
    pub brawler: String,
    pub result: MatchResult,
    pub is_star_player: bool,
    pub star_player_exists: bool,
    pub duration_secs: Option<u32>,
    pub trophy_change: i64,
    pub match_type: MatchType,
}

impl MatchOutcome {
    /// Map falls back to a sentinel so path strings stay well-formed.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        map: Option<String>,
        mode: String,
        brawler: String,
        result: MatchResult,
        is_star_player: bool,
        star_player_exists: bool,
        duration_secs: Option<u32>,
        trophy_change: i64,
        match_type: MatchType,
    ) -> Self {
        Self {
            map: map.unwrap_or_else(|| "unknown".to_string()),
            mode,
            brawler,
            result,
            is_star_player,
            star_player_exists,
            duration_secs,
            trophy_change,
            match_type,
        }
    }

    /// Path-segment value for a dimension.
    pub fn segment(&self, attribute: Attribute) -> &str {
        match attribute {
            Attribute::MatchType => self.match_type.as_str(),
            Attribute::Mode => &self.mode,
            Attribute::Map => &self.map,
            Attribute::Brawler => &self.brawler,
        }
    }
}
