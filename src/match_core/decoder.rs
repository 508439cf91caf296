//! Match decoding: raw battlelog records into normalized outcomes
//!
//! Dispatch is by record shape, not by declared mode:
//! - a `rank` field means elimination-style (showdown) scoring
//! - a resolved mode of "duels" means head-to-head multi-brawler scoring
//! - exactly two teams means standard team-vs-team scoring
//! - anything else is skipped (permissive — malformed input yields no
//!   outcomes rather than an error)

use super::mode_overrides::ModeOverrides;
use super::outcome::{MatchOutcome, MatchResult, MatchType, Scope};
use super::raw::{RawMatch, RawPlayer};

/// Queue type value the API uses for the competitive ranked ladder.
pub const RANKED_QUEUE_TYPE: &str = "soloRanked";

/// Trophy values in this band are rank points at Legendary tier or above
/// rather than real trophy counts. Band bounds are load-bearing; the
/// frontend keys off the resulting tag.
const LEGENDARY_BAND_MIN: i64 = 16;
const LEGENDARY_BAND_MAX: i64 = 22;

pub struct MatchDecoder {
    overrides: ModeOverrides,
    scope: Scope,
}

impl MatchDecoder {
    pub fn new(overrides: ModeOverrides, scope: Scope) -> Self {
        Self { overrides, scope }
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    /// Resolved mode for a record (override table first, see
    /// [`ModeOverrides::resolve`]).
    pub fn resolve_mode(&self, raw: &RawMatch) -> String {
        self.overrides.resolve(
            raw.event.map.as_deref(),
            raw.event.mode.as_deref(),
            raw.battle.mode.as_deref(),
        )
    }

    /// Decode one raw record into zero or more outcomes from the subject's
    /// perspective. Global scope emits outcomes for every relevant
    /// participant instead of just the subject.
    pub fn decode(&self, raw: &RawMatch, subject_tag: &str) -> Vec<MatchOutcome> {
        if raw.battle.rank.is_some() {
            self.decode_elimination(raw, subject_tag)
        } else if self.resolve_mode(raw) == "duels" {
            self.decode_duels(raw, subject_tag)
        } else {
            match &raw.battle.teams {
                Some(teams) if teams.len() == 2 => self.decode_standard(raw, subject_tag),
                _ => Vec::new(),
            }
        }
    }

    /// Mode and final placement for elimination records, used to maintain
    /// per-mode rank histograms alongside the trie.
    pub fn elimination_rank(&self, raw: &RawMatch) -> Option<(String, u32)> {
        raw.battle.rank.map(|rank| (self.resolve_mode(raw), rank))
    }

    fn decode_elimination(&self, raw: &RawMatch, subject_tag: &str) -> Vec<MatchOutcome> {
        let battle = &raw.battle;
        let rank = match battle.rank {
            Some(rank) => rank,
            None => return Vec::new(),
        };

        let participant_count = if let Some(players) = &battle.players {
            players.len()
        } else if let Some(teams) = &battle.teams {
            teams.len()
        } else {
            log::warn!("elimination record has no players or teams");
            return Vec::new();
        };

        // Top half of the lobby counts as a win; there are no draws.
        let result = if rank as usize <= participant_count / 2 {
            MatchResult::Win
        } else {
            MatchResult::Loss
        };
        let is_star_player = rank == 1;
        let mode = self.resolve_mode(raw);
        let match_type = base_match_type(battle.battle_type.as_deref());

        let credited = self.elimination_participants(raw, subject_tag);

        let mut outcomes = Vec::with_capacity(credited.len());
        for player in credited {
            let brawler = match &player.brawler {
                Some(brawler) => brawler.name.clone(),
                None => continue,
            };
            let trophy_change = match self.scope {
                Scope::Player => resolve_trophy_change(raw, subject_tag),
                Scope::Global => 0,
            };
            outcomes.push(MatchOutcome::new(
                raw.event.map.clone(),
                mode.clone(),
                brawler,
                result,
                is_star_player,
                true,
                None,
                trophy_change,
                match_type,
            ));
        }
        outcomes
    }

    /// The participants an elimination result is credited to: the subject
    /// alone in a flat lobby, or the subject's whole team in a team lobby
    /// (every teammate shares the placement).
    fn elimination_participants<'a>(
        &self,
        raw: &'a RawMatch,
        subject_tag: &str,
    ) -> Vec<&'a RawPlayer> {
        let battle = &raw.battle;
        if let Some(players) = &battle.players {
            players.iter().filter(|p| p.tag == subject_tag).collect()
        } else if let Some(teams) = &battle.teams {
            match teams.iter().find(|team| team.iter().any(|p| p.tag == subject_tag)) {
                Some(team) if self.scope.is_global() => team.iter().collect(),
                Some(team) => team.iter().filter(|p| p.tag == subject_tag).collect(),
                None => {
                    log::warn!("subject {} not found in any elimination team", subject_tag);
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        }
    }

    fn decode_duels(&self, raw: &RawMatch, subject_tag: &str) -> Vec<MatchOutcome> {
        let battle = &raw.battle;
        let players = match &battle.players {
            Some(players) => players,
            None => {
                log::warn!("duels record has no players");
                return Vec::new();
            }
        };

        let mode = self.resolve_mode(raw);
        let match_type = base_match_type(battle.battle_type.as_deref());
        let raw_result = battle.result.as_deref();

        let mut outcomes = Vec::new();
        for player in players {
            let is_subject = player.tag == subject_tag;
            if !self.scope.is_global() && !is_subject {
                continue;
            }

            // The declared result is from the subject's perspective, so
            // the opponent's outcome is the inverse.
            let result = match raw_result {
                Some("draw") => MatchResult::Draw,
                Some("victory") if is_subject => MatchResult::Win,
                Some("defeat") if !is_subject => MatchResult::Win,
                _ => MatchResult::Loss,
            };

            let brawlers = match &player.brawlers {
                Some(brawlers) => brawlers,
                None => continue,
            };
            for brawler in brawlers {
                let (duration_secs, trophy_change) = match self.scope {
                    Scope::Player => (battle.duration, resolve_trophy_change(raw, subject_tag)),
                    Scope::Global => (None, 0),
                };
                outcomes.push(MatchOutcome::new(
                    raw.event.map.clone(),
                    mode.clone(),
                    brawler.name.clone(),
                    result,
                    false,
                    false,
                    duration_secs,
                    trophy_change,
                    match_type,
                ));
            }
        }
        outcomes
    }

    fn decode_standard(&self, raw: &RawMatch, subject_tag: &str) -> Vec<MatchOutcome> {
        let battle = &raw.battle;
        let teams = match &battle.teams {
            Some(teams) if teams.len() == 2 => teams,
            _ => return Vec::new(),
        };

        let winning_index = winning_team_index(teams, battle.result.as_deref(), subject_tag);
        let star_tag = battle.star_player.as_ref().map(|p| p.tag.as_str());
        let star_player_exists = star_tag.is_some();
        let mode = self.resolve_mode(raw);
        let match_types = self.standard_match_types(raw);
        let is_draw = battle.result.as_deref() == Some("draw");

        let mut outcomes = Vec::new();
        for (team_index, team) in teams.iter().enumerate() {
            for player in team {
                if !self.scope.is_global() && player.tag != subject_tag {
                    continue;
                }

                let brawler = match &player.brawler {
                    Some(brawler) => brawler.name.clone(),
                    None => continue,
                };
                let is_star_player = star_tag == Some(player.tag.as_str());
                let result = if is_draw {
                    MatchResult::Draw
                } else if team_index == winning_index {
                    MatchResult::Win
                } else {
                    MatchResult::Loss
                };
                let trophy_change = match self.scope {
                    Scope::Player => resolve_trophy_change(raw, subject_tag),
                    Scope::Global => 0,
                };

                for match_type in &match_types {
                    outcomes.push(MatchOutcome::new(
                        raw.event.map.clone(),
                        mode.clone(),
                        brawler.clone(),
                        result,
                        is_star_player,
                        star_player_exists,
                        battle.duration,
                        trophy_change,
                        *match_type,
                    ));
                }
            }
        }
        outcomes
    }

    /// Match-type tags for a standard record. Ranked records where any
    /// participant's trophy value falls in the Legendary band get the
    /// extra `legendaryOrHigher` tag, producing a second outcome per
    /// brawler.
    fn standard_match_types(&self, raw: &RawMatch) -> Vec<MatchType> {
        let base = base_match_type(raw.battle.battle_type.as_deref());
        let mut types = vec![base];
        if base == MatchType::Ranked && any_participant_in_legendary_band(raw) {
            types.push(MatchType::LegendaryOrHigher);
        }
        types
    }
}

fn base_match_type(battle_type: Option<&str>) -> MatchType {
    if battle_type == Some(RANKED_QUEUE_TYPE) {
        MatchType::Ranked
    } else {
        MatchType::Regular
    }
}

fn any_participant_in_legendary_band(raw: &RawMatch) -> bool {
    let in_band = |brawler: &super::raw::RawBrawler| {
        brawler
            .trophies
            .map(|t| (LEGENDARY_BAND_MIN..=LEGENDARY_BAND_MAX).contains(&t))
            .unwrap_or(false)
    };
    raw.battle
        .teams
        .iter()
        .flatten()
        .flatten()
        .chain(raw.battle.players.iter().flatten())
        .any(|player| player.brawler.as_ref().map(in_band).unwrap_or(false))
}

/// Which of the two teams won. The declared result is from the subject's
/// perspective: if the subject sits on team 0, "victory" means team 0 won;
/// otherwise the declared result describes team 1's fate inverted.
fn winning_team_index(teams: &[Vec<RawPlayer>], result: Option<&str>, subject_tag: &str) -> usize {
    let result_bit = usize::from(result == Some("victory"));
    if teams[0].iter().any(|p| p.tag == subject_tag) {
        1 - result_bit
    } else {
        result_bit
    }
}

/// Prefer the match-level trophy delta; fall back to summing the matching
/// participant's per-brawler deltas; otherwise zero.
fn resolve_trophy_change(raw: &RawMatch, subject_tag: &str) -> i64 {
    if let Some(change) = raw.battle.trophy_change {
        return change;
    }

    if let Some(players) = &raw.battle.players {
        let has_brawler_lists = players
            .first()
            .map(|p| p.brawlers.is_some())
            .unwrap_or(false);
        if has_brawler_lists {
            if let Some(player) = players.iter().find(|p| p.tag == subject_tag) {
                return player
                    .brawlers
                    .iter()
                    .flatten()
                    .map(|b| b.trophy_change.unwrap_or(0))
                    .sum();
            }
        }
    }

    0
}
