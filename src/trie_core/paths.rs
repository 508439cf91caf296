//! Hierarchical path identifiers for aggregate nodes
//!
//! A path ID is the `$`-joined concatenation of a base path (player tag or
//! "global") with a dimension-ordering name and its ordered segment values,
//! e.g. `PLAYERTAG$modeMapBrawler$regular$brawlBall$Backyard Bowl$Colt`.
//! Every prefix of an ordering is a separately materialized aggregate, so
//! any dimension slice reads in O(1) without scans.
//!
//! Segment values are raw upstream tokens with no escaping; a value
//! containing `$` would make paths ambiguous (known upstream limitation,
//! kept for wire compatibility).

use crate::match_core::outcome::{MatchOutcome, Scope};

pub const SEPARATOR: char = '$';

pub const MODE_BRAWLER: &str = "modeBrawler";
pub const BRAWLER_MODE_MAP: &str = "brawlerModeMap";
pub const MODE_MAP_BRAWLER: &str = "modeMapBrawler";
pub const BRAWLER_MODE: &str = "brawlerMode";

/// All path IDs whose aggregates one outcome must update, in a fixed
/// deterministic order.
///
/// Both scopes get the bare base path and the full `modeBrawler` leaf
/// (answers "which brawlers were played in this mode"). Player scope adds
/// every prefix of the `brawlerModeMap` and `modeMapBrawler` orderings;
/// global scope adds the short `modeBrawler` prefixes and the `brawlerMode`
/// ordering instead — map-level granularity is cost-prohibitive globally.
pub fn derive_paths(outcome: &MatchOutcome, base_path: &str, scope: Scope) -> Vec<String> {
    let t = outcome.match_type.as_str();
    let mode = outcome.mode.as_str();
    let map = outcome.map.as_str();
    let brawler = outcome.brawler.as_str();

    debug_assert!(
        !mode.contains(SEPARATOR) && !map.contains(SEPARATOR) && !brawler.contains(SEPARATOR),
        "path segments must not contain the separator"
    );

    let mut paths = Vec::with_capacity(10);
    paths.push(base_path.to_string());
    paths.push(format!("{base_path}${MODE_BRAWLER}${t}${mode}${brawler}"));

    match scope {
        Scope::Player => {
            paths.push(format!("{base_path}${BRAWLER_MODE_MAP}${t}"));
            paths.push(format!("{base_path}${BRAWLER_MODE_MAP}${t}${brawler}"));
            paths.push(format!("{base_path}${BRAWLER_MODE_MAP}${t}${brawler}${mode}"));
            paths.push(format!(
                "{base_path}${BRAWLER_MODE_MAP}${t}${brawler}${mode}${map}"
            ));

            paths.push(format!("{base_path}${MODE_MAP_BRAWLER}${t}"));
            paths.push(format!("{base_path}${MODE_MAP_BRAWLER}${t}${mode}"));
            paths.push(format!("{base_path}${MODE_MAP_BRAWLER}${t}${mode}${map}"));
            paths.push(format!(
                "{base_path}${MODE_MAP_BRAWLER}${t}${mode}${map}${brawler}"
            ));
        }
        Scope::Global => {
            // The short modeBrawler prefixes exist only globally; for
            // players they are already covered by modeMapBrawler.
            paths.push(format!("{base_path}${MODE_BRAWLER}${t}"));
            paths.push(format!("{base_path}${MODE_BRAWLER}${t}${mode}"));

            paths.push(format!("{base_path}${BRAWLER_MODE}${t}"));
            paths.push(format!("{base_path}${BRAWLER_MODE}${t}${brawler}"));
            paths.push(format!("{base_path}${BRAWLER_MODE}${t}${brawler}${mode}"));
        }
    }

    paths
}

/// Parent of a path: everything before the last separator. Root paths
/// (no separator) have no parent.
pub fn parent_path(path_id: &str) -> Option<&str> {
    path_id.rfind(SEPARATOR).map(|idx| &path_id[..idx])
}

/// The final segment of a path, e.g. the brawler name on a
/// `...$mode$map$brawler` leaf.
pub fn last_segment(path_id: &str) -> &str {
    path_id
        .rsplit(SEPARATOR)
        .next()
        .unwrap_or(path_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::match_core::outcome::{MatchResult, MatchType};

    fn outcome() -> MatchOutcome {
        MatchOutcome::new(
            Some("Backyard Bowl".to_string()),
            "brawlBall".to_string(),
            "Colt".to_string(),
            MatchResult::Win,
            true,
            true,
            Some(95),
            8,
            MatchType::Regular,
        )
    }

    #[test]
    fn test_player_scope_derives_ten_paths() {
        let paths = derive_paths(&outcome(), "PLAYER1", Scope::Player);
        assert_eq!(paths.len(), 10);
        assert_eq!(paths[0], "PLAYER1");
        assert!(paths.contains(&"PLAYER1$modeBrawler$regular$brawlBall$Colt".to_string()));
        assert!(paths.contains(&"PLAYER1$brawlerModeMap$regular".to_string()));
        assert!(paths.contains(&"PLAYER1$brawlerModeMap$regular$Colt".to_string()));
        assert!(paths.contains(&"PLAYER1$brawlerModeMap$regular$Colt$brawlBall".to_string()));
        assert!(paths.contains(
            &"PLAYER1$brawlerModeMap$regular$Colt$brawlBall$Backyard Bowl".to_string()
        ));
        assert!(paths.contains(&"PLAYER1$modeMapBrawler$regular".to_string()));
        assert!(paths.contains(&"PLAYER1$modeMapBrawler$regular$brawlBall".to_string()));
        assert!(paths.contains(
            &"PLAYER1$modeMapBrawler$regular$brawlBall$Backyard Bowl".to_string()
        ));
        assert!(paths.contains(
            &"PLAYER1$modeMapBrawler$regular$brawlBall$Backyard Bowl$Colt".to_string()
        ));
    }

    #[test]
    fn test_global_scope_omits_map_level() {
        let paths = derive_paths(&outcome(), "global", Scope::Global);
        assert_eq!(paths.len(), 7);
        assert!(paths.contains(&"global".to_string()));
        assert!(paths.contains(&"global$modeBrawler$regular".to_string()));
        assert!(paths.contains(&"global$modeBrawler$regular$brawlBall".to_string()));
        assert!(paths.contains(&"global$modeBrawler$regular$brawlBall$Colt".to_string()));
        assert!(paths.contains(&"global$brawlerMode$regular".to_string()));
        assert!(paths.contains(&"global$brawlerMode$regular$Colt".to_string()));
        assert!(paths.contains(&"global$brawlerMode$regular$Colt$brawlBall".to_string()));
        assert!(paths.iter().all(|p| !p.contains("Backyard Bowl")));
    }

    #[test]
    fn test_derivation_is_deterministic() {
        let a = derive_paths(&outcome(), "PLAYER1", Scope::Player);
        let b = derive_paths(&outcome(), "PLAYER1", Scope::Player);
        assert_eq!(a, b);
    }

    #[test]
    fn test_parent_path() {
        assert_eq!(
            parent_path("PLAYER1$modeMapBrawler$regular$brawlBall"),
            Some("PLAYER1$modeMapBrawler$regular")
        );
        assert_eq!(parent_path("PLAYER1$modeMapBrawler"), Some("PLAYER1"));
        assert_eq!(parent_path("PLAYER1"), None);
    }

    #[test]
    fn test_last_segment() {
        assert_eq!(
            last_segment("PLAYER1$modeMapBrawler$regular$brawlBall$Backyard Bowl"),
            "Backyard Bowl"
        );
        assert_eq!(last_segment("global"), "global");
    }

    #[test]
    fn test_every_derived_path_chains_to_the_root() {
        for scope in [Scope::Player, Scope::Global] {
            for path in derive_paths(&outcome(), "BASE", scope) {
                let mut current = path.as_str();
                while let Some(parent) = parent_path(current) {
                    current = parent;
                }
                assert_eq!(current, "BASE");
            }
        }
    }
}
