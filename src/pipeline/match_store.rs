//! Raw battlelog persistence
//!
//! Raw records are immutable once stored; the only mutable bit is the
//! `stats_cached` flag the compiler flips after folding a record into the
//! trie. Duplicate battle times (the API occasionally repeats them) are
//! dropped on insert.

use crate::match_core::mode_overrides::ModeOverrides;
use crate::match_core::raw::RawMatch;
use crate::trie_core::counter::FrequencyCounter;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS players (
    player_tag TEXT PRIMARY KEY,
    added_at   INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS matches (
    player_tag   TEXT NOT NULL,
    battle_time  TEXT NOT NULL,
    raw_json     TEXT NOT NULL,
    stats_cached INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (player_tag, battle_time)
);

CREATE INDEX IF NOT EXISTS idx_matches_uncached
    ON matches(player_tag, stats_cached);

CREATE TABLE IF NOT EXISTS rank_histograms (
    player_tag  TEXT NOT NULL,
    mode        TEXT NOT NULL,
    frequencies TEXT NOT NULL,
    PRIMARY KEY (player_tag, mode)
);

CREATE TABLE IF NOT EXISTS mode_overrides (
    map  TEXT PRIMARY KEY,
    mode TEXT NOT NULL
);
"#;

#[derive(Debug)]
pub enum MatchStoreError {
    Database(String),
    Serialization(serde_json::Error),
}

impl From<serde_json::Error> for MatchStoreError {
    fn from(err: serde_json::Error) -> Self {
        MatchStoreError::Serialization(err)
    }
}

impl From<rusqlite::Error> for MatchStoreError {
    fn from(err: rusqlite::Error) -> Self {
        MatchStoreError::Database(err.to_string())
    }
}

impl std::fmt::Display for MatchStoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchStoreError::Database(e) => write!(f, "Database error: {}", e),
            MatchStoreError::Serialization(e) => write!(f, "Serialization error: {}", e),
        }
    }
}

impl std::error::Error for MatchStoreError {}

pub struct MatchStore {
    conn: Arc<Mutex<Connection>>,
}

impl MatchStore {
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self, MatchStoreError> {
        if let Some(parent) = db_path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    MatchStoreError::Database(format!(
                        "Failed to create database directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let conn = Connection::open(db_path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.execute_batch(SCHEMA)?;

        log::info!("✅ Match store initialized with WAL mode");

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Load the injected mode-override table from this database (builtin
    /// fallback when the table is empty or unreadable).
    pub fn mode_overrides(&self) -> ModeOverrides {
        let conn = self.conn.lock().unwrap();
        ModeOverrides::load(&conn)
    }

    pub fn add_player(&self, player_tag: &str) -> Result<(), MatchStoreError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR IGNORE INTO players (player_tag, added_at) VALUES (?1, ?2)",
            params![player_tag, chrono::Utc::now().timestamp()],
        )?;
        Ok(())
    }

    pub fn player_tags(&self) -> Result<Vec<String>, MatchStoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT player_tag FROM players ORDER BY player_tag")?;
        let tags = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tags)
    }

    /// Insert new raw records as uncached, skipping battle times already
    /// stored and duplicates within the batch. Returns the inserted count.
    pub fn insert_matches(
        &self,
        player_tag: &str,
        matches: &[RawMatch],
    ) -> Result<usize, MatchStoreError> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        let mut inserted = 0;
        for raw in matches {
            let raw_json = serde_json::to_string(raw)?;
            inserted += tx.execute(
                "INSERT OR IGNORE INTO matches (player_tag, battle_time, raw_json, stats_cached)
                 VALUES (?1, ?2, ?3, 0)",
                params![player_tag, raw.battle_time, raw_json],
            )?;
        }

        tx.commit()?;
        Ok(inserted)
    }

    /// Records not yet folded into the trie, oldest first. Rows whose JSON
    /// no longer parses are skipped with a warning rather than failing the
    /// whole compilation.
    pub fn uncached_matches(&self, player_tag: &str) -> Result<Vec<RawMatch>, MatchStoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT battle_time, raw_json FROM matches
             WHERE player_tag = ?1 AND stats_cached = 0
             ORDER BY battle_time",
        )?;
        let rows = stmt
            .query_map(params![player_tag], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut matches = Vec::with_capacity(rows.len());
        for (battle_time, raw_json) in rows {
            match serde_json::from_str::<RawMatch>(&raw_json) {
                Ok(raw) => matches.push(raw),
                Err(e) => {
                    log::warn!("⚠️ skipping unparseable match {} for {}: {}", battle_time, player_tag, e);
                }
            }
        }
        Ok(matches)
    }

    /// Flip the folded flag; only called after the trie write batch has
    /// completed.
    pub fn mark_cached(
        &self,
        player_tag: &str,
        battle_times: &[String],
    ) -> Result<(), MatchStoreError> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        for battle_time in battle_times {
            tx.execute(
                "UPDATE matches SET stats_cached = 1
                 WHERE player_tag = ?1 AND battle_time = ?2",
                params![player_tag, battle_time],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn most_recent_battle_time(
        &self,
        player_tag: &str,
    ) -> Result<Option<String>, MatchStoreError> {
        let conn = self.conn.lock().unwrap();
        let battle_time = conn
            .query_row(
                "SELECT battle_time FROM matches
                 WHERE player_tag = ?1
                 ORDER BY battle_time DESC
                 LIMIT 1",
                params![player_tag],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(battle_time)
    }

    /// Every stored record with its owning tag, for global compilation
    /// passes.
    pub fn all_matches(&self) -> Result<Vec<(String, RawMatch)>, MatchStoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT player_tag, raw_json FROM matches ORDER BY player_tag, battle_time",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut matches = Vec::with_capacity(rows.len());
        for (player_tag, raw_json) in rows {
            match serde_json::from_str::<RawMatch>(&raw_json) {
                Ok(raw) => matches.push((player_tag, raw)),
                Err(e) => log::warn!("⚠️ skipping unparseable match: {}", e),
            }
        }
        Ok(matches)
    }

    /// Merge newly observed elimination placements into a player's
    /// per-mode rank histogram.
    pub fn merge_rank_histogram(
        &self,
        player_tag: &str,
        mode: &str,
        ranks: &FrequencyCounter,
    ) -> Result<(), MatchStoreError> {
        if ranks.is_empty() {
            return Ok(());
        }

        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        let existing = tx
            .query_row(
                "SELECT frequencies FROM rank_histograms
                 WHERE player_tag = ?1 AND mode = ?2",
                params![player_tag, mode],
                |row| row.get::<_, String>(0),
            )
            .optional()?;

        let mut merged = match existing {
            Some(json) => serde_json::from_str::<FrequencyCounter>(&json)?,
            None => FrequencyCounter::default(),
        };
        merged.merge(ranks);

        tx.execute(
            "INSERT INTO rank_histograms (player_tag, mode, frequencies)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(player_tag, mode) DO UPDATE SET frequencies = excluded.frequencies",
            params![player_tag, mode, serde_json::to_string(&merged)?],
        )?;

        tx.commit()?;
        Ok(())
    }

    pub fn rank_histogram(
        &self,
        player_tag: &str,
        mode: &str,
    ) -> Result<FrequencyCounter, MatchStoreError> {
        let conn = self.conn.lock().unwrap();
        let json = conn
            .query_row(
                "SELECT frequencies FROM rank_histograms
                 WHERE player_tag = ?1 AND mode = ?2",
                params![player_tag, mode],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        match json {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(FrequencyCounter::default()),
        }
    }
}
