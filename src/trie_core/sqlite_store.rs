//! SQLite backend for trie nodes
//!
//! One row per (path_id, filter_id) holds the fixed counter fields;
//! histogram buckets and the children set live in side tables so both can
//! be updated with atomic per-key upserts, mirroring the conditional
//! ADD-style operations the writer protocol expects.

use super::counter::{FrequencyCounter, ResultCounter, ResultTally};
use super::store::{StoreError, TrieNode, TrieStore};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS trie_nodes (
    path_id              TEXT NOT NULL,
    filter_id            TEXT NOT NULL,
    wins                 INTEGER NOT NULL DEFAULT 0,
    losses               INTEGER NOT NULL DEFAULT 0,
    draws                INTEGER NOT NULL DEFAULT 0,
    potential_total      INTEGER NOT NULL DEFAULT 0,
    star_wins            INTEGER NOT NULL DEFAULT 0,
    star_losses          INTEGER NOT NULL DEFAULT 0,
    star_draws           INTEGER NOT NULL DEFAULT 0,
    star_potential_total INTEGER NOT NULL DEFAULT 0,
    trophy_change        INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (path_id, filter_id)
);

CREATE TABLE IF NOT EXISTS trie_children (
    path_id       TEXT NOT NULL,
    filter_id     TEXT NOT NULL,
    child_path_id TEXT NOT NULL,
    PRIMARY KEY (path_id, filter_id, child_path_id)
);

CREATE TABLE IF NOT EXISTS trie_durations (
    path_id   TEXT NOT NULL,
    filter_id TEXT NOT NULL,
    bucket    INTEGER NOT NULL,
    count     INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (path_id, filter_id, bucket)
);
"#;

pub struct SqliteTrieStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteTrieStore {
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self, StoreError> {
        if let Some(parent) = db_path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    StoreError::Database(format!(
                        "Failed to create database directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let conn = Connection::open(db_path).map_err(db_err)?;
        conn.pragma_update(None, "journal_mode", "WAL").map_err(db_err)?;
        conn.pragma_update(None, "synchronous", "NORMAL").map_err(db_err)?;
        conn.execute_batch(SCHEMA).map_err(db_err)?;

        log::info!("✅ Trie store initialized with WAL mode");

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

fn db_err(e: rusqlite::Error) -> StoreError {
    StoreError::Database(e.to_string())
}

fn read_node(
    conn: &Connection,
    path_id: &str,
    filter_id: &str,
) -> Result<Option<TrieNode>, StoreError> {
    let tallies = conn
        .query_row(
            "SELECT wins, losses, draws, potential_total,
                    star_wins, star_losses, star_draws, star_potential_total,
                    trophy_change
             FROM trie_nodes WHERE path_id = ?1 AND filter_id = ?2",
            params![path_id, filter_id],
            |row| {
                Ok((
                    ResultTally {
                        wins: row.get::<_, i64>(0)? as u64,
                        losses: row.get::<_, i64>(1)? as u64,
                        draws: row.get::<_, i64>(2)? as u64,
                        potential_total: row.get::<_, i64>(3)? as u64,
                    },
                    ResultTally {
                        wins: row.get::<_, i64>(4)? as u64,
                        losses: row.get::<_, i64>(5)? as u64,
                        draws: row.get::<_, i64>(6)? as u64,
                        potential_total: row.get::<_, i64>(7)? as u64,
                    },
                    row.get::<_, i64>(8)?,
                ))
            },
        )
        .optional()
        .map_err(db_err)?;

    let (result, star, trophy_change) = match tallies {
        Some(t) => t,
        None => return Ok(None),
    };

    let mut durations = FrequencyCounter::default();
    let mut stmt = conn
        .prepare(
            "SELECT bucket, count FROM trie_durations
             WHERE path_id = ?1 AND filter_id = ?2",
        )
        .map_err(db_err)?;
    let buckets = stmt
        .query_map(params![path_id, filter_id], |row| {
            Ok((row.get::<_, i64>(0)? as u32, row.get::<_, i64>(1)? as u64))
        })
        .map_err(db_err)?;
    for bucket in buckets {
        let (bucket, count) = bucket.map_err(db_err)?;
        durations.add_count(bucket, count);
    }

    let mut stmt = conn
        .prepare(
            "SELECT child_path_id FROM trie_children
             WHERE path_id = ?1 AND filter_id = ?2
             ORDER BY child_path_id",
        )
        .map_err(db_err)?;
    let children = stmt
        .query_map(params![path_id, filter_id], |row| row.get::<_, String>(0))
        .map_err(db_err)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(db_err)?;

    Ok(Some(TrieNode {
        path_id: path_id.to_string(),
        filter_id: filter_id.to_string(),
        counter: ResultCounter {
            result,
            star,
            trophy_change,
            durations,
        },
        children_path_ids: children,
    }))
}

#[async_trait]
impl TrieStore for SqliteTrieStore {
    async fn add_counter(
        &self,
        path_id: &str,
        filter_id: &str,
        delta: &ResultCounter,
    ) -> Result<bool, StoreError> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction().map_err(db_err)?;

        let changed = tx
            .execute(
                "UPDATE trie_nodes SET
                    wins = wins + ?3,
                    losses = losses + ?4,
                    draws = draws + ?5,
                    potential_total = potential_total + ?6,
                    star_wins = star_wins + ?7,
                    star_losses = star_losses + ?8,
                    star_draws = star_draws + ?9,
                    star_potential_total = star_potential_total + ?10,
                    trophy_change = trophy_change + ?11
                 WHERE path_id = ?1 AND filter_id = ?2",
                params![
                    path_id,
                    filter_id,
                    delta.result.wins as i64,
                    delta.result.losses as i64,
                    delta.result.draws as i64,
                    delta.result.potential_total as i64,
                    delta.star.wins as i64,
                    delta.star.losses as i64,
                    delta.star.draws as i64,
                    delta.star.potential_total as i64,
                    delta.trophy_change,
                ],
            )
            .map_err(db_err)?;

        if changed == 0 {
            // Dropping the transaction rolls back; nothing was written.
            return Ok(false);
        }

        // Only the bucket keys present in the delta are touched.
        for (bucket, count) in delta.durations.entries() {
            tx.execute(
                "INSERT INTO trie_durations (path_id, filter_id, bucket, count)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(path_id, filter_id, bucket)
                 DO UPDATE SET count = count + excluded.count",
                params![path_id, filter_id, bucket as i64, count as i64],
            )
            .map_err(db_err)?;
        }

        tx.commit().map_err(db_err)?;
        Ok(true)
    }

    async fn create_node(
        &self,
        path_id: &str,
        filter_id: &str,
        children: &[String],
    ) -> Result<(), StoreError> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction().map_err(db_err)?;

        tx.execute(
            "INSERT OR IGNORE INTO trie_nodes (path_id, filter_id) VALUES (?1, ?2)",
            params![path_id, filter_id],
        )
        .map_err(db_err)?;

        for child in children {
            // Self-reference guard
            if child == path_id {
                continue;
            }
            tx.execute(
                "INSERT OR IGNORE INTO trie_children (path_id, filter_id, child_path_id)
                 VALUES (?1, ?2, ?3)",
                params![path_id, filter_id, child],
            )
            .map_err(db_err)?;
        }

        tx.commit().map_err(db_err)?;
        Ok(())
    }

    async fn add_child(
        &self,
        parent_path_id: &str,
        filter_id: &str,
        child_path_id: &str,
    ) -> Result<bool, StoreError> {
        if parent_path_id == child_path_id {
            // Degenerate prefix; treat as handled so callers stop climbing.
            return Ok(true);
        }

        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction().map_err(db_err)?;

        let parent_exists = tx
            .query_row(
                "SELECT 1 FROM trie_nodes WHERE path_id = ?1 AND filter_id = ?2",
                params![parent_path_id, filter_id],
                |_| Ok(()),
            )
            .optional()
            .map_err(db_err)?
            .is_some();

        if !parent_exists {
            return Ok(false);
        }

        tx.execute(
            "INSERT OR IGNORE INTO trie_children (path_id, filter_id, child_path_id)
             VALUES (?1, ?2, ?3)",
            params![parent_path_id, filter_id, child_path_id],
        )
        .map_err(db_err)?;

        tx.commit().map_err(db_err)?;
        Ok(true)
    }

    async fn get_node(
        &self,
        path_id: &str,
        filter_id: &str,
    ) -> Result<Option<TrieNode>, StoreError> {
        let conn = self.conn.lock().unwrap();
        read_node(&conn, path_id, filter_id)
    }

    async fn get_children_paths(
        &self,
        path_id: &str,
        filter_id: &str,
    ) -> Result<Vec<String>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(
                "SELECT child_path_id FROM trie_children
                 WHERE path_id = ?1 AND filter_id = ?2
                 ORDER BY child_path_id",
            )
            .map_err(db_err)?;
        let children = stmt
            .query_map(params![path_id, filter_id], |row| row.get::<_, String>(0))
            .map_err(db_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(db_err)?;
        Ok(children)
    }

    async fn batch_get(
        &self,
        keys: &[(String, String)],
    ) -> Result<Vec<TrieNode>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut nodes = Vec::with_capacity(keys.len());
        for (path_id, filter_id) in keys {
            if let Some(node) = read_node(&conn, path_id, filter_id)? {
                nodes.push(node);
            }
        }
        Ok(nodes)
    }

    async fn recent_filter_ids(
        &self,
        path_id: &str,
        limit: usize,
    ) -> Result<Vec<String>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(
                "SELECT filter_id FROM trie_nodes
                 WHERE path_id = ?1
                 ORDER BY filter_id DESC
                 LIMIT ?2",
            )
            .map_err(db_err)?;
        let ids = stmt
            .query_map(params![path_id, limit as i64], |row| {
                row.get::<_, String>(0)
            })
            .map_err(db_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(db_err)?;
        Ok(ids)
    }

    async fn delete_node(&self, path_id: &str, filter_id: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction().map_err(db_err)?;
        tx.execute(
            "DELETE FROM trie_nodes WHERE path_id = ?1 AND filter_id = ?2",
            params![path_id, filter_id],
        )
        .map_err(db_err)?;
        tx.execute(
            "DELETE FROM trie_children WHERE path_id = ?1 AND filter_id = ?2",
            params![path_id, filter_id],
        )
        .map_err(db_err)?;
        tx.execute(
            "DELETE FROM trie_durations WHERE path_id = ?1 AND filter_id = ?2",
            params![path_id, filter_id],
        )
        .map_err(db_err)?;
        tx.commit().map_err(db_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::match_core::outcome::{MatchOutcome, MatchResult, MatchType};
    use tempfile::tempdir;

    fn test_store() -> (tempfile::TempDir, SqliteTrieStore) {
        let dir = tempdir().unwrap();
        let store = SqliteTrieStore::open(dir.path().join("test.db")).unwrap();
        (dir, store)
    }

    fn win_delta() -> ResultCounter {
        let mut counter = ResultCounter::new();
        counter.apply(&MatchOutcome::new(
            Some("Backyard Bowl".to_string()),
            "brawlBall".to_string(),
            "Colt".to_string(),
            MatchResult::Win,
            true,
            true,
            Some(95),
            8,
            MatchType::Regular,
        ));
        counter
    }

    #[tokio::test]
    async fn test_add_counter_requires_existing_node() {
        let (_dir, store) = test_store();
        let applied = store
            .add_counter("PLAYER1", "overall", &win_delta())
            .await
            .unwrap();
        assert!(!applied);
        assert!(store.get_node("PLAYER1", "overall").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_then_add_round_trips() {
        let (_dir, store) = test_store();
        store.create_node("PLAYER1", "overall", &[]).await.unwrap();
        assert!(store
            .add_counter("PLAYER1", "overall", &win_delta())
            .await
            .unwrap());

        let node = store.get_node("PLAYER1", "overall").await.unwrap().unwrap();
        assert_eq!(node.counter.result.wins, 1);
        assert_eq!(node.counter.result.potential_total, 1);
        assert_eq!(node.counter.star.wins, 1);
        assert_eq!(node.counter.star.potential_total, 1);
        assert_eq!(node.counter.trophy_change, 8);
        assert_eq!(node.counter.durations.get(3), 1);
        assert!(node.children_path_ids.is_empty());
    }

    #[tokio::test]
    async fn test_repeated_adds_accumulate() {
        let (_dir, store) = test_store();
        store.create_node("PLAYER1", "overall", &[]).await.unwrap();
        for _ in 0..3 {
            store
                .add_counter("PLAYER1", "overall", &win_delta())
                .await
                .unwrap();
        }

        let node = store.get_node("PLAYER1", "overall").await.unwrap().unwrap();
        assert_eq!(node.counter.result.wins, 3);
        assert_eq!(node.counter.trophy_change, 24);
        assert_eq!(node.counter.durations.get(3), 3);
    }

    #[tokio::test]
    async fn test_create_node_is_idempotent() {
        let (_dir, store) = test_store();
        store.create_node("PLAYER1", "overall", &[]).await.unwrap();
        store
            .add_counter("PLAYER1", "overall", &win_delta())
            .await
            .unwrap();
        // A duplicate create must not clobber the accumulated counter.
        store.create_node("PLAYER1", "overall", &[]).await.unwrap();

        let node = store.get_node("PLAYER1", "overall").await.unwrap().unwrap();
        assert_eq!(node.counter.result.wins, 1);
    }

    #[tokio::test]
    async fn test_add_child_conditional_on_parent() {
        let (_dir, store) = test_store();
        let linked = store
            .add_child("PLAYER1", "overall", "PLAYER1$modeBrawler")
            .await
            .unwrap();
        assert!(!linked);

        store.create_node("PLAYER1", "overall", &[]).await.unwrap();
        let linked = store
            .add_child("PLAYER1", "overall", "PLAYER1$modeBrawler")
            .await
            .unwrap();
        assert!(linked);

        let children = store
            .get_children_paths("PLAYER1", "overall")
            .await
            .unwrap();
        assert_eq!(children, vec!["PLAYER1$modeBrawler".to_string()]);
    }

    #[tokio::test]
    async fn test_self_reference_is_never_stored() {
        let (_dir, store) = test_store();
        store
            .create_node("PLAYER1", "overall", &["PLAYER1".to_string()])
            .await
            .unwrap();
        assert!(store
            .get_children_paths("PLAYER1", "overall")
            .await
            .unwrap()
            .is_empty());

        assert!(store.add_child("PLAYER1", "overall", "PLAYER1").await.unwrap());
        assert!(store
            .get_children_paths("PLAYER1", "overall")
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_batch_get_skips_absent_keys() {
        let (_dir, store) = test_store();
        store.create_node("A", "overall", &[]).await.unwrap();
        store.create_node("B", "overall", &[]).await.unwrap();

        let nodes = store
            .batch_get(&[
                ("A".to_string(), "overall".to_string()),
                ("MISSING".to_string(), "overall".to_string()),
                ("B".to_string(), "overall".to_string()),
            ])
            .await
            .unwrap();
        let paths: Vec<_> = nodes.iter().map(|n| n.path_id.as_str()).collect();
        assert_eq!(paths, vec!["A", "B"]);
    }

    #[tokio::test]
    async fn test_recent_filter_ids_newest_first() {
        let (_dir, store) = test_store();
        for filter_id in ["2025-07-01T00:00:00Z", "2025-07-03T00:00:00Z", "2025-07-02T00:00:00Z"] {
            store.create_node("global", filter_id, &[]).await.unwrap();
        }

        let ids = store.recent_filter_ids("global", 2).await.unwrap();
        assert_eq!(
            ids,
            vec![
                "2025-07-03T00:00:00Z".to_string(),
                "2025-07-02T00:00:00Z".to_string()
            ]
        );
    }

    #[tokio::test]
    async fn test_delete_node_removes_everything() {
        let (_dir, store) = test_store();
        store
            .create_node("PLAYER1", "overall", &["PLAYER1$x".to_string()])
            .await
            .unwrap();
        store
            .add_counter("PLAYER1", "overall", &win_delta())
            .await
            .unwrap();

        store.delete_node("PLAYER1", "overall").await.unwrap();
        assert!(store.get_node("PLAYER1", "overall").await.unwrap().is_none());
        assert!(store
            .get_children_paths("PLAYER1", "overall")
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_filter_ids_are_isolated() {
        let (_dir, store) = test_store();
        store.create_node("global", "snap-1", &[]).await.unwrap();
        store.create_node("global", "snap-2", &[]).await.unwrap();
        store
            .add_counter("global", "snap-1", &win_delta())
            .await
            .unwrap();

        let snap1 = store.get_node("global", "snap-1").await.unwrap().unwrap();
        let snap2 = store.get_node("global", "snap-2").await.unwrap().unwrap();
        assert_eq!(snap1.counter.result.wins, 1);
        assert_eq!(snap2.counter.result.wins, 0);
    }
}
