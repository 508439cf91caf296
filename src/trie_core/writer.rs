//! Self-healing trie updates
//!
//! Deltas arrive for arbitrary paths in arbitrary order — a leaf can be
//! written before any of its ancestors exists. The insert protocol keeps
//! the trie connected anyway:
//!
//! 1. try the atomic additive update
//! 2. on a missing node, create it with a zero counter and retry
//! 3. after creating a node, register it with its parent, creating
//!    missing ancestors upward until an existing one (or the root)
//!
//! A path whose update still fails after creation is reported and
//! abandoned; the rest of the batch proceeds.

use super::counter::ResultCounter;
use super::paths::{derive_paths, parent_path};
use super::store::{StoreError, TrieStore};
use crate::match_core::outcome::{MatchOutcome, Scope};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Per-path tally for one update batch.
#[derive(Debug, Clone, Default)]
pub struct UpdateReport {
    pub updated: usize,
    pub failed: usize,
    pub failed_paths: Vec<String>,
}

impl UpdateReport {
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }
}

pub struct TrieWriter {
    store: Arc<dyn TrieStore>,
}

impl TrieWriter {
    pub fn new(store: Arc<dyn TrieStore>) -> Self {
        Self { store }
    }

    /// Pre-merge all outcome deltas locally so each unique path receives a
    /// single store write no matter how many outcomes touch it.
    pub fn merge_deltas(
        outcomes: &[MatchOutcome],
        base_path: &str,
        scope: Scope,
    ) -> BTreeMap<String, ResultCounter> {
        let mut deltas: BTreeMap<String, ResultCounter> = BTreeMap::new();
        for outcome in outcomes {
            for path_id in derive_paths(outcome, base_path, scope) {
                deltas.entry(path_id).or_default().apply(outcome);
            }
        }
        deltas
    }

    /// Fold a batch of outcomes into the persisted trie under one filter
    /// ID. Inconsistent paths are logged and tallied without aborting the
    /// batch; a store-level failure propagates immediately.
    pub async fn apply_outcomes(
        &self,
        base_path: &str,
        filter_id: &str,
        outcomes: &[MatchOutcome],
        scope: Scope,
    ) -> Result<UpdateReport, StoreError> {
        let deltas = Self::merge_deltas(outcomes, base_path, scope);
        log::debug!(
            "updating {} paths under {} ({} outcomes)",
            deltas.len(),
            base_path,
            outcomes.len()
        );

        let mut report = UpdateReport::default();
        for (path_id, delta) in &deltas {
            match self.apply_delta(path_id, filter_id, delta).await {
                Ok(()) => report.updated += 1,
                Err(StoreError::Inconsistent(path)) => {
                    log::error!("🚨 node {} failed to update after creation", path);
                    report.failed += 1;
                    report.failed_paths.push(path);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(report)
    }

    /// Increment-or-create for a single path.
    pub async fn apply_delta(
        &self,
        path_id: &str,
        filter_id: &str,
        delta: &ResultCounter,
    ) -> Result<(), StoreError> {
        if self.store.add_counter(path_id, filter_id, delta).await? {
            return Ok(());
        }

        self.create_with_lineage(path_id, filter_id).await?;

        if self.store.add_counter(path_id, filter_id, delta).await? {
            Ok(())
        } else {
            Err(StoreError::Inconsistent(path_id.to_string()))
        }
    }

    /// Create a node and wire it into the trie, creating missing ancestors
    /// with their child link until an existing ancestor (or the root)
    /// takes the registration.
    async fn create_with_lineage(&self, path_id: &str, filter_id: &str) -> Result<(), StoreError> {
        self.store.create_node(path_id, filter_id, &[]).await?;

        let mut current = path_id.to_string();
        while let Some(parent) = parent_path(&current) {
            if self.store.add_child(parent, filter_id, &current).await? {
                break;
            }
            let parent = parent.to_string();
            self.store
                .create_node(&parent, filter_id, std::slice::from_ref(&current))
                .await?;
            current = parent;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::match_core::outcome::{MatchResult, MatchType};
    use crate::trie_core::paths;
    use crate::trie_core::sqlite_store::SqliteTrieStore;
    use tempfile::tempdir;

    fn outcome(result: MatchResult) -> MatchOutcome {
        MatchOutcome::new(
            Some("Backyard Bowl".to_string()),
            "brawlBall".to_string(),
            "Colt".to_string(),
            result,
            result == MatchResult::Win,
            true,
            Some(95),
            8,
            MatchType::Regular,
        )
    }

    fn test_writer() -> (tempfile::TempDir, Arc<SqliteTrieStore>, TrieWriter) {
        let dir = tempdir().unwrap();
        let store = Arc::new(SqliteTrieStore::open(dir.path().join("test.db")).unwrap());
        let writer = TrieWriter::new(store.clone());
        (dir, store, writer)
    }

    #[test]
    fn test_merge_deltas_one_write_per_path() {
        let outcomes = vec![outcome(MatchResult::Win); 50];
        let deltas = TrieWriter::merge_deltas(&outcomes, "PLAYER1", Scope::Player);

        // 50 outcomes over the same dimensions still touch only 10 paths
        assert_eq!(deltas.len(), 10);
        for delta in deltas.values() {
            assert_eq!(delta.result.wins, 50);
            assert_eq!(delta.result.potential_total, 50);
        }
    }

    #[tokio::test]
    async fn test_leaf_write_builds_linked_chain() {
        let (_dir, store, writer) = test_writer();
        let leaf = "PLAYER1$modeMapBrawler$regular$brawlBall$Backyard Bowl$Colt";

        let mut delta = ResultCounter::new();
        delta.apply(&outcome(MatchResult::Win));
        writer.apply_delta(leaf, "overall", &delta).await.unwrap();

        // Walk down from the root through childrenPathIDs.
        let mut current = "PLAYER1".to_string();
        loop {
            let node = store.get_node(&current, "overall").await.unwrap().unwrap();
            assert!(!node.children_path_ids.contains(&current));
            if current == leaf {
                assert_eq!(node.counter.result.wins, 1);
                break;
            }
            assert_eq!(node.children_path_ids.len(), 1);
            let child = node.children_path_ids[0].clone();
            assert_eq!(paths::parent_path(&child), Some(current.as_str()));
            current = child;
        }
    }

    #[tokio::test]
    async fn test_existing_ancestor_stops_the_climb() {
        let (_dir, store, writer) = test_writer();
        let mut delta = ResultCounter::new();
        delta.apply(&outcome(MatchResult::Win));

        writer
            .apply_delta("PLAYER1$modeMapBrawler$regular", "overall", &delta)
            .await
            .unwrap();
        writer
            .apply_delta(
                "PLAYER1$modeMapBrawler$regular$brawlBall",
                "overall",
                &delta,
            )
            .await
            .unwrap();

        let node = store
            .get_node("PLAYER1$modeMapBrawler$regular", "overall")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            node.children_path_ids,
            vec!["PLAYER1$modeMapBrawler$regular$brawlBall".to_string()]
        );
        // The pre-existing ancestor keeps its own counter intact.
        assert_eq!(node.counter.result.wins, 1);
    }

    #[tokio::test]
    async fn test_apply_outcomes_updates_all_derived_paths() {
        let (_dir, store, writer) = test_writer();
        let outcomes = vec![outcome(MatchResult::Win)];

        let report = writer
            .apply_outcomes("PLAYER1", "overall", &outcomes, Scope::Player)
            .await
            .unwrap();
        assert_eq!(report.updated, 10);
        assert!(report.all_succeeded());

        for path_id in derive_paths(&outcomes[0], "PLAYER1", Scope::Player) {
            let node = store.get_node(&path_id, "overall").await.unwrap().unwrap();
            assert_eq!(node.counter.result.wins, 1, "path {}", path_id);
            assert_eq!(node.counter.result.potential_total, 1);
            assert_eq!(node.counter.star.wins, 1);
            assert_eq!(node.counter.star.potential_total, 1);
        }
    }

    #[tokio::test]
    async fn test_two_batches_accumulate() {
        let (_dir, store, writer) = test_writer();

        writer
            .apply_outcomes("PLAYER1", "overall", &[outcome(MatchResult::Win)], Scope::Player)
            .await
            .unwrap();
        writer
            .apply_outcomes("PLAYER1", "overall", &[outcome(MatchResult::Loss)], Scope::Player)
            .await
            .unwrap();

        let root = store.get_node("PLAYER1", "overall").await.unwrap().unwrap();
        assert_eq!(root.counter.result.wins, 1);
        assert_eq!(root.counter.result.losses, 1);
        assert_eq!(root.counter.result.potential_total, 2);
    }

    #[tokio::test]
    async fn test_sibling_leaves_share_ancestors() {
        let (_dir, store, writer) = test_writer();

        let mut shelly = outcome(MatchResult::Win);
        shelly.brawler = "Shelly".to_string();
        writer
            .apply_outcomes(
                "PLAYER1",
                "overall",
                &[outcome(MatchResult::Win), shelly],
                Scope::Player,
            )
            .await
            .unwrap();

        let mode_map = store
            .get_node(
                "PLAYER1$modeMapBrawler$regular$brawlBall$Backyard Bowl",
                "overall",
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(mode_map.children_path_ids.len(), 2);
        assert_eq!(mode_map.counter.result.wins, 2);
    }
}
