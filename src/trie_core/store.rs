//! Backing-store contract for trie nodes
//!
//! The trie only needs a handful of primitives from its store, and all
//! correctness guarantees lean on two of them being atomic per key: the
//! conditional additive counter update and the conditional child-set add.

use super::counter::ResultCounter;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A persisted aggregate keyed by (path ID, filter ID).
///
/// `children_path_ids` is kept sorted; a node never lists itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrieNode {
    pub path_id: String,
    pub filter_id: String,
    pub counter: ResultCounter,
    pub children_path_ids: Vec<String>,
}

#[derive(Debug)]
pub enum StoreError {
    Database(String),
    Serialization(serde_json::Error),
    /// A node could not be updated even after being created — the
    /// create-then-retry protocol has no further recovery for this path.
    Inconsistent(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err)
    }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Database(e) => write!(f, "Database error: {}", e),
            StoreError::Serialization(e) => write!(f, "Serialization error: {}", e),
            StoreError::Inconsistent(path) => {
                write!(f, "Node {} failed to update after creation", path)
            }
        }
    }
}

impl std::error::Error for StoreError {}

/// Backend trait for trie node storage.
///
/// `add_counter` and `add_child` are conditional: they return `Ok(false)`
/// when the target (node / parent) does not exist instead of creating it,
/// which is what lets the writer run its create-then-retry protocol.
#[async_trait]
pub trait TrieStore: Send + Sync {
    /// Atomically add every field of `delta` to an existing node.
    /// Returns `Ok(false)` when no node exists under the key.
    async fn add_counter(
        &self,
        path_id: &str,
        filter_id: &str,
        delta: &ResultCounter,
    ) -> Result<bool, StoreError>;

    /// Create a node with a zero counter and the given initial children.
    /// Creating an already-existing node is a no-op (idempotent under
    /// at-least-once delivery). Self-references in `children` are dropped.
    async fn create_node(
        &self,
        path_id: &str,
        filter_id: &str,
        children: &[String],
    ) -> Result<(), StoreError>;

    /// Atomically add `child_path_id` to an existing parent's child set.
    /// Returns `Ok(false)` when the parent node does not exist.
    async fn add_child(
        &self,
        parent_path_id: &str,
        filter_id: &str,
        child_path_id: &str,
    ) -> Result<bool, StoreError>;

    async fn get_node(
        &self,
        path_id: &str,
        filter_id: &str,
    ) -> Result<Option<TrieNode>, StoreError>;

    /// Children path IDs of a node; empty when the node is absent or has
    /// no children.
    async fn get_children_paths(
        &self,
        path_id: &str,
        filter_id: &str,
    ) -> Result<Vec<String>, StoreError>;

    /// Fetch several nodes at once; absent keys are skipped.
    async fn batch_get(
        &self,
        keys: &[(String, String)],
    ) -> Result<Vec<TrieNode>, StoreError>;

    /// Most recent filter IDs stored under a path, newest first.
    async fn recent_filter_ids(
        &self,
        path_id: &str,
        limit: usize,
    ) -> Result<Vec<String>, StoreError>;

    /// Remove a single node (counter, children set, histogram buckets).
    async fn delete_node(&self, path_id: &str, filter_id: &str) -> Result<(), StoreError>;
}
