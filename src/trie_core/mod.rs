//! Trie Core - Incremental Aggregation Engine
//!
//! A sparse, lazily-materialized tree of additive counters keyed by
//! (pathID, filterID). Writes decompose one outcome into every prefix of
//! the relevant dimension orderings; reads resolve any bound/unbound
//! dimension combination to a single children fetch.
//!
//! # Architecture
//!
//! ```text
//! MatchOutcome → derive_paths (dimension-ordering prefixes)
//!     ↓
//! merge per pathID → ResultCounter deltas
//!     ↓
//! TrieWriter (increment-or-create, self-healing parent links)
//!     ↓
//! TrieStore backend (SQLite) ← TrieReader (slices, snapshots, deletes)
//! ```

pub mod counter;
pub mod paths;
pub mod reader;
pub mod sqlite_store;
pub mod store;
pub mod writer;

pub use counter::{FrequencyCounter, ResultCounter, ResultTally, DURATION_BUCKET_SECS};
pub use paths::{derive_paths, last_segment, parent_path, SEPARATOR};
pub use reader::{FetchError, RecentSlice, TrieQuery, TrieReader, TrieSlice};
pub use sqlite_store::SqliteTrieStore;
pub use store::{StoreError, TrieNode, TrieStore};
pub use writer::{TrieWriter, UpdateReport};
