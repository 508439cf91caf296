//! Pipeline - Tracking and Compilation Orchestration
//!
//! # Architecture
//!
//! ```text
//! ApiClient (battlelog) → tracker → MatchStore (uncached raw records)
//!     ↓
//! StatsCompiler (decode → fold → flag cached)
//!     ↓
//! trie_core (persisted aggregates)
//! ```

pub mod compiler;
pub mod match_store;
pub mod tracker;

pub use compiler::{CompileError, CompileReport, StatsCompiler, GLOBAL_BASE_PATH, OVERALL_FILTER_ID};
pub use match_store::{MatchStore, MatchStoreError};
pub use tracker::track_recent_matches;
