//! Uncached-match compilation into the trie
//!
//! The compiler is the idempotence boundary: records are read while their
//! `stats_cached` flag is clear, folded into the trie, and only then
//! flagged. A crash anywhere before the flag flip leaves the records
//! eligible for safe reprocessing (at-least-once).

use crate::match_core::decoder::MatchDecoder;
use crate::match_core::mode_overrides::ModeOverrides;
use crate::match_core::outcome::Scope;
use crate::match_core::raw::RawMatch;
use crate::trie_core::counter::FrequencyCounter;
use crate::trie_core::store::{StoreError, TrieStore};
use crate::trie_core::writer::{TrieWriter, UpdateReport};
use super::match_store::{MatchStore, MatchStoreError};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Filter ID for lifetime player aggregates.
pub const OVERALL_FILTER_ID: &str = "overall";

/// Base path for the global trie.
pub const GLOBAL_BASE_PATH: &str = "global";

#[derive(Debug)]
pub enum CompileError {
    Store(StoreError),
    Matches(MatchStoreError),
}

impl From<StoreError> for CompileError {
    fn from(err: StoreError) -> Self {
        CompileError::Store(err)
    }
}

impl From<MatchStoreError> for CompileError {
    fn from(err: MatchStoreError) -> Self {
        CompileError::Matches(err)
    }
}

impl std::fmt::Display for CompileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompileError::Store(e) => write!(f, "Trie store error: {}", e),
            CompileError::Matches(e) => write!(f, "Match store error: {}", e),
        }
    }
}

impl std::error::Error for CompileError {}

#[derive(Debug, Default)]
pub struct CompileReport {
    pub matches_compiled: usize,
    pub outcomes: usize,
    pub update: UpdateReport,
}

pub struct StatsCompiler {
    matches: Arc<MatchStore>,
    writer: TrieWriter,
    overrides: ModeOverrides,
}

impl StatsCompiler {
    pub fn new(
        matches: Arc<MatchStore>,
        store: Arc<dyn TrieStore>,
        overrides: ModeOverrides,
    ) -> Self {
        Self {
            matches,
            writer: TrieWriter::new(store),
            overrides,
        }
    }

    /// Fold one player's uncached records into their lifetime trie.
    ///
    /// Records are flagged cached once the write batch returns; a batch
    /// with isolated per-path inconsistencies still flags (the tally is in
    /// the report), while a store-level failure propagates before any
    /// flagging happens.
    pub async fn compile_player(&self, player_tag: &str) -> Result<CompileReport, CompileError> {
        let uncached = self.matches.uncached_matches(player_tag)?;
        if uncached.is_empty() {
            log::debug!("{}: no uncached matches", player_tag);
            return Ok(CompileReport::default());
        }
        log::info!("📊 {}: compiling {} uncached matches", player_tag, uncached.len());

        // API tags carry a leading '#'; base paths don't.
        let subject_tag = format!("#{}", player_tag);
        let decoder = MatchDecoder::new(self.overrides.clone(), Scope::Player);

        let mut outcomes = Vec::new();
        let mut ranks: BTreeMap<String, FrequencyCounter> = BTreeMap::new();
        for raw in &uncached {
            outcomes.extend(decoder.decode(raw, &subject_tag));
            if let Some((mode, rank)) = decoder.elimination_rank(raw) {
                ranks.entry(mode).or_default().add_entry(rank);
            }
        }

        let update = self
            .writer
            .apply_outcomes(player_tag, OVERALL_FILTER_ID, &outcomes, Scope::Player)
            .await?;

        for (mode, histogram) in &ranks {
            self.matches
                .merge_rank_histogram(player_tag, mode, histogram)?;
        }

        let battle_times: Vec<String> =
            uncached.iter().map(|raw| raw.battle_time.clone()).collect();
        self.matches.mark_cached(player_tag, &battle_times)?;

        if update.all_succeeded() {
            log::info!(
                "✅ {}: {} matches folded into {} paths",
                player_tag,
                uncached.len(),
                update.updated
            );
        } else {
            log::warn!(
                "⚠️ {}: {} matches folded, {} of {} paths failed",
                player_tag,
                uncached.len(),
                update.failed,
                update.updated + update.failed
            );
        }

        Ok(CompileReport {
            matches_compiled: uncached.len(),
            outcomes: outcomes.len(),
            update,
        })
    }

    /// Fold a batch of records from every participant's perspective into
    /// the global trie under a snapshot filter ID. The caller owns record
    /// selection and the snapshot identifier; the `stats_cached` flag is
    /// not involved here.
    pub async fn compile_global(
        &self,
        records: &[(String, RawMatch)],
        snapshot_id: &str,
    ) -> Result<CompileReport, CompileError> {
        if records.is_empty() {
            return Ok(CompileReport::default());
        }

        let decoder = MatchDecoder::new(self.overrides.clone(), Scope::Global);

        let mut outcomes = Vec::new();
        for (owner_tag, raw) in records {
            let subject_tag = format!("#{}", owner_tag);
            outcomes.extend(decoder.decode(raw, &subject_tag));
        }

        let update = self
            .writer
            .apply_outcomes(GLOBAL_BASE_PATH, snapshot_id, &outcomes, Scope::Global)
            .await?;

        log::info!(
            "✅ global snapshot {}: {} records, {} outcomes, {} paths ({} failed)",
            snapshot_id,
            records.len(),
            outcomes.len(),
            update.updated,
            update.failed
        );

        Ok(CompileReport {
            matches_compiled: records.len(),
            outcomes: outcomes.len(),
            update,
        })
    }
}
