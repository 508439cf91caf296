//! Reading aggregate slices out of the trie
//!
//! A query binds any subset of {matchType, mode, map, brawler} and names a
//! target dimension to enumerate. The reader picks the ordering whose
//! prefix structure answers that combination directly — the mirror image
//! of how the writer derived the paths — so every slice is one children
//! fetch or a handful of point reads, never a scan.

use super::paths::{last_segment, BRAWLER_MODE, BRAWLER_MODE_MAP, MODE_BRAWLER, MODE_MAP_BRAWLER};
use super::store::{StoreError, TrieNode, TrieStore};
use crate::match_core::outcome::{Attribute, MatchType, Scope};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;

#[derive(Debug)]
pub enum FetchError {
    Store(StoreError),
    /// Every non-type target needs the match type bound.
    MatchTypeRequired,
    /// The chosen ordering needs a dimension the query left unbound.
    IncompleteQuery(&'static str),
}

impl From<StoreError> for FetchError {
    fn from(err: StoreError) -> Self {
        FetchError::Store(err)
    }
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchError::Store(e) => write!(f, "Store error: {}", e),
            FetchError::MatchTypeRequired => {
                write!(f, "Match type must be bound unless it is the target")
            }
            FetchError::IncompleteQuery(dim) => {
                write!(f, "Query needs {} bound for this combination", dim)
            }
        }
    }
}

impl std::error::Error for FetchError {}

/// Which dimensions are bound and which one to enumerate.
#[derive(Debug, Clone, Default)]
pub struct TrieQuery {
    pub match_type: Option<MatchType>,
    pub mode: Option<String>,
    pub map: Option<String>,
    pub brawler: Option<String>,
    pub target: Option<Attribute>,
}

/// One materialized slice: the matching nodes plus, when a mode is bound
/// without a map, the maps that exist underneath it regardless of brawler.
#[derive(Debug, Clone, Serialize)]
pub struct TrieSlice {
    pub nodes: Vec<TrieNode>,
    pub potential_maps: Vec<String>,
}

/// A slice re-read under one recent filter ID.
#[derive(Debug, Clone, Serialize)]
pub struct RecentSlice {
    pub filter_id: String,
    pub slice: TrieSlice,
}

pub struct TrieReader {
    store: Arc<dyn TrieStore>,
}

impl TrieReader {
    pub fn new(store: Arc<dyn TrieStore>) -> Self {
        Self { store }
    }

    pub async fn fetch(
        &self,
        base_path: &str,
        filter_id: &str,
        query: &TrieQuery,
        scope: Scope,
    ) -> Result<TrieSlice, FetchError> {
        match query.target {
            Some(Attribute::MatchType) => {
                // Maps only materialize at this depth for players.
                let want_maps =
                    scope == Scope::Player && query.mode.is_some() && query.map.is_none();
                let mut nodes = Vec::new();
                let mut maps = BTreeSet::new();

                for match_type in MatchType::known() {
                    let path = format!(
                        "{base_path}${}",
                        path_for_type_target(match_type, query, scope)?
                    );
                    if let Some(node) = self.store.get_node(&path, filter_id).await? {
                        if want_maps {
                            for child in &node.children_path_ids {
                                maps.insert(last_segment(child).to_string());
                            }
                        }
                        nodes.push(node);
                    }
                }

                Ok(TrieSlice {
                    nodes,
                    potential_maps: maps.into_iter().collect(),
                })
            }
            Some(target) => {
                let match_type = query.match_type.ok_or(FetchError::MatchTypeRequired)?;
                let parent = format!(
                    "{base_path}${}",
                    path_for_target(target, match_type, query, scope)?
                );
                let nodes = self.fetch_children_nodes(&parent, filter_id).await?;

                let mut potential_maps = Vec::new();
                if scope == Scope::Player && query.mode.is_some() {
                    let map_parent = format!(
                        "{base_path}${}",
                        path_for_target(Attribute::Map, match_type, query, scope)?
                    );
                    potential_maps = self
                        .store
                        .get_children_paths(&map_parent, filter_id)
                        .await?
                        .iter()
                        .map(|path| last_segment(path).to_string())
                        .collect();
                }

                Ok(TrieSlice {
                    nodes,
                    potential_maps,
                })
            }
            None => {
                let match_type = query.match_type.ok_or(FetchError::MatchTypeRequired)?;
                let path = format!(
                    "{base_path}${}",
                    path_for_type_target(match_type, query, scope)?
                );
                let nodes = self
                    .store
                    .get_node(&path, filter_id)
                    .await?
                    .into_iter()
                    .collect();
                Ok(TrieSlice {
                    nodes,
                    potential_maps: Vec::new(),
                })
            }
        }
    }

    /// Re-run `fetch` once per recent filter ID under the base path
    /// (time-sliced snapshot scans). Newest first.
    pub async fn fetch_recent(
        &self,
        base_path: &str,
        count: usize,
        query: &TrieQuery,
        scope: Scope,
    ) -> Result<Vec<RecentSlice>, FetchError> {
        let filter_ids = self.store.recent_filter_ids(base_path, count).await?;

        let mut slices = Vec::with_capacity(filter_ids.len());
        for filter_id in filter_ids {
            let slice = self.fetch(base_path, &filter_id, query, scope).await?;
            slices.push(RecentSlice { filter_id, slice });
        }
        Ok(slices)
    }

    /// Delete a node and every descendant reachable through
    /// childrenPathIDs. Returns the number of nodes removed. Cycles and
    /// self-references are skipped via the visited set.
    pub async fn delete_subtree(
        &self,
        path_id: &str,
        filter_id: &str,
    ) -> Result<usize, StoreError> {
        let mut seen: BTreeSet<String> = BTreeSet::new();
        seen.insert(path_id.to_string());
        let mut stack = vec![path_id.to_string()];
        let mut order = Vec::new();

        while let Some(path) = stack.pop() {
            for child in self.store.get_children_paths(&path, filter_id).await? {
                if seen.insert(child.clone()) {
                    stack.push(child);
                }
            }
            order.push(path);
        }

        // Reverse discovery order deletes descendants before their parents.
        for path in order.iter().rev() {
            self.store.delete_node(path, filter_id).await?;
            log::debug!("deleted trie node {}", path);
        }
        Ok(order.len())
    }

    async fn fetch_children_nodes(
        &self,
        parent_path: &str,
        filter_id: &str,
    ) -> Result<Vec<TrieNode>, FetchError> {
        let children = self
            .store
            .get_children_paths(parent_path, filter_id)
            .await?;
        let keys: Vec<(String, String)> = children
            .into_iter()
            .map(|child| (child, filter_id.to_string()))
            .collect();
        Ok(self.store.batch_get(&keys).await?)
    }
}

/// Parent path (relative to the base) whose children enumerate `target`,
/// given a bound match type. Chooses among the materialized orderings by
/// which other dimensions are bound.
fn path_for_target(
    target: Attribute,
    match_type: MatchType,
    query: &TrieQuery,
    scope: Scope,
) -> Result<String, FetchError> {
    let t = match_type.as_str();
    match target {
        Attribute::Brawler => {
            if let Some(map) = &query.map {
                let mode = query.mode.as_deref().ok_or(FetchError::IncompleteQuery("mode"))?;
                Ok(format!("{MODE_MAP_BRAWLER}${t}${mode}${map}"))
            } else if let Some(mode) = &query.mode {
                Ok(format!("{MODE_BRAWLER}${t}${mode}"))
            } else if scope.is_global() {
                Ok(format!("{BRAWLER_MODE}${t}"))
            } else {
                Ok(format!("{BRAWLER_MODE_MAP}${t}"))
            }
        }
        Attribute::Mode => {
            if let Some(brawler) = &query.brawler {
                if scope.is_global() {
                    Ok(format!("{BRAWLER_MODE}${t}${brawler}"))
                } else {
                    Ok(format!("{BRAWLER_MODE_MAP}${t}${brawler}"))
                }
            } else if scope.is_global() {
                Ok(format!("{MODE_BRAWLER}${t}"))
            } else {
                Ok(format!("{MODE_MAP_BRAWLER}${t}"))
            }
        }
        Attribute::Map => {
            if let Some(brawler) = &query.brawler {
                let mode = query.mode.as_deref().ok_or(FetchError::IncompleteQuery("mode"))?;
                Ok(format!("{BRAWLER_MODE_MAP}${t}${brawler}${mode}"))
            } else {
                let mode = query.mode.as_deref().ok_or(FetchError::IncompleteQuery("mode"))?;
                Ok(format!("{MODE_MAP_BRAWLER}${t}${mode}"))
            }
        }
        Attribute::MatchType => unreachable!("type targets use path_for_type_target"),
    }
}

/// Exact node path (relative to the base) for a fully- or partially-bound
/// combination under one match type — used when the type itself is being
/// enumerated or when no target is requested.
fn path_for_type_target(
    match_type: MatchType,
    query: &TrieQuery,
    scope: Scope,
) -> Result<String, FetchError> {
    let t = match_type.as_str();
    if let Some(brawler) = &query.brawler {
        if let Some(map) = &query.map {
            let mode = query.mode.as_deref().ok_or(FetchError::IncompleteQuery("mode"))?;
            Ok(format!("{BRAWLER_MODE_MAP}${t}${brawler}${mode}${map}"))
        } else if let Some(mode) = &query.mode {
            if scope.is_global() {
                Ok(format!("{MODE_BRAWLER}${t}${mode}${brawler}"))
            } else {
                Ok(format!("{BRAWLER_MODE_MAP}${t}${brawler}${mode}"))
            }
        } else if scope.is_global() {
            Ok(format!("{BRAWLER_MODE}${t}${brawler}"))
        } else {
            Ok(format!("{BRAWLER_MODE_MAP}${t}${brawler}"))
        }
    } else if let Some(mode) = &query.mode {
        if let Some(map) = &query.map {
            Ok(format!("{MODE_MAP_BRAWLER}${t}${mode}${map}"))
        } else if scope.is_global() {
            Ok(format!("{MODE_BRAWLER}${t}${mode}"))
        } else {
            Ok(format!("{MODE_MAP_BRAWLER}${t}${mode}"))
        }
    } else if scope.is_global() {
        // The bare type prefix that actually accumulates stats differs by
        // scope: modeBrawler is only updated at this depth globally, and
        // modeMapBrawler only exists for players.
        Ok(format!("{MODE_BRAWLER}${t}"))
    } else {
        Ok(format!("{MODE_MAP_BRAWLER}${t}"))
    }
}
