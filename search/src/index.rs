//! The indexed collection and its query pipeline.
//!
//! An index is built once from items, a key projection and a policy, and is
//! immutable afterwards except for the query cache, the lazy materializer
//! and telemetry. Queries are total: oversize input is truncated, empty
//! input yields empty results.

use std::sync::Arc;
use std::time::Instant;

use tracing::debug;

use hansearch_core::choseong::{self, ChoseongOptions};

use crate::cache::QueryCache;
use crate::cancel::{self, CancelToken, Cancelled};
use crate::lazy::LazyKeys;
use crate::ngram::NgramIndex;
use crate::rank::{RankedEntry, Ranker, SimilarityOptions};
use crate::score::{self, ScoreBreakdown, ScoreDetail, ScoreOptions};
use crate::telemetry::{OperationKind, Telemetry, TelemetrySnapshot};

/// Candidate scans check for cancellation every this many elements.
const SCAN_BATCH: usize = 16;

/// How items are matched against the projected query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchMode {
    Contains,
    Prefix,
    Exact,
}

impl MatchMode {
    pub fn matches(&self, key: &str, query: &str) -> bool {
        match self {
            MatchMode::Contains => key.contains(query),
            MatchMode::Prefix => key.starts_with(query),
            MatchMode::Exact => key == query,
        }
    }
}

/// Indexing structure for the choseong keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexStrategy {
    /// Choseong keys computed for every item at construction.
    Precompute,
    /// No precomputation; keys materialize on first demand.
    LazyCache,
    /// Precomputed keys plus an inverted k-gram index, k clamped to {2, 3}.
    Ngram { k: usize },
}

/// Query-result caching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    None,
    Lru { capacity: usize },
}

/// Whether a LazyCache index starts building its keys in the background.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LazyWarmup {
    None,
    Background,
}

/// Construction-time policy for a search index.
#[derive(Debug, Clone)]
pub struct SearchPolicy {
    pub choseong: ChoseongOptions,
    pub strategy: IndexStrategy,
    pub cache: CachePolicy,
    pub warmup: LazyWarmup,
    /// Queries longer than this many characters are truncated.
    pub max_query_length: Option<usize>,
    /// Candidate lists longer than this are truncated before scanning.
    pub max_candidate_scan: Option<usize>,
}

impl Default for SearchPolicy {
    fn default() -> Self {
        Self {
            choseong: ChoseongOptions::default(),
            strategy: IndexStrategy::Precompute,
            cache: CachePolicy::Lru { capacity: 256 },
            warmup: LazyWarmup::None,
            max_query_length: None,
            max_candidate_scan: None,
        }
    }
}

/// A similar-match result.
#[derive(Debug, Clone)]
pub struct ScoredResult<'a, T> {
    pub item: &'a T,
    pub key: &'a str,
    pub index: usize,
    pub score: ScoreBreakdown,
}

/// A similar-match result with full scoring detail.
#[derive(Debug, Clone)]
pub struct ExplainedResult<'a, T> {
    pub item: &'a T,
    pub key: &'a str,
    pub index: usize,
    pub score: ScoreBreakdown,
    /// The query variant that produced the winning score.
    pub variant: String,
    pub detail: ScoreDetail,
}

/// Immutable indexed collection over items with string keys.
pub struct SearchIndex<T> {
    items: Vec<T>,
    raw_keys: Vec<String>,
    normalized_keys: Arc<Vec<String>>,
    choseong_keys: Option<Vec<String>>,
    ngram: Option<NgramIndex>,
    lazy: LazyKeys,
    cache: Option<QueryCache>,
    policy: SearchPolicy,
    telemetry: Telemetry,
}

impl<T> SearchIndex<T> {
    /// Build an index from items, extracting each key once via `key_fn`.
    pub fn new<F>(items: Vec<T>, key_fn: F, policy: SearchPolicy) -> Self
    where
        F: Fn(&T) -> String,
    {
        let raw_keys: Vec<String> = items.iter().map(&key_fn).collect();
        let normalized_keys: Arc<Vec<String>> = Arc::new(
            raw_keys.iter().map(|k| choseong::normalized_token(k)).collect(),
        );

        let choseong_keys = match policy.strategy {
            IndexStrategy::Precompute | IndexStrategy::Ngram { .. } => Some(
                normalized_keys
                    .iter()
                    .map(|k| choseong::choseong(k, &policy.choseong))
                    .collect::<Vec<String>>(),
            ),
            IndexStrategy::LazyCache => None,
        };
        let ngram = match (policy.strategy, &choseong_keys) {
            (IndexStrategy::Ngram { k }, Some(keys)) => Some(NgramIndex::build(keys, k)),
            _ => None,
        };
        let cache = match policy.cache {
            CachePolicy::Lru { capacity } => Some(QueryCache::new(capacity)),
            CachePolicy::None => None,
        };

        let lazy = LazyKeys::new();
        if matches!(policy.strategy, IndexStrategy::LazyCache)
            && matches!(policy.warmup, LazyWarmup::Background)
        {
            let keys = Arc::clone(&normalized_keys);
            let opts = policy.choseong;
            lazy.start_background_build(move || {
                keys.iter().map(|k| choseong::choseong(k, &opts)).collect()
            });
        }

        Self {
            items,
            raw_keys,
            normalized_keys,
            choseong_keys,
            ngram,
            lazy,
            cache,
            policy,
            telemetry: Telemetry::new(),
        }
    }

    pub fn count(&self) -> usize {
        self.items.len()
    }

    pub fn policy(&self) -> &SearchPolicy {
        &self.policy
    }

    pub fn telemetry_snapshot(&self) -> TelemetrySnapshot {
        self.telemetry.snapshot()
    }

    pub fn reset_telemetry(&self) {
        self.telemetry.reset()
    }

    /// Synchronous choseong search. Total: never fails.
    pub fn search(&self, query: &str, mode: MatchMode) -> Vec<&T> {
        let started = Instant::now();
        let result = self
            .search_inner(query, mode, None)
            .unwrap_or_default();
        self.telemetry
            .record_success(OperationKind::SyncSearch, started.elapsed(), result.len());
        result
    }

    /// Cancellable choseong search, polling the token at phase boundaries
    /// and every 16 scanned candidates.
    pub fn search_cancellable(
        &self,
        query: &str,
        mode: MatchMode,
        token: &CancelToken,
    ) -> Result<Vec<&T>, Cancelled> {
        let started = Instant::now();
        match self.search_inner(query, mode, Some(token)) {
            Ok(result) => {
                self.telemetry.record_success(
                    OperationKind::AsyncSearch,
                    started.elapsed(),
                    result.len(),
                );
                Ok(result)
            }
            Err(Cancelled) => {
                self.telemetry
                    .record_cancelled(OperationKind::AsyncSearch, started.elapsed());
                Err(Cancelled)
            }
        }
    }

    /// Ranked similar search. Total: never fails.
    pub fn search_similar(&self, query: &str, opts: &SimilarityOptions) -> Vec<ScoredResult<'_, T>> {
        let started = Instant::now();
        let entries = self.rank_inner(query, opts, None).unwrap_or_default();
        let results: Vec<ScoredResult<'_, T>> =
            entries.into_iter().map(|e| self.scored_result(e)).collect();
        self.telemetry.record_success(
            OperationKind::SyncSimilar,
            started.elapsed(),
            results.len(),
        );
        results
    }

    /// Cancellable ranked similar search.
    pub fn search_similar_cancellable(
        &self,
        query: &str,
        opts: &SimilarityOptions,
        token: &CancelToken,
    ) -> Result<Vec<ScoredResult<'_, T>>, Cancelled> {
        let started = Instant::now();
        match self.rank_inner(query, opts, Some(token)) {
            Ok(entries) => {
                let results: Vec<ScoredResult<'_, T>> =
                    entries.into_iter().map(|e| self.scored_result(e)).collect();
                self.telemetry.record_success(
                    OperationKind::AsyncSimilar,
                    started.elapsed(),
                    results.len(),
                );
                Ok(results)
            }
            Err(Cancelled) => {
                self.telemetry
                    .record_cancelled(OperationKind::AsyncSimilar, started.elapsed());
                Err(Cancelled)
            }
        }
    }

    /// Ranked similar search with full scoring detail per result.
    pub fn explain_similar(
        &self,
        query: &str,
        opts: &SimilarityOptions,
    ) -> Vec<ExplainedResult<'_, T>> {
        let started = Instant::now();
        let entries = self.rank_inner(query, opts, None).unwrap_or_default();
        let results: Vec<ExplainedResult<'_, T>> = entries
            .into_iter()
            .map(|e| self.explained_result(e, opts))
            .collect();
        self.telemetry.record_success(
            OperationKind::SyncExplain,
            started.elapsed(),
            results.len(),
        );
        results
    }

    /// Cancellable explain.
    pub fn explain_similar_cancellable(
        &self,
        query: &str,
        opts: &SimilarityOptions,
        token: &CancelToken,
    ) -> Result<Vec<ExplainedResult<'_, T>>, Cancelled> {
        let started = Instant::now();
        match self.rank_inner(query, opts, Some(token)) {
            Ok(entries) => {
                let results: Vec<ExplainedResult<'_, T>> = entries
                    .into_iter()
                    .map(|e| self.explained_result(e, opts))
                    .collect();
                self.telemetry.record_success(
                    OperationKind::AsyncExplain,
                    started.elapsed(),
                    results.len(),
                );
                Ok(results)
            }
            Err(Cancelled) => {
                self.telemetry
                    .record_cancelled(OperationKind::AsyncExplain, started.elapsed());
                Err(Cancelled)
            }
        }
    }

    fn scored_result(&self, entry: RankedEntry) -> ScoredResult<'_, T> {
        let index = entry.index as usize;
        ScoredResult {
            item: &self.items[index],
            key: &self.raw_keys[index],
            index,
            score: entry.breakdown,
        }
    }

    fn explained_result(
        &self,
        entry: RankedEntry,
        opts: &SimilarityOptions,
    ) -> ExplainedResult<'_, T> {
        let index = entry.index as usize;
        let weights = opts.weights.clamped();
        let score_opts = ScoreOptions { weights: &weights, ngram_size: opts.ngram_size };
        let variant_norm = choseong::normalized_token(&entry.variant);
        let variant_choseong = choseong::choseong(&variant_norm, &self.policy.choseong);
        let key_choseong = self.choseong_key_of(index);
        let (_, detail) = score::explain(
            &variant_norm,
            &self.normalized_keys[index],
            &variant_choseong,
            &key_choseong,
            &score_opts,
        );
        ExplainedResult {
            item: &self.items[index],
            key: &self.raw_keys[index],
            index,
            score: entry.breakdown,
            variant: entry.variant,
            detail,
        }
    }

    /// Choseong key of one item, from whichever source currently has it.
    fn choseong_key_of(&self, index: usize) -> String {
        if let Some(keys) = &self.choseong_keys {
            return keys[index].clone();
        }
        if let Some(keys) = self.lazy.ready_keys() {
            return keys[index].clone();
        }
        choseong::choseong(&self.normalized_keys[index], &self.policy.choseong)
    }

    /// Truncate, normalize and project the query.
    fn bound_query(&self, query: &str) -> (String, String) {
        let bounded: String = match self.policy.max_query_length {
            Some(max) => query.chars().take(max).collect(),
            None => query.to_string(),
        };
        let normalized = choseong::normalized_token(&bounded);
        let projected = choseong::choseong(&normalized, &self.policy.choseong);
        (normalized, projected)
    }

    fn search_inner(
        &self,
        query: &str,
        mode: MatchMode,
        token: Option<&CancelToken>,
    ) -> Result<Vec<&T>, Cancelled> {
        cancel::check(token)?;
        let (normalized, projected) = self.bound_query(query);
        if projected.is_empty() {
            return Ok(Vec::new());
        }
        cancel::check(token)?;

        if let Some(cache) = &self.cache {
            if let Some(indices) = cache.get(mode, &normalized) {
                self.telemetry.record_cache_hit();
                debug!(query = normalized.as_str(), "query cache hit");
                return Ok(indices.iter().map(|&i| &self.items[i as usize]).collect());
            }
        }

        // Candidate indices from the strategy.
        let mut candidates: Vec<u32> = match self.ngram.as_ref().map(|n| n.candidates(&projected))
        {
            Some(Some(ids)) => ids,
            // No grams in the query: every index is a candidate.
            Some(None) | None => (0..self.items.len() as u32).collect(),
        };
        if let Some(max) = self.policy.max_candidate_scan {
            candidates.truncate(max);
        }
        cancel::check(token)?;

        // Resolve the choseong key source, then filter.
        let hits = match (&self.choseong_keys, token) {
            (Some(keys), _) => self.filter_candidates(&candidates, keys, mode, &projected, token)?,
            (None, None) => {
                let keys = self.lazy.get_or_build(|| self.compute_all_choseong());
                self.filter_candidates(&candidates, &keys, mode, &projected, token)?
            }
            (None, Some(_)) => {
                if let Some(keys) = self.lazy.ready_keys() {
                    self.filter_candidates(&candidates, &keys, mode, &projected, token)?
                } else {
                    self.filter_with_progressive_keys(&candidates, mode, &projected, token)?
                }
            }
        };

        if let Some(cache) = &self.cache {
            cache.put(mode, &normalized, hits.clone());
        }
        Ok(hits.iter().map(|&i| &self.items[i as usize]).collect())
    }

    fn compute_all_choseong(&self) -> Vec<String> {
        self.normalized_keys
            .iter()
            .map(|k| choseong::choseong(k, &self.policy.choseong))
            .collect()
    }

    fn filter_candidates(
        &self,
        candidates: &[u32],
        keys: &[String],
        mode: MatchMode,
        projected: &str,
        token: Option<&CancelToken>,
    ) -> Result<Vec<u32>, Cancelled> {
        let mut hits = Vec::new();
        for (scanned, &index) in candidates.iter().enumerate() {
            if scanned % SCAN_BATCH == 0 {
                cancel::check(token)?;
            }
            if mode.matches(&keys[index as usize], projected) {
                hits.push(index);
            }
        }
        Ok(hits)
    }

    /// LazyCache async path: materialize keys over the candidate subset,
    /// committing to the materializer only when the whole collection was
    /// covered. A cancelled run leaves the materializer untouched.
    fn filter_with_progressive_keys(
        &self,
        candidates: &[u32],
        mode: MatchMode,
        projected: &str,
        token: Option<&CancelToken>,
    ) -> Result<Vec<u32>, Cancelled> {
        let covers_all = candidates.len() == self.items.len();
        let mut hits = Vec::new();
        let mut built: Vec<String> =
            Vec::with_capacity(if covers_all { candidates.len() } else { 0 });
        for (scanned, &index) in candidates.iter().enumerate() {
            if scanned % SCAN_BATCH == 0 {
                cancel::check(token)?;
            }
            let key = choseong::choseong(
                &self.normalized_keys[index as usize],
                &self.policy.choseong,
            );
            if mode.matches(&key, projected) {
                hits.push(index);
            }
            if covers_all {
                built.push(key);
            }
        }
        if covers_all {
            self.lazy.store_built_keys_if_needed(built);
        }
        Ok(hits)
    }

    fn rank_inner(
        &self,
        query: &str,
        opts: &SimilarityOptions,
        token: Option<&CancelToken>,
    ) -> Result<Vec<RankedEntry>, Cancelled> {
        // Checkpoint before key materialization and variant generation.
        cancel::check(token)?;
        let (normalized, projected) = self.bound_query(query);
        if normalized.is_empty() && projected.is_empty() {
            return Ok(Vec::new());
        }

        // The pipeline needs the full choseong vector; LazyCache indexes
        // materialize it here (and only commit on full completion).
        let lazy_keys;
        let choseong_keys: &[String] = match &self.choseong_keys {
            Some(keys) => keys,
            None => {
                cancel::check(token)?;
                lazy_keys = match self.lazy.ready_keys() {
                    Some(keys) => keys,
                    None => match token {
                        None => self.lazy.get_or_build(|| self.compute_all_choseong()),
                        Some(_) => {
                            let built = self.compute_choseong_cancellable(token)?;
                            self.lazy.store_built_keys_if_needed(built);
                            self.lazy
                                .ready_keys()
                                .unwrap_or_else(|| Arc::new(Vec::new()))
                        }
                    },
                };
                &lazy_keys
            }
        };

        let ranker = Ranker {
            normalized_keys: &self.normalized_keys,
            choseong_keys,
            ngram: self.ngram.as_ref(),
            choseong_opts: &self.policy.choseong,
            max_candidate_scan: self.policy.max_candidate_scan,
            opts,
            token,
        };
        ranker.run(&normalized)
    }

    fn compute_choseong_cancellable(
        &self,
        token: Option<&CancelToken>,
    ) -> Result<Vec<String>, Cancelled> {
        let mut built = Vec::with_capacity(self.normalized_keys.len());
        for (scanned, key) in self.normalized_keys.iter().enumerate() {
            if scanned % SCAN_BATCH == 0 {
                cancel::check(token)?;
            }
            built.push(choseong::choseong(key, &self.policy.choseong));
        }
        Ok(built)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items(keys: &[&str]) -> Vec<String> {
        keys.iter().map(|s| s.to_string()).collect()
    }

    fn index_with(keys: &[&str], policy: SearchPolicy) -> SearchIndex<String> {
        SearchIndex::new(items(keys), |s| s.clone(), policy)
    }

    #[test]
    fn test_contains_search() {
        let index = index_with(&["프론트엔드", "백엔드", "데이터"], SearchPolicy::default());
        let hits = index.search("ㅍㄹㅌ", MatchMode::Contains);
        assert_eq!(hits, vec![&"프론트엔드".to_string()]);
    }

    #[test]
    fn test_prefix_and_exact_search() {
        let index = index_with(&["프론트", "프론트엔드", "백엔드"], SearchPolicy::default());
        let prefix = index.search("ㅍㄹㅌ", MatchMode::Prefix);
        assert_eq!(prefix, vec![&"프론트".to_string(), &"프론트엔드".to_string()]);
        let exact = index.search("ㅍㄹㅌㅇㄷ", MatchMode::Exact);
        assert_eq!(exact, vec![&"프론트엔드".to_string()]);
    }

    #[test]
    fn test_empty_query_yields_nothing() {
        let index = index_with(&["검색"], SearchPolicy::default());
        assert!(index.search("", MatchMode::Contains).is_empty());
        assert!(index.search("   ", MatchMode::Contains).is_empty());
    }

    #[test]
    fn test_query_truncation() {
        let policy = SearchPolicy { max_query_length: Some(2), ..Default::default() };
        let index = index_with(&["프론트엔드", "프로젝트"], policy);
        // Truncated to "프로", whose projection matches both keys.
        let hits = index.search("프로그래밍언어론", MatchMode::Prefix);
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn test_ngram_strategy_matches_precompute() {
        let keys = ["프론트엔드", "백엔드", "데이터", "검색엔진", "검색"];
        let plain = index_with(&keys, SearchPolicy::default());
        let ngram = index_with(
            &keys,
            SearchPolicy {
                strategy: IndexStrategy::Ngram { k: 2 },
                ..Default::default()
            },
        );
        for query in ["ㅇㄷ", "ㄱㅅ", "ㅍㄹㅌ", "ㄷㅇㅌ"] {
            for mode in [MatchMode::Contains, MatchMode::Prefix, MatchMode::Exact] {
                assert_eq!(
                    plain.search(query, mode),
                    ngram.search(query, mode),
                    "mismatch for {query}"
                );
            }
        }
    }

    #[test]
    fn test_lazy_strategy_sync_path() {
        let policy = SearchPolicy {
            strategy: IndexStrategy::LazyCache,
            ..Default::default()
        };
        let index = index_with(&["프론트엔드", "백엔드"], policy);
        assert!(index.lazy.ready_keys().is_none());
        let hits = index.search("ㅂㅇㄷ", MatchMode::Exact);
        assert_eq!(hits, vec![&"백엔드".to_string()]);
        // The inline build committed the key vector.
        assert!(index.lazy.ready_keys().is_some());
    }

    #[test]
    fn test_lazy_async_path_commits_on_full_coverage() {
        let policy = SearchPolicy {
            strategy: IndexStrategy::LazyCache,
            ..Default::default()
        };
        let index = index_with(&["프론트엔드", "백엔드"], policy);
        let token = CancelToken::new();
        let hits = index.search_cancellable("ㅍㄹㅌ", MatchMode::Contains, &token).unwrap();
        assert_eq!(hits, vec![&"프론트엔드".to_string()]);
        assert!(index.lazy.ready_keys().is_some());
    }

    #[test]
    fn test_cancelled_search_does_not_commit() {
        let policy = SearchPolicy {
            strategy: IndexStrategy::LazyCache,
            ..Default::default()
        };
        let index = index_with(&["프론트엔드", "백엔드"], policy);
        let token = CancelToken::new();
        token.cancel();
        assert_eq!(
            index.search_cancellable("ㅍㄹㅌ", MatchMode::Contains, &token),
            Err(Cancelled)
        );
        assert!(index.lazy.ready_keys().is_none());
        // Nothing was stored in the query cache either.
        assert_eq!(index.cache.as_ref().unwrap().len(), 0);
    }

    #[test]
    fn test_cache_hit_recorded() {
        let index = index_with(&["검색", "검사"], SearchPolicy::default());
        let first = index.search("ㄱㅅ", MatchMode::Contains);
        let second = index.search("ㄱㅅ", MatchMode::Contains);
        assert_eq!(first, second);
        let snap = index.telemetry_snapshot();
        assert_eq!(snap.cache_hit_count, 1);
        assert_eq!(snap.operations[0].success, 2);
    }

    #[test]
    fn test_max_candidate_scan_bounds_results() {
        let policy = SearchPolicy { max_candidate_scan: Some(1), ..Default::default() };
        let index = index_with(&["검색", "검사"], policy);
        let hits = index.search("ㄱㅅ", MatchMode::Contains);
        assert_eq!(hits, vec![&"검색".to_string()]);
    }

    #[test]
    fn test_search_similar_end_to_end() {
        let index = index_with(&["검색", "개발", "결제", "검사"], SearchPolicy::default());
        let opts = SimilarityOptions { limit: 3, minimum_score: 0.3, ..Default::default() };
        let results = index.search_similar("검삭", &opts);
        assert_eq!(results[0].key, "검색");
        assert!(results[0].score.total > 0.5);
    }

    #[test]
    fn test_explain_similar_carries_detail() {
        let index = index_with(&["검색", "검사"], SearchPolicy::default());
        let opts = SimilarityOptions { limit: 2, minimum_score: 0.3, ..Default::default() };
        let results = index.explain_similar("검삭", &opts);
        assert!(!results.is_empty());
        let top = &results[0];
        assert_eq!(top.key, "검색");
        assert_eq!(top.detail.normalized_target, "검색");
        assert_eq!(top.detail.edit_distance, 1);
        // The recomputed breakdown matches the pipeline's score.
        assert_eq!(top.score.total, results[0].score.total);
    }

    #[test]
    fn test_count_and_reset() {
        let index = index_with(&["a", "b", "c"], SearchPolicy::default());
        assert_eq!(index.count(), 3);
        index.search("a", MatchMode::Exact);
        index.reset_telemetry();
        assert_eq!(index.telemetry_snapshot().operations[0].success, 0);
    }
}
