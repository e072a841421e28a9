//! Ranking pipeline for similar-match queries.
//!
//! For each query variant: candidate lookup, a cheap strong/coarse prefilter
//! when the pool needs truncation, full scoring (parallel when the pool is
//! large and no cancellation token is attached), then aggregation under a
//! monotonically non-decreasing score gate.

use std::sync::Mutex;

use ahash::AHashMap;
use rayon::prelude::*;
use tracing::debug;

use hansearch_core::choseong::{self, ChoseongOptions};
use hansearch_core::layout;

use crate::cancel::{self, CancelToken, Cancelled};
use crate::ngram::NgramIndex;
use crate::score::{self, ScoreBreakdown, ScoreOptions};
use crate::weights::SimilarityWeights;

/// Options for `search_similar` / `explain_similar`.
#[derive(Debug, Clone)]
pub struct SimilarityOptions {
    /// Maximum number of results.
    pub limit: usize,
    /// k for the choseong k-gram Jaccard signal, clamped to {2, 3}.
    pub ngram_size: usize,
    /// Scoring-pool size per variant (floored at `limit * 10`).
    pub candidate_limit_per_variant: usize,
    /// Also try the query converted under the Korean↔QWERTY layout.
    pub include_layout_variants: bool,
    /// Results below this total are never returned; also seeds the gate.
    pub minimum_score: f64,
    pub weights: SimilarityWeights,
}

impl Default for SimilarityOptions {
    fn default() -> Self {
        Self {
            limit: 5,
            ngram_size: 2,
            candidate_limit_per_variant: 64,
            include_layout_variants: true,
            minimum_score: 0.2,
            weights: SimilarityWeights::default(),
        }
    }
}

/// One surviving candidate with its winning variant.
#[derive(Debug, Clone)]
pub(crate) struct RankedEntry {
    pub index: u32,
    pub breakdown: ScoreBreakdown,
    pub variant: String,
}

/// Kept-entry multiplier for the per-variant trim.
const TRIM_FACTOR: usize = 6;

/// Serial scoring checks for cancellation every this many entries.
const SCORE_BATCH: usize = 32;

/// Candidate scans check for cancellation every this many elements.
const SCAN_BATCH: usize = 16;

/// Minimum candidates per rayon worker before scoring goes parallel.
const PARALLEL_MIN_PER_WORKER: usize = 256;

#[derive(Debug, Clone, Copy)]
struct Candidate {
    index: u32,
    strong: bool,
    /// Coarse score when the prefilter computed one.
    coarse: Option<f64>,
}

/// Borrowed view of the index data the pipeline needs.
pub(crate) struct Ranker<'a> {
    pub normalized_keys: &'a [String],
    pub choseong_keys: &'a [String],
    pub ngram: Option<&'a NgramIndex>,
    pub choseong_opts: &'a ChoseongOptions,
    pub max_candidate_scan: Option<usize>,
    pub opts: &'a SimilarityOptions,
    pub token: Option<&'a CancelToken>,
}

impl Ranker<'_> {
    pub fn run(&self, normalized_query: &str) -> Result<Vec<RankedEntry>, Cancelled> {
        let limit = self.opts.limit.max(1);
        let weights = self.opts.weights.clamped();
        let score_opts = ScoreOptions { weights: &weights, ngram_size: self.opts.ngram_size };

        cancel::check(self.token)?;
        let variants = self.variants(normalized_query);

        let mut best: AHashMap<u32, (ScoreBreakdown, usize)> = AHashMap::new();
        let initial_gate = self.opts.minimum_score;
        let mut gate = initial_gate;

        for (variant_index, variant) in variants.iter().enumerate() {
            cancel::check(self.token)?;
            let normalized_variant = choseong::normalized_token(variant);
            if normalized_variant.is_empty() {
                continue;
            }
            let variant_choseong = choseong::choseong(&normalized_variant, self.choseong_opts);

            let base = self.base_candidates(&variant_choseong);
            let target = self.opts.candidate_limit_per_variant.max(limit * 10);
            let (pool, cutoff_exempt) = if base.len() > target {
                self.prefilter(&base, &normalized_variant, &variant_choseong, target, limit)?
            } else {
                let pool = base
                    .iter()
                    .map(|&index| Candidate {
                        index,
                        strong: self.is_strong(index, &normalized_variant, &variant_choseong),
                        coarse: None,
                    })
                    .collect();
                (pool, false)
            };

            let coarse_cutoff = (gate * 0.6).max(0.05);
            let scored = self.score_pool(
                &pool,
                cutoff_exempt,
                &normalized_variant,
                &variant_choseong,
                &score_opts,
                coarse_cutoff,
                gate,
            )?;
            debug!(
                variant = variant.as_str(),
                pool = pool.len(),
                survivors = scored.len(),
                gate,
                "scored variant"
            );

            for (index, breakdown) in scored {
                match best.get(&index) {
                    // Strictly-greater overwrites; ties keep the first seen.
                    Some((existing, _)) if existing.total >= breakdown.total => {}
                    _ => {
                        best.insert(index, (breakdown, variant_index));
                    }
                }
            }

            // Trim the running set, then raise the gate to the k-th best.
            let cap = (limit * TRIM_FACTOR).max(256);
            if best.len() > cap {
                let mut entries: Vec<(u32, (ScoreBreakdown, usize))> = best.drain().collect();
                entries.sort_by(|a, b| {
                    b.1 .0
                        .total
                        .partial_cmp(&a.1 .0.total)
                        .unwrap_or(std::cmp::Ordering::Equal)
                        .then(a.0.cmp(&b.0))
                });
                entries.truncate(limit * TRIM_FACTOR);
                best = entries.into_iter().collect();
            }
            if best.len() >= limit {
                if let Some(kth) = kth_highest_total(&best, limit) {
                    gate = gate.max(kth);
                }
            }
        }

        let mut entries: Vec<(u32, (ScoreBreakdown, usize))> = best.into_iter().collect();
        entries.sort_by(|a, b| {
            b.1 .0
                .total
                .partial_cmp(&a.1 .0.total)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        entries.truncate(limit);
        Ok(entries
            .into_iter()
            .map(|(index, (breakdown, variant_index))| RankedEntry {
                index,
                breakdown,
                variant: variants[variant_index].clone(),
            })
            .collect())
    }

    /// The query plus its layout conversions, deduplicated in first-seen order.
    fn variants(&self, normalized_query: &str) -> Vec<String> {
        let mut variants = vec![normalized_query.to_string()];
        if self.opts.include_layout_variants {
            variants.push(layout::convert_qwerty_to_hangul(normalized_query));
            variants.push(layout::convert_hangul_to_qwerty(normalized_query));
        }
        let mut seen = Vec::new();
        for v in variants {
            if !seen.contains(&v) {
                seen.push(v);
            }
        }
        seen
    }

    fn base_candidates(&self, variant_choseong: &str) -> Vec<u32> {
        let mut base = match self.ngram.and_then(|n| n.candidates(variant_choseong)) {
            Some(ids) => ids,
            None => (0..self.normalized_keys.len() as u32).collect(),
        };
        if let Some(max) = self.max_candidate_scan {
            base.truncate(max);
        }
        base
    }

    fn is_strong(&self, index: u32, variant: &str, variant_choseong: &str) -> bool {
        let key = &self.normalized_keys[index as usize];
        let key_choseong = &self.choseong_keys[index as usize];
        (!variant.is_empty() && key.contains(variant))
            || (!variant_choseong.is_empty() && key_choseong.contains(variant_choseong))
    }

    /// One pass over the base set classifying strong vs coarse candidates,
    /// keeping all strong and topping up with the best coarse until `target`.
    /// When both classes are empty the first `limit` of the base are scored
    /// unconditionally.
    fn prefilter(
        &self,
        base: &[u32],
        variant: &str,
        variant_choseong: &str,
        target: usize,
        limit: usize,
    ) -> Result<(Vec<Candidate>, bool), Cancelled> {
        let mut strong: Vec<u32> = Vec::new();
        let mut coarse: Vec<(u32, f64)> = Vec::new();
        for (scanned, &index) in base.iter().enumerate() {
            if scanned % SCAN_BATCH == 0 {
                cancel::check(self.token)?;
            }
            if self.is_strong(index, variant, variant_choseong) {
                strong.push(index);
            } else {
                let c = score::coarse_similarity(
                    variant,
                    variant_choseong,
                    &self.normalized_keys[index as usize],
                    &self.choseong_keys[index as usize],
                );
                if c > 0.0 {
                    coarse.push((index, c));
                }
            }
        }

        if strong.is_empty() && coarse.is_empty() {
            let pool = base
                .iter()
                .take(limit)
                .map(|&index| Candidate { index, strong: false, coarse: Some(0.0) })
                .collect();
            return Ok((pool, true));
        }

        strong.sort_by(|&a, &b| {
            let la = self.normalized_keys[a as usize].chars().count();
            let lb = self.normalized_keys[b as usize].chars().count();
            la.cmp(&lb).then(a.cmp(&b))
        });
        coarse.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });

        let mut pool: Vec<Candidate> = Vec::with_capacity(target);
        for index in strong.into_iter().take(target) {
            pool.push(Candidate { index, strong: true, coarse: None });
        }
        for (index, c) in coarse {
            if pool.len() >= target {
                break;
            }
            pool.push(Candidate { index, strong: false, coarse: Some(c) });
        }
        Ok((pool, false))
    }

    #[allow(clippy::too_many_arguments)]
    fn score_pool(
        &self,
        pool: &[Candidate],
        cutoff_exempt: bool,
        variant: &str,
        variant_choseong: &str,
        score_opts: &ScoreOptions<'_>,
        coarse_cutoff: f64,
        gate: f64,
    ) -> Result<Vec<(u32, ScoreBreakdown)>, Cancelled> {
        let workers = rayon::current_num_threads().max(1);
        let parallel = self.token.is_none() && pool.len() >= PARALLEL_MIN_PER_WORKER * workers;

        if parallel {
            let collected: Mutex<Vec<(u32, ScoreBreakdown)>> = Mutex::new(Vec::new());
            pool.par_chunks(PARALLEL_MIN_PER_WORKER).for_each(|chunk| {
                let mut local: Vec<(u32, ScoreBreakdown)> = Vec::new();
                for candidate in chunk {
                    if let Some(entry) = self.score_one(
                        candidate,
                        cutoff_exempt,
                        variant,
                        variant_choseong,
                        score_opts,
                        coarse_cutoff,
                        gate,
                    ) {
                        local.push(entry);
                    }
                }
                collected.lock().unwrap().append(&mut local);
            });
            let mut scored = collected.into_inner().unwrap();
            // Worker arrival order is nondeterministic; restore index order.
            scored.sort_by_key(|e| e.0);
            Ok(scored)
        } else {
            let mut scored = Vec::new();
            for (n, candidate) in pool.iter().enumerate() {
                if n % SCORE_BATCH == 0 {
                    cancel::check(self.token)?;
                }
                if let Some(entry) = self.score_one(
                    candidate,
                    cutoff_exempt,
                    variant,
                    variant_choseong,
                    score_opts,
                    coarse_cutoff,
                    gate,
                ) {
                    scored.push(entry);
                }
            }
            Ok(scored)
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn score_one(
        &self,
        candidate: &Candidate,
        cutoff_exempt: bool,
        variant: &str,
        variant_choseong: &str,
        score_opts: &ScoreOptions<'_>,
        coarse_cutoff: f64,
        gate: f64,
    ) -> Option<(u32, ScoreBreakdown)> {
        let index = candidate.index as usize;
        let key = &self.normalized_keys[index];
        let key_choseong = &self.choseong_keys[index];

        if !candidate.strong && !cutoff_exempt {
            let c = candidate.coarse.unwrap_or_else(|| {
                score::coarse_similarity(variant, variant_choseong, key, key_choseong)
            });
            if c < coarse_cutoff {
                return None;
            }
        }

        let breakdown = score::score(variant, key, variant_choseong, key_choseong, score_opts);
        if breakdown.total >= self.opts.minimum_score && breakdown.total >= gate {
            Some((candidate.index, breakdown))
        } else {
            None
        }
    }
}

fn kth_highest_total(best: &AHashMap<u32, (ScoreBreakdown, usize)>, k: usize) -> Option<f64> {
    if best.len() < k || k == 0 {
        return None;
    }
    let mut totals: Vec<f64> = best.values().map(|(b, _)| b.total).collect();
    totals.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
    totals.get(k - 1).copied()
}
