//! Multi-signal similarity scorer.
//!
//! `score` is the hot path used by the ranking pipeline; `explain` recomputes
//! the same breakdown together with the intermediate material (jamo streams,
//! raw distances, gram counts) for the explain surface.

use std::collections::HashSet;

use hansearch_core::choseong;
use hansearch_core::jamo;

use crate::metrics;
use crate::ngram;
use crate::weights::SimilarityWeights;

/// Floor for the core-weight mixture denominator.
const CORE_SUM_FLOOR: f64 = 1e-6;

/// Scorer configuration shared across one ranking run.
#[derive(Debug, Clone, Copy)]
pub struct ScoreOptions<'a> {
    pub weights: &'a SimilarityWeights,
    pub ngram_size: usize,
}

/// Per-signal score components.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreBreakdown {
    pub edit_sim: f64,
    pub jaccard_sim: f64,
    pub keyboard_sim: f64,
    pub jamo_sim: f64,
    pub prefix_bonus: f64,
    pub exact_bonus: f64,
    pub weighted_core: f64,
    pub total: f64,
}

/// Intermediate material behind a breakdown, for the explain surface.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreDetail {
    pub normalized_query: String,
    pub normalized_target: String,
    pub query_choseong: String,
    pub target_choseong: String,
    pub query_jamo: String,
    pub target_jamo: String,
    pub edit_distance: usize,
    pub jamo_distance: usize,
    pub query_gram_count: usize,
    pub target_gram_count: usize,
    pub shared_gram_count: usize,
}

/// Score a (query, target) pair given both choseong projections.
pub fn score(
    query: &str,
    target: &str,
    query_choseong: &str,
    target_choseong: &str,
    opts: &ScoreOptions<'_>,
) -> ScoreBreakdown {
    compute(query, target, query_choseong, target_choseong, opts).0
}

/// Score with full intermediate detail.
pub fn explain(
    query: &str,
    target: &str,
    query_choseong: &str,
    target_choseong: &str,
    opts: &ScoreOptions<'_>,
) -> (ScoreBreakdown, ScoreDetail) {
    let (breakdown, detail) = compute(query, target, query_choseong, target_choseong, opts);
    (breakdown, detail)
}

fn compute(
    query: &str,
    target: &str,
    query_choseong: &str,
    target_choseong: &str,
    opts: &ScoreOptions<'_>,
) -> (ScoreBreakdown, ScoreDetail) {
    let weights = opts.weights;
    let left = choseong::normalized_token(query);
    let right = choseong::normalized_token(target);
    let left_chars: Vec<char> = left.chars().collect();
    let right_chars: Vec<char> = right.chars().collect();

    let edit_distance = metrics::levenshtein(&left_chars, &right_chars);
    let edit_sim = similarity_from(edit_distance, left_chars.len().max(right_chars.len()));

    let k = ngram::clamp_k(opts.ngram_size);
    let query_grams: HashSet<String> = metrics::kgrams(query_choseong, k);
    let target_grams: HashSet<String> = metrics::kgrams(target_choseong, k);
    let shared_gram_count = query_grams.intersection(&target_grams).count();
    let jaccard_sim = if query_grams.is_empty() || target_grams.is_empty() {
        // Too short for grams: fall back to projection equality.
        if query_choseong == target_choseong {
            1.0
        } else {
            0.0
        }
    } else {
        metrics::jaccard(&query_grams, &target_grams)
    };

    let keyboard_sim = metrics::keyboard_similarity(&left, &right);

    let query_jamo = jamo::decompose_to_jamo_stream(&left);
    let target_jamo = jamo::decompose_to_jamo_stream(&right);
    let (jamo_sim, jamo_distance) = if query_jamo.is_empty() || target_jamo.is_empty() {
        // No Hangul on one side: degrade to raw-string distance.
        (edit_sim, edit_distance)
    } else {
        let d = metrics::levenshtein(&query_jamo, &target_jamo);
        (similarity_from(d, query_jamo.len().max(target_jamo.len())), d)
    };

    let core_sum = weights.core_sum().max(CORE_SUM_FLOOR);
    let weighted_core = (edit_sim * weights.edit_distance
        + jaccard_sim * weights.jaccard
        + keyboard_sim * weights.keyboard
        + jamo_sim * weights.jamo)
        / core_sum;

    let exact_bonus = if left == right { weights.exact } else { 0.0 };
    let prefix_bonus = if exact_bonus == 0.0
        && (right.starts_with(&left) || target_choseong.starts_with(query_choseong))
    {
        weights.prefix
    } else {
        0.0
    };

    let total = (weighted_core + exact_bonus + prefix_bonus).clamp(0.0, 1.0);

    let breakdown = ScoreBreakdown {
        edit_sim,
        jaccard_sim,
        keyboard_sim,
        jamo_sim,
        prefix_bonus,
        exact_bonus,
        weighted_core,
        total,
    };
    let detail = ScoreDetail {
        normalized_query: left,
        normalized_target: right,
        query_choseong: query_choseong.to_string(),
        target_choseong: target_choseong.to_string(),
        query_jamo: query_jamo.into_iter().collect(),
        target_jamo: target_jamo.into_iter().collect(),
        edit_distance,
        jamo_distance,
        query_gram_count: query_grams.len(),
        target_gram_count: target_grams.len(),
        shared_gram_count,
    };
    (breakdown, detail)
}

fn similarity_from(distance: usize, max_len: usize) -> f64 {
    if max_len == 0 {
        return 1.0;
    }
    1.0 - distance as f64 / max_len as f64
}

/// Cheap prefilter score: character-set overlap on the choseong projections
/// (raw strings when either projection is empty), a length-closeness term
/// and a first-character bonus. Zero overlap short-circuits to 0.
pub fn coarse_similarity(
    query: &str,
    query_choseong: &str,
    key: &str,
    key_choseong: &str,
) -> f64 {
    let (a, b) = if query_choseong.is_empty() || key_choseong.is_empty() {
        (query, key)
    } else {
        (query_choseong, key_choseong)
    };
    let overlap = metrics::char_jaccard(a, b);
    if overlap == 0.0 {
        return 0.0;
    }
    let (la, lb) = (a.chars().count(), b.chars().count());
    let length_closeness = la.min(lb) as f64 / la.max(lb) as f64;
    let first_bonus = match (a.chars().next(), b.chars().next()) {
        (Some(x), Some(y)) if x == y => 0.1,
        _ => 0.0,
    };
    (0.65 * overlap + 0.35 * length_closeness + first_bonus).min(1.0)
}
