//! Feedback-driven weight evaluation and tuning.
//!
//! The evaluator ranks every training sample against an index built from the
//! sample keys; the tuner searches a candidate grid around the base weights
//! (deterministic scalings plus seeded random perturbations) and keeps the
//! best objective.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tracing::info;

use crate::deploy::{Bucket, DeploymentConfig, Environment};
use crate::error::SearchError;
use crate::feedback::{aggregate_training_samples, FeedbackEvent, TrainingSample};
use crate::index::{CachePolicy, SearchIndex, SearchPolicy};
use crate::rank::SimilarityOptions;
use crate::weights::SimilarityWeights;

/// Options for `evaluate_similarity` / `tune_similarity_weights`.
#[derive(Debug, Clone)]
pub struct SimilarityTuningOptions {
    pub base_weights: SimilarityWeights,
    pub limit: usize,
    pub ngram_size: usize,
    pub candidate_limit_per_variant: usize,
    pub include_layout_variants: bool,
    pub minimum_score: f64,
    /// Upper bound on evaluated weight candidates.
    pub max_candidates: usize,
    pub leaderboard_size: usize,
    /// Seed for the deterministic random perturbations.
    pub seed: u64,
}

impl Default for SimilarityTuningOptions {
    fn default() -> Self {
        Self {
            base_weights: SimilarityWeights::default(),
            limit: 5,
            ngram_size: 2,
            candidate_limit_per_variant: 64,
            include_layout_variants: true,
            minimum_score: 0.2,
            max_candidates: 48,
            leaderboard_size: 10,
            seed: 42,
        }
    }
}

/// Retrieval quality over a sample set.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TuningMetrics {
    pub top1: f64,
    pub top3: f64,
    pub mrr: f64,
    pub hit_rate: f64,
}

impl TuningMetrics {
    /// The scalar the tuner maximizes.
    pub fn objective(&self) -> f64 {
        0.5 * self.mrr + 0.35 * self.top1 + 0.15 * self.top3
    }
}

#[derive(Debug, Clone)]
pub struct LeaderboardEntry {
    pub weights: SimilarityWeights,
    pub metrics: TuningMetrics,
    pub objective: f64,
}

#[derive(Debug, Clone)]
pub struct TuningOutcome {
    pub best_weights: SimilarityWeights,
    pub baseline: TuningMetrics,
    pub best: TuningMetrics,
    pub leaderboard: Vec<LeaderboardEntry>,
}

/// Options for the nightly pipeline.
#[derive(Debug, Clone)]
pub struct NightlyOptions {
    pub environment: Environment,
    pub target_bucket: Bucket,
    /// Minimum pair count for a training sample.
    pub min_occurrences: u64,
    pub max_samples: usize,
    pub model_version_prefix: String,
    pub tuning: SimilarityTuningOptions,
}

impl Default for NightlyOptions {
    fn default() -> Self {
        Self {
            environment: Environment::Production,
            target_bucket: Bucket::Treatment,
            min_occurrences: 2,
            max_samples: 200,
            model_version_prefix: "tuned".to_string(),
            tuning: SimilarityTuningOptions::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NightlyOutcome {
    pub config: DeploymentConfig,
    pub tuning: TuningOutcome,
    pub samples_used: usize,
}

/// 64-bit LCG (Knuth MMIX constants) behind the random perturbations.
struct Lcg {
    state: u64,
}

impl Lcg {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        self.state
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn range(&mut self, lo: f64, hi: f64) -> f64 {
        lo + self.next_f64() * (hi - lo)
    }
}

struct Evaluator {
    index: SearchIndex<String>,
}

impl Evaluator {
    /// Index over the distinct sample keys, sorted for determinism.
    fn new(samples: &[TrainingSample]) -> Self {
        let mut keys: Vec<String> = samples.iter().map(|s| s.selected_key.clone()).collect();
        keys.sort();
        keys.dedup();
        let policy = SearchPolicy { cache: CachePolicy::None, ..Default::default() };
        Self {
            index: SearchIndex::new(keys, |k| k.clone(), policy),
        }
    }

    fn evaluate(
        &self,
        samples: &[TrainingSample],
        opts: &SimilarityTuningOptions,
        weights: &SimilarityWeights,
    ) -> TuningMetrics {
        if samples.is_empty() {
            return TuningMetrics::default();
        }
        let similarity = SimilarityOptions {
            limit: opts.limit,
            ngram_size: opts.ngram_size,
            candidate_limit_per_variant: opts.candidate_limit_per_variant,
            include_layout_variants: opts.include_layout_variants,
            minimum_score: opts.minimum_score,
            weights: weights.clamped(),
        };
        let mut metrics = TuningMetrics::default();
        for sample in samples {
            let results = self.index.search_similar(&sample.query, &similarity);
            let rank = results.iter().position(|r| r.key == sample.selected_key);
            if let Some(rank) = rank {
                metrics.hit_rate += 1.0;
                metrics.mrr += 1.0 / (rank + 1) as f64;
                if rank == 0 {
                    metrics.top1 += 1.0;
                }
                if rank < 3 {
                    metrics.top3 += 1.0;
                }
            }
        }
        let n = samples.len() as f64;
        TuningMetrics {
            top1: metrics.top1 / n,
            top3: metrics.top3 / n,
            mrr: metrics.mrr / n,
            hit_rate: metrics.hit_rate / n,
        }
    }
}

/// Evaluate the base weights over a sample set.
pub fn evaluate_similarity(
    samples: &[TrainingSample],
    opts: &SimilarityTuningOptions,
) -> TuningMetrics {
    let evaluator = Evaluator::new(samples);
    evaluator.evaluate(samples, opts, &opts.base_weights.clamped())
}

const CORE_FACTORS: [f64; 5] = [0.65, 0.8, 1.0, 1.2, 1.35];
const BONUS_FACTORS: [f64; 5] = [0.5, 0.8, 1.0, 1.2, 1.5];

fn push_candidate(
    out: &mut Vec<SimilarityWeights>,
    seen: &mut HashSet<String>,
    max_candidates: usize,
    weights: SimilarityWeights,
) {
    if out.len() >= max_candidates {
        return;
    }
    let clamped = weights.clamped();
    if seen.insert(clamped.fingerprint()) {
        out.push(clamped);
    }
}

/// The candidate grid: the base, single- and all-core scalings, bonus
/// scalings, then seeded random perturbations up to `max_candidates`.
fn candidate_weights(
    base: &SimilarityWeights,
    max_candidates: usize,
    seed: u64,
) -> Vec<SimilarityWeights> {
    let mut out = Vec::new();
    let mut seen = HashSet::new();
    push_candidate(&mut out, &mut seen, max_candidates, *base);

    for &factor in &CORE_FACTORS {
        push_candidate(
            &mut out,
            &mut seen,
            max_candidates,
            SimilarityWeights { edit_distance: base.edit_distance * factor, ..*base },
        );
        push_candidate(
            &mut out,
            &mut seen,
            max_candidates,
            SimilarityWeights { jaccard: base.jaccard * factor, ..*base },
        );
        push_candidate(
            &mut out,
            &mut seen,
            max_candidates,
            SimilarityWeights { keyboard: base.keyboard * factor, ..*base },
        );
        push_candidate(
            &mut out,
            &mut seen,
            max_candidates,
            SimilarityWeights { jamo: base.jamo * factor, ..*base },
        );
        push_candidate(
            &mut out,
            &mut seen,
            max_candidates,
            SimilarityWeights {
                edit_distance: base.edit_distance * factor,
                jaccard: base.jaccard * factor,
                keyboard: base.keyboard * factor,
                jamo: base.jamo * factor,
                ..*base
            },
        );
    }
    for &factor in &BONUS_FACTORS {
        push_candidate(
            &mut out,
            &mut seen,
            max_candidates,
            SimilarityWeights {
                prefix: base.prefix * factor,
                exact: base.exact * factor,
                ..*base
            },
        );
    }

    let mut rng = Lcg::new(seed);
    let mut attempts = 0usize;
    while out.len() < max_candidates && attempts < max_candidates * 20 {
        attempts += 1;
        let perturbed = SimilarityWeights {
            edit_distance: base.edit_distance * rng.range(0.5, 1.5),
            jaccard: base.jaccard * rng.range(0.5, 1.5),
            keyboard: base.keyboard * rng.range(0.5, 1.5),
            jamo: base.jamo * rng.range(0.5, 1.5),
            prefix: base.prefix * rng.range(0.2, 2.0),
            exact: base.exact * rng.range(0.2, 2.0),
        };
        push_candidate(&mut out, &mut seen, max_candidates, perturbed);
    }
    out
}

/// Search the candidate grid for the weights with the best objective.
pub fn tune_similarity_weights(
    samples: &[TrainingSample],
    opts: &SimilarityTuningOptions,
) -> TuningOutcome {
    let evaluator = Evaluator::new(samples);
    let base = opts.base_weights.clamped();
    let baseline = evaluator.evaluate(samples, opts, &base);

    let candidates = candidate_weights(&base, opts.max_candidates.max(1), opts.seed);
    let mut leaderboard: Vec<LeaderboardEntry> = candidates
        .into_iter()
        .map(|weights| {
            let metrics = evaluator.evaluate(samples, opts, &weights);
            LeaderboardEntry { weights, metrics, objective: metrics.objective() }
        })
        .collect();
    leaderboard.sort_by(|a, b| {
        b.objective
            .partial_cmp(&a.objective)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(
                b.metrics
                    .mrr
                    .partial_cmp(&a.metrics.mrr)
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
            .then(
                b.metrics
                    .top1
                    .partial_cmp(&a.metrics.top1)
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
            .then(
                b.metrics
                    .top3
                    .partial_cmp(&a.metrics.top3)
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
    });

    let best = leaderboard
        .first()
        .map(|entry| (entry.weights, entry.metrics))
        .unwrap_or((base, baseline));
    info!(
        samples = samples.len(),
        candidates = leaderboard.len(),
        baseline_objective = baseline.objective(),
        best_objective = best.1.objective(),
        "weight tuning finished"
    );
    leaderboard.truncate(opts.leaderboard_size);
    TuningOutcome {
        best_weights: best.0,
        baseline,
        best: best.1,
        leaderboard,
    }
}

/// Nightly pipeline: sanitize, aggregate, tune, write back.
///
/// The tuned weights land in the target bucket of the target environment
/// (enabling A/B when targeting treatment), the model version is bumped and
/// `updatedAt` is set to `now`.
pub fn run_nightly_tuning(
    events: &[FeedbackEvent],
    config: &DeploymentConfig,
    opts: &NightlyOptions,
    now: DateTime<Utc>,
) -> Result<NightlyOutcome, SearchError> {
    let mut config = config.sanitized();
    let samples = aggregate_training_samples(events, opts.min_occurrences, opts.max_samples);
    if samples.is_empty() {
        return Err(SearchError::InsufficientSamples);
    }

    let base_weights = {
        let env_config = config
            .environments
            .get(&opts.environment)
            .ok_or(SearchError::MissingEnvironment(opts.environment))?;
        match opts.target_bucket {
            Bucket::Treatment => env_config
                .treatment_weights
                .unwrap_or(env_config.control_weights),
            Bucket::Control => env_config.control_weights,
        }
    };
    let tuning_opts = SimilarityTuningOptions { base_weights, ..opts.tuning.clone() };
    let outcome = tune_similarity_weights(&samples, &tuning_opts);

    let env_config = config
        .environments
        .get_mut(&opts.environment)
        .ok_or(SearchError::MissingEnvironment(opts.environment))?;
    match opts.target_bucket {
        Bucket::Control => env_config.control_weights = outcome.best_weights,
        Bucket::Treatment => {
            env_config.treatment_weights = Some(outcome.best_weights);
            env_config.ab_policy.enabled = true;
        }
    }

    let previous = config.model_version.clone();
    config.model_version = format!(
        "{}-{}-{}-from-{}",
        opts.model_version_prefix,
        opts.environment,
        now.format("%Y%m%d-%H%M%S"),
        previous
    );
    config.updated_at = now;

    let samples_used = samples.len();
    Ok(NightlyOutcome { config, tuning: outcome, samples_used })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample(query: &str, key: &str, count: u64) -> TrainingSample {
        TrainingSample {
            query: query.to_string(),
            selected_key: key.to_string(),
            count,
            last_seen: Utc::now(),
        }
    }

    fn samples() -> Vec<TrainingSample> {
        vec![
            sample("검삭", "검색", 5),
            sample("ㄱㅅ", "검색", 3),
            sample("ㅍㄹㅌ", "프론트엔드", 2),
            sample("vmfhsxm", "프론트", 2),
        ]
    }

    #[test]
    fn test_evaluate_similarity_finds_expected_keys() {
        let metrics = evaluate_similarity(&samples(), &SimilarityTuningOptions::default());
        assert!(metrics.hit_rate > 0.5, "hit_rate = {}", metrics.hit_rate);
        assert!(metrics.mrr > 0.0);
        assert!(metrics.top3 >= metrics.top1);
    }

    #[test]
    fn test_evaluate_empty_samples_is_zero() {
        let metrics = evaluate_similarity(&[], &SimilarityTuningOptions::default());
        assert_eq!(metrics, TuningMetrics::default());
    }

    #[test]
    fn test_candidate_grid_dedupes_and_caps() {
        let base = SimilarityWeights::default();
        let candidates = candidate_weights(&base, 40, 7);
        assert!(candidates.len() <= 40);
        let mut prints: Vec<String> = candidates.iter().map(|w| w.fingerprint()).collect();
        prints.sort();
        let before = prints.len();
        prints.dedup();
        assert_eq!(prints.len(), before);
        // The base itself is always a candidate.
        assert_eq!(candidates[0], base.clamped());
    }

    #[test]
    fn test_lcg_is_deterministic() {
        let mut a = Lcg::new(99);
        let mut b = Lcg::new(99);
        for _ in 0..16 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
        let mut c = Lcg::new(1);
        let v = c.range(0.5, 1.5);
        assert!((0.5..1.5).contains(&v));
    }

    #[test]
    fn test_tuner_is_deterministic_and_never_below_baseline() {
        let opts = SimilarityTuningOptions { max_candidates: 24, ..Default::default() };
        let first = tune_similarity_weights(&samples(), &opts);
        let second = tune_similarity_weights(&samples(), &opts);
        assert_eq!(first.best_weights, second.best_weights);
        assert!(first.best.objective() >= first.baseline.objective());
        assert!(!first.leaderboard.is_empty());
        assert!(first.leaderboard.len() <= opts.leaderboard_size);
        for pair in first.leaderboard.windows(2) {
            assert!(pair[0].objective >= pair[1].objective);
        }
    }

    #[test]
    fn test_nightly_requires_samples() {
        let err = run_nightly_tuning(
            &[],
            &DeploymentConfig::default(),
            &NightlyOptions::default(),
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, SearchError::InsufficientSamples));
    }

    #[test]
    fn test_nightly_writes_treatment_and_bumps_version() {
        let events: Vec<FeedbackEvent> = (0..4)
            .map(|i| FeedbackEvent {
                query: "검삭".to_string(),
                selected_key: Some("검색".to_string()),
                timestamp: Utc::now() - Duration::minutes(i),
                outcome: crate::feedback::FeedbackOutcome::AcceptedSuggestion,
                locale: None,
            })
            .collect();
        let opts = NightlyOptions {
            min_occurrences: 2,
            model_version_prefix: "nightly".to_string(),
            tuning: SimilarityTuningOptions { max_candidates: 8, ..Default::default() },
            ..Default::default()
        };
        let now = Utc::now();
        let outcome =
            run_nightly_tuning(&events, &DeploymentConfig::default(), &opts, now).unwrap();
        let env = &outcome.config.environments[&Environment::Production];
        assert!(env.treatment_weights.is_some());
        assert!(env.ab_policy.enabled);
        assert!(outcome.config.model_version.starts_with("nightly-production-"));
        assert!(outcome.config.model_version.ends_with("-from-baseline"));
        assert_eq!(outcome.config.updated_at, now);
        assert_eq!(outcome.samples_used, 1);
    }
}
