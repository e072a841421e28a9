//! hansearch
//!
//! In-memory fuzzy search for Korean (Hangul) text.
//!
//! The index matches queries against a choseong (leading-consonant)
//! projection of each item key and ranks similar matches tolerant of typos,
//! wrong-keyboard-mode input and jamo-level edits. A feedback subsystem
//! retunes the scoring weights offline under an A/B deployment policy.
//!
//! Public API:
//! - `SearchIndex` - immutable indexed collection with `search`,
//!   `search_similar` and `explain_similar` (plus cancellable variants)
//! - `SimilarityOptions` / `SimilarityWeights` - ranking configuration
//! - `DeploymentConfig` - A/B bucketing, weight resolution and the JSON
//!   config store
//! - `FeedbackStore` - click-through event store and training samples
//! - `tune_similarity_weights` / `run_nightly_tuning` - offline weight tuning

pub mod cache;
pub mod cancel;
pub mod deploy;
pub mod error;
pub mod feedback;
pub mod index;
pub mod lazy;
pub mod metrics;
pub mod ngram;
pub mod rank;
pub mod score;
pub mod telemetry;
pub mod tune;
pub mod weights;

pub use cancel::{CancelToken, Cancelled};
pub use deploy::{
    bucket_for, AbPolicy, Bucket, DeploymentConfig, Environment, EnvironmentConfig, Resolution,
};
pub use error::SearchError;
pub use feedback::{
    aggregate_training_samples, FeedbackEvent, FeedbackOutcome, FeedbackStore,
    FeedbackStoreOptions, FeedbackSummary, TrainingSample,
};
pub use index::{
    CachePolicy, ExplainedResult, IndexStrategy, LazyWarmup, MatchMode, ScoredResult, SearchIndex,
    SearchPolicy,
};
pub use rank::SimilarityOptions;
pub use score::{ScoreBreakdown, ScoreDetail};
pub use telemetry::{OperationKind, OperationStats, TelemetrySnapshot};
pub use tune::{
    evaluate_similarity, run_nightly_tuning, tune_similarity_weights, LeaderboardEntry,
    NightlyOptions, NightlyOutcome, SimilarityTuningOptions, TuningMetrics, TuningOutcome,
};
pub use weights::SimilarityWeights;

// Re-export the Hangul primitives so downstream callers need only one crate.
pub use hansearch_core::choseong::{choseong, normalized_token, ChoseongOptions, WhitespacePolicy};
pub use hansearch_core::compose::{assemble, assemble_strict, disassemble, HangulError};
pub use hansearch_core::layout::{convert_hangul_to_qwerty, convert_qwerty_to_hangul};
