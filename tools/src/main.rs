//! Nightly weight tuning CLI.
//!
//! Reads a feedback-event dump (JSON array) and a deployment config, runs
//! the tuning pipeline against the chosen environment/bucket, and writes the
//! updated config back.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;

use hansearch::{
    run_nightly_tuning, Bucket, DeploymentConfig, Environment, FeedbackEvent, NightlyOptions,
    SimilarityTuningOptions,
};

#[derive(Parser, Debug)]
#[command(name = "tune_weights", about = "Tune similarity weights from click-through feedback")]
struct Args {
    /// Feedback events as a JSON array.
    #[arg(long)]
    events: PathBuf,

    /// Deployment config file; missing or malformed files start from defaults.
    #[arg(long)]
    config: PathBuf,

    /// Target environment.
    #[arg(long, value_enum, default_value = "production")]
    env: EnvArg,

    /// Target bucket for the tuned weights.
    #[arg(long, value_enum, default_value = "treatment")]
    target_bucket: BucketArg,

    /// Minimum occurrences for a (query, key) training pair.
    #[arg(long, default_value_t = 2)]
    min_occurrences: u64,

    /// Maximum training samples.
    #[arg(long, default_value_t = 200)]
    max_samples: usize,

    /// Seed for the candidate perturbations.
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Model version prefix for the bumped version string.
    #[arg(long, default_value = "tuned")]
    model_version_prefix: String,

    /// Evaluate and report without writing the config back.
    #[arg(long)]
    dry_run: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum EnvArg {
    Development,
    Staging,
    Production,
}

impl From<EnvArg> for Environment {
    fn from(value: EnvArg) -> Self {
        match value {
            EnvArg::Development => Environment::Development,
            EnvArg::Staging => Environment::Staging,
            EnvArg::Production => Environment::Production,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum BucketArg {
    Control,
    Treatment,
}

impl From<BucketArg> for Bucket {
    fn from(value: BucketArg) -> Self {
        match value {
            BucketArg::Control => Bucket::Control,
            BucketArg::Treatment => Bucket::Treatment,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let events_json = std::fs::read_to_string(&args.events)
        .with_context(|| format!("reading events from {}", args.events.display()))?;
    let events: Vec<FeedbackEvent> =
        serde_json::from_str(&events_json).context("parsing feedback events")?;
    let config = DeploymentConfig::load_or_default(&args.config);

    let options = NightlyOptions {
        environment: args.env.into(),
        target_bucket: args.target_bucket.into(),
        min_occurrences: args.min_occurrences,
        max_samples: args.max_samples,
        model_version_prefix: args.model_version_prefix.clone(),
        tuning: SimilarityTuningOptions { seed: args.seed, ..Default::default() },
    };

    let outcome = run_nightly_tuning(&events, &config, &options, Utc::now())
        .context("nightly tuning failed")?;

    println!(
        "tuned {} samples: baseline objective {:.4} -> best {:.4}",
        outcome.samples_used,
        outcome.tuning.baseline.objective(),
        outcome.tuning.best.objective()
    );
    println!("new model version: {}", outcome.config.model_version);
    for (rank, entry) in outcome.tuning.leaderboard.iter().enumerate() {
        println!(
            "#{:<2} objective {:.4}  mrr {:.4}  top1 {:.4}  top3 {:.4}",
            rank + 1,
            entry.objective,
            entry.metrics.mrr,
            entry.metrics.top1,
            entry.metrics.top3
        );
    }

    if args.dry_run {
        println!("dry run: config not written");
    } else {
        outcome
            .config
            .save(&args.config)
            .with_context(|| format!("writing config to {}", args.config.display()))?;
        println!("config written to {}", args.config.display());
    }
    Ok(())
}
