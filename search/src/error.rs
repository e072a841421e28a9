//! Boundary error kinds.
//!
//! Query operations are total and never surface errors; only the deployment
//! resolver, the strict config store and the nightly tuner can fail.

use std::path::PathBuf;

use thiserror::Error;

use crate::deploy::Environment;

#[derive(Debug, Error)]
pub enum SearchError {
    /// The requested environment is absent from the sanitized config.
    #[error("environment {0} missing from deployment config")]
    MissingEnvironment(Environment),

    /// Strict load was asked for a config file that does not exist.
    #[error("deployment config file not found: {0}")]
    MissingFile(PathBuf),

    #[error("failed to read deployment config: {0}")]
    ConfigRead(#[from] std::io::Error),

    #[error("failed to parse deployment config: {0}")]
    ConfigParse(#[from] serde_json::Error),

    /// The nightly tuner found no training samples after aggregation.
    #[error("no training samples after aggregation")]
    InsufficientSamples,
}
