//! Deployment config, A/B bucketing and the JSON file store.
//!
//! The persisted contract is JSON with lexicographically sorted object keys
//! and ISO-8601 timestamps. The resolver is deterministic: bucket assignment
//! hashes `salt|userId` with FNV-1a 64, so the same inputs land in the same
//! bucket across calls and processes.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::SearchError;
use crate::weights::SimilarityWeights;

pub const DEFAULT_SCHEMA_VERSION: i64 = 1;
pub const DEFAULT_MODEL_VERSION: &str = "baseline";
pub const DEFAULT_SALT: &str = "hansearch-ab";

/// FNV-1a 64-bit parameters (wire-level contract).
const FNV_OFFSET: u64 = 14_695_981_039_346_656_037;
const FNV_PRIME: u64 = 1_099_511_628_211;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Staging,
    Production,
}

impl Environment {
    pub const ALL: [Environment; 3] =
        [Environment::Development, Environment::Staging, Environment::Production];

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bucket {
    Control,
    Treatment,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbPolicy {
    pub enabled: bool,
    pub treatment_ratio: f64,
    pub salt: String,
}

impl Default for AbPolicy {
    fn default() -> Self {
        Self {
            enabled: false,
            treatment_ratio: 0.0,
            salt: DEFAULT_SALT.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentConfig {
    pub control_weights: SimilarityWeights,
    pub treatment_weights: Option<SimilarityWeights>,
    pub ab_policy: AbPolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentConfig {
    pub schema_version: i64,
    pub model_version: String,
    pub updated_at: DateTime<Utc>,
    pub environments: BTreeMap<Environment, EnvironmentConfig>,
}

impl Default for DeploymentConfig {
    fn default() -> Self {
        let environments = Environment::ALL
            .iter()
            .map(|&env| (env, EnvironmentConfig::default()))
            .collect();
        Self {
            schema_version: DEFAULT_SCHEMA_VERSION,
            model_version: DEFAULT_MODEL_VERSION.to_string(),
            updated_at: Utc::now(),
            environments,
        }
    }
}

/// Outcome of resolving weights for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub environment: Environment,
    pub bucket: Bucket,
    pub weights: SimilarityWeights,
    pub model_version: String,
    pub updated_at: DateTime<Utc>,
}

impl DeploymentConfig {
    /// Bring every field back into its declared domain.
    ///
    /// Weight clamps, ratio/enabled coupling and default substitutions are
    /// applied per environment; missing environments are filled in with
    /// defaults.
    pub fn sanitized(&self) -> DeploymentConfig {
        let mut out = self.clone();
        if out.schema_version <= 0 {
            warn!(schema_version = out.schema_version, "schema version reset to default");
            out.schema_version = DEFAULT_SCHEMA_VERSION;
        }
        if out.model_version.trim().is_empty() {
            out.model_version = DEFAULT_MODEL_VERSION.to_string();
        }
        let epoch = Utc.timestamp_opt(0, 0).unwrap();
        if out.updated_at <= epoch {
            out.updated_at = Utc::now();
        }
        for &env in &Environment::ALL {
            out.environments.entry(env).or_default();
        }
        for env_config in out.environments.values_mut() {
            env_config.control_weights = env_config.control_weights.clamped();
            env_config.treatment_weights = env_config.treatment_weights.map(|w| w.clamped());
            let policy = &mut env_config.ab_policy;
            policy.treatment_ratio = policy.treatment_ratio.clamp(0.0, 1.0);
            if env_config.treatment_weights.is_none() {
                policy.enabled = false;
                policy.treatment_ratio = 0.0;
            }
            if !policy.enabled {
                policy.treatment_ratio = 0.0;
            }
            if policy.salt.is_empty() {
                policy.salt = DEFAULT_SALT.to_string();
            }
        }
        out
    }

    /// Resolve weights for `(env, user)` against this (already sanitized)
    /// config.
    pub fn resolve(
        &self,
        environment: Environment,
        user_id: Option<&str>,
        forced_bucket: Option<Bucket>,
    ) -> Result<Resolution, SearchError> {
        let env_config = self
            .environments
            .get(&environment)
            .ok_or(SearchError::MissingEnvironment(environment))?;
        let policy = &env_config.ab_policy;
        let has_treatment = env_config.treatment_weights.is_some();

        let bucket = match forced_bucket {
            Some(Bucket::Treatment) if !has_treatment => Bucket::Control,
            Some(forced) => forced,
            None => {
                if !policy.enabled || !has_treatment {
                    Bucket::Control
                } else if policy.treatment_ratio <= 0.0 {
                    Bucket::Control
                } else if policy.treatment_ratio >= 1.0 {
                    Bucket::Treatment
                } else {
                    match user_id {
                        None | Some("") => Bucket::Control,
                        Some(user) => bucket_for(&policy.salt, user, policy.treatment_ratio),
                    }
                }
            }
        };

        let weights = match bucket {
            Bucket::Treatment => env_config
                .treatment_weights
                .unwrap_or(env_config.control_weights),
            Bucket::Control => env_config.control_weights,
        };
        Ok(Resolution {
            environment,
            bucket,
            weights,
            model_version: self.model_version.clone(),
            updated_at: self.updated_at,
        })
    }

    /// Sanitize, then resolve against the requested environment, falling
    /// back to production and finally to an all-default resolution.
    pub fn resolve_or_default(
        &self,
        environment: Environment,
        user_id: Option<&str>,
        forced_bucket: Option<Bucket>,
    ) -> Resolution {
        let sanitized = self.sanitized();
        sanitized
            .resolve(environment, user_id, forced_bucket)
            .or_else(|_| sanitized.resolve(Environment::Production, user_id, forced_bucket))
            .unwrap_or_else(|_| Resolution {
                environment,
                bucket: Bucket::Control,
                weights: SimilarityWeights::default(),
                model_version: DEFAULT_MODEL_VERSION.to_string(),
                updated_at: sanitized.updated_at,
            })
    }

    /// Pretty JSON with lexicographically sorted keys.
    pub fn to_sorted_json(&self) -> Result<String, serde_json::Error> {
        let value = serde_json::to_value(self)?;
        serde_json::to_string_pretty(&value)
    }

    /// Load without fallbacks: a missing file and a parse failure are both
    /// surfaced.
    pub fn load_strict<P: AsRef<Path>>(path: P) -> Result<Self, SearchError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SearchError::MissingFile(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        let config: DeploymentConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Load, sanitize, and fall back to the default config on any failure.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load_strict(path) {
            Ok(config) => config.sanitized(),
            Err(err) => {
                warn!(error = %err, "deployment config unavailable, using defaults");
                Self::default().sanitized()
            }
        }
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), SearchError> {
        let json = self.to_sorted_json()?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

/// FNV-1a 64 over the UTF-8 bytes of the input.
pub fn fnv1a64(input: &str) -> u64 {
    let mut hash = FNV_OFFSET;
    for byte in input.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Deterministic bucket assignment from `(salt, userId, ratio)`.
///
/// The bucket value is `(fnv1a64(salt + "|" + userId) mod 10000) / 10000`;
/// values strictly below the ratio land in treatment.
pub fn bucket_for(salt: &str, user_id: &str, treatment_ratio: f64) -> Bucket {
    let hash = fnv1a64(&format!("{salt}|{user_id}"));
    let value = (hash % 10_000) as f64 / 10_000.0;
    if value < treatment_ratio {
        Bucket::Treatment
    } else {
        Bucket::Control
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_treatment(ratio: f64, salt: &str) -> DeploymentConfig {
        let mut config = DeploymentConfig::default();
        let env = config.environments.get_mut(&Environment::Production).unwrap();
        env.treatment_weights = Some(SimilarityWeights {
            edit_distance: 1.2,
            ..Default::default()
        });
        env.ab_policy = AbPolicy {
            enabled: true,
            treatment_ratio: ratio,
            salt: salt.to_string(),
        };
        config
    }

    #[test]
    fn test_fnv1a64_vectors() {
        // Canonical FNV-1a test vectors.
        assert_eq!(fnv1a64(""), 0xcbf2_9ce4_8422_2325);
        assert_eq!(fnv1a64("a"), 0xaf63_dc4c_8601_ec8c);
    }

    #[test]
    fn test_bucket_is_stable() {
        let first = bucket_for("prod-salt", "user-1001", 0.5);
        for _ in 0..10 {
            assert_eq!(bucket_for("prod-salt", "user-1001", 0.5), first);
        }
    }

    #[test]
    fn test_resolve_ladder() {
        let config = config_with_treatment(0.5, "prod-salt").sanitized();

        // Repeated resolves agree.
        let a = config.resolve(Environment::Production, Some("user-1001"), None).unwrap();
        let b = config.resolve(Environment::Production, Some("user-1001"), None).unwrap();
        assert_eq!(a.bucket, b.bucket);

        // Absent user falls to control.
        let anon = config.resolve(Environment::Production, None, None).unwrap();
        assert_eq!(anon.bucket, Bucket::Control);

        // Forced treatment with treatment weights present.
        let forced = config
            .resolve(Environment::Production, None, Some(Bucket::Treatment))
            .unwrap();
        assert_eq!(forced.bucket, Bucket::Treatment);
        assert_eq!(forced.weights.edit_distance, 1.2);
    }

    #[test]
    fn test_forced_treatment_downgrades_without_weights() {
        let config = DeploymentConfig::default().sanitized();
        let resolution = config
            .resolve(Environment::Production, Some("u"), Some(Bucket::Treatment))
            .unwrap();
        assert_eq!(resolution.bucket, Bucket::Control);
    }

    #[test]
    fn test_ratio_extremes() {
        let zero = config_with_treatment(0.0, "s").sanitized();
        let one = config_with_treatment(1.0, "s").sanitized();
        assert_eq!(
            zero.resolve(Environment::Production, Some("u"), None).unwrap().bucket,
            Bucket::Control
        );
        assert_eq!(
            one.resolve(Environment::Production, Some("u"), None).unwrap().bucket,
            Bucket::Treatment
        );
    }

    #[test]
    fn test_sanitize_couples_ratio_and_treatment() {
        let mut config = DeploymentConfig::default();
        {
            let env = config.environments.get_mut(&Environment::Staging).unwrap();
            env.ab_policy = AbPolicy {
                enabled: true,
                treatment_ratio: 0.7,
                salt: String::new(),
            };
            env.control_weights = SimilarityWeights {
                edit_distance: 99.0,
                prefix: 3.0,
                ..Default::default()
            };
        }
        config.schema_version = -4;
        config.model_version = "  ".to_string();
        let sanitized = config.sanitized();
        let env = &sanitized.environments[&Environment::Staging];
        // No treatment weights: AB off, ratio zeroed, salt defaulted.
        assert!(!env.ab_policy.enabled);
        assert_eq!(env.ab_policy.treatment_ratio, 0.0);
        assert_eq!(env.ab_policy.salt, DEFAULT_SALT);
        assert_eq!(env.control_weights.edit_distance, 2.0);
        assert_eq!(env.control_weights.prefix, 0.5);
        assert_eq!(sanitized.schema_version, DEFAULT_SCHEMA_VERSION);
        assert_eq!(sanitized.model_version, DEFAULT_MODEL_VERSION);
    }

    #[test]
    fn test_resolve_or_default_never_fails() {
        let mut config = DeploymentConfig::default();
        config.environments.clear();
        let resolution =
            config.resolve_or_default(Environment::Development, Some("user"), None);
        // Sanitize refills the environments, so development resolves.
        assert_eq!(resolution.environment, Environment::Development);
        assert_eq!(resolution.bucket, Bucket::Control);
    }

    #[test]
    fn test_sorted_json_roundtrip() {
        let config = config_with_treatment(0.25, "json-salt").sanitized();
        let json = config.to_sorted_json().unwrap();
        // Keys appear in lexicographic order.
        let env_pos = json.find("\"environments\"").unwrap();
        let model_pos = json.find("\"modelVersion\"").unwrap();
        let schema_pos = json.find("\"schemaVersion\"").unwrap();
        let updated_pos = json.find("\"updatedAt\"").unwrap();
        assert!(env_pos < model_pos && model_pos < schema_pos && schema_pos < updated_pos);

        let parsed: DeploymentConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_load_strict_missing_file() {
        let err = DeploymentConfig::load_strict("/nonexistent/deploy.json").unwrap_err();
        assert!(matches!(err, SearchError::MissingFile(_)));
    }

    #[test]
    fn test_load_or_default_on_malformed_file() {
        let path = std::env::temp_dir().join(format!(
            "hansearch_deploy_malformed_{}.json",
            std::process::id()
        ));
        std::fs::write(&path, "{ not json").unwrap();
        let config = DeploymentConfig::load_or_default(&path);
        assert_eq!(config.model_version, DEFAULT_MODEL_VERSION);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let path = std::env::temp_dir().join(format!(
            "hansearch_deploy_roundtrip_{}.json",
            std::process::id()
        ));
        let config = config_with_treatment(0.5, "rt-salt").sanitized();
        config.save(&path).unwrap();
        let loaded = DeploymentConfig::load_strict(&path).unwrap();
        assert_eq!(loaded, config);
        std::fs::remove_file(&path).ok();
    }
}
