//! Similarity scoring weights.

use serde::{Deserialize, Serialize};

/// Domain bounds for the four core signal weights.
pub const CORE_WEIGHT_MIN: f64 = 0.01;
pub const CORE_WEIGHT_MAX: f64 = 2.0;

/// Domain bounds for the two bonus weights.
pub const BONUS_WEIGHT_MIN: f64 = 0.0;
pub const BONUS_WEIGHT_MAX: f64 = 0.5;

/// Weights for the multi-signal similarity score.
///
/// Core weights blend the four similarity signals; the bonus weights are
/// added on top for exact and prefix matches. The clamp keeps the core sum
/// strictly positive, so the weighted mixture is always well defined.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimilarityWeights {
    pub edit_distance: f64,
    pub jaccard: f64,
    pub keyboard: f64,
    pub jamo: f64,
    pub prefix: f64,
    pub exact: f64,
}

impl Default for SimilarityWeights {
    fn default() -> Self {
        Self {
            edit_distance: 1.0,
            jaccard: 0.8,
            keyboard: 0.6,
            jamo: 1.0,
            prefix: 0.05,
            exact: 0.3,
        }
    }
}

impl SimilarityWeights {
    /// Clamp every weight into its declared domain.
    pub fn clamped(&self) -> Self {
        let core = |w: f64| w.clamp(CORE_WEIGHT_MIN, CORE_WEIGHT_MAX);
        let bonus = |w: f64| w.clamp(BONUS_WEIGHT_MIN, BONUS_WEIGHT_MAX);
        Self {
            edit_distance: core(self.edit_distance),
            jaccard: core(self.jaccard),
            keyboard: core(self.keyboard),
            jamo: core(self.jamo),
            prefix: bonus(self.prefix),
            exact: bonus(self.exact),
        }
    }

    /// Sum of the four core weights.
    pub fn core_sum(&self) -> f64 {
        self.edit_distance + self.jaccard + self.keyboard + self.jamo
    }

    /// Fixed-precision identity used by the tuner to deduplicate candidates.
    pub fn fingerprint(&self) -> String {
        format!(
            "{:.4}|{:.4}|{:.4}|{:.4}|{:.4}|{:.4}",
            self.edit_distance, self.jaccard, self.keyboard, self.jamo, self.prefix, self.exact
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_bounds() {
        let w = SimilarityWeights {
            edit_distance: -1.0,
            jaccard: 5.0,
            keyboard: 0.0,
            jamo: 1.0,
            prefix: 0.9,
            exact: -0.1,
        };
        let c = w.clamped();
        assert_eq!(c.edit_distance, CORE_WEIGHT_MIN);
        assert_eq!(c.jaccard, CORE_WEIGHT_MAX);
        assert_eq!(c.keyboard, CORE_WEIGHT_MIN);
        assert_eq!(c.prefix, BONUS_WEIGHT_MAX);
        assert_eq!(c.exact, BONUS_WEIGHT_MIN);
        // The clamp floor keeps the core mixture denominator positive.
        assert!(c.core_sum() > 1e-6);
    }

    #[test]
    fn test_fingerprint_precision() {
        let a = SimilarityWeights { edit_distance: 1.00004, ..Default::default() };
        let b = SimilarityWeights { edit_distance: 1.00001, ..Default::default() };
        let c = SimilarityWeights { edit_distance: 1.2, ..Default::default() };
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
    }

    #[test]
    fn test_serde_field_names() {
        let json = serde_json::to_string(&SimilarityWeights::default()).unwrap();
        assert!(json.contains("\"editDistance\""));
        assert!(json.contains("\"jaccard\""));
        assert!(json.contains("\"prefix\""));
    }
}
