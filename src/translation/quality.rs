/*!
 * Quality estimation for backend output.
 *
 * The manager asks a `QualityEstimator` for the score of every backend
 * result; the score drives the escalation gate and is stored with the
 * cache row. `TierQualityEstimator` scores by the tier that produced the
 * text.
 */

use std::fmt::Debug;

use super::manager::TranslationSource;
use crate::database::models::normalize_quality;

/// Inputs available to an estimator
#[derive(Debug, Clone, Copy)]
pub struct QualityContext<'a> {
    /// Which path produced the translation
    pub source: TranslationSource,
    /// Text that was translated
    pub original_text: &'a str,
    /// Backend output
    pub translation: &'a str,
    /// Configured minimum acceptable quality
    pub min_quality: f64,
}

/// Scores a translation in `0.0..=1.0`
pub trait QualityEstimator: Send + Sync + Debug {
    fn estimate(&self, context: &QualityContext<'_>) -> f64;
}

/// Fixed score per tier, relative to the minimum quality
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TierQualityEstimator {
    /// Subtracted from the minimum for fast and fast-fallback output
    pub fast_penalty: f64,
    /// Subtracted from the minimum for emergency output
    pub emergency_penalty: f64,
}

impl Default for TierQualityEstimator {
    fn default() -> Self {
        Self {
            fast_penalty: 0.1,
            emergency_penalty: 0.2,
        }
    }
}

impl QualityEstimator for TierQualityEstimator {
    fn estimate(&self, context: &QualityContext<'_>) -> f64 {
        let score = match context.source {
            TranslationSource::Cache | TranslationSource::Model => context.min_quality,
            TranslationSource::Fast | TranslationSource::FastFallback => {
                context.min_quality - self.fast_penalty
            }
            TranslationSource::EmergencyFast => context.min_quality - self.emergency_penalty,
            TranslationSource::Failed => 0.0,
        };
        normalize_quality(score)
    }
}
