//! Classifier capability shared by the trained model and the heuristic fallback

use crate::error::{ScoringError, ScoringResult};
use crate::types::score::{FeatureVector, ModelKind};

/// Anything that turns a feature vector into a fraud probability.
///
/// Implementations are shared read-only across concurrent requests and must
/// only ever return values in `[0, 1]`.
pub trait Classifier: Send + Sync {
    /// Variant reported through the health endpoint
    fn kind(&self) -> ModelKind;

    /// Positive-class probability for a single feature vector
    fn score_probability(&self, features: &FeatureVector) -> ScoringResult<f64>;
}

/// Clamp a raw model output into the unit interval.
///
/// NaN has no meaningful clamp and is reported as an inference failure.
pub fn clamp_probability(raw: f64) -> ScoringResult<f64> {
    if raw.is_nan() {
        return Err(ScoringError::Inference(
            "classifier produced NaN probability".to_string(),
        ));
    }
    Ok(raw.clamp(0.0, 1.0))
}
