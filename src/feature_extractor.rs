//! Feature extraction for fraud model inference.
//!
//! Produces the six features the model was trained on, in training order.

use crate::types::score::{FeatureVector, FEATURE_COUNT};
use crate::types::transaction::Transaction;

const HOURS_PER_DAY: u64 = 24;

/// Feature extractor that transforms transactions into model input features.
///
/// Extraction is pure and total: every transaction maps to a vector, and
/// range checks are left to the caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureExtractor;

impl FeatureExtractor {
    /// Create a new feature extractor.
    pub fn new() -> Self {
        Self
    }

    /// Extract features from a transaction.
    pub fn extract(&self, tx: &Transaction) -> FeatureVector {
        FeatureVector::new([
            tx.amount.abs().ln_1p(),
            (tx.step % HOURS_PER_DAY) as f64,
            tx.merchant_freq as f64,
            tx.category_freq as f64,
            tx.merchant_code as f64,
            tx.category_code as f64,
        ])
    }

    /// Get the number of features produced.
    pub fn feature_count(&self) -> usize {
        FEATURE_COUNT
    }

    /// Get feature names in model input order.
    pub fn feature_names(&self) -> [&'static str; FEATURE_COUNT] {
        [
            "log_amount",
            "hour",
            "merchant_freq",
            "category_freq",
            "merchant_code",
            "category_code",
        ]
    }
}
