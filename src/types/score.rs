//! Scoring outputs and model status

use crate::error::ScoringError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Index;

/// Number of model input features
pub const FEATURE_COUNT: usize = 6;

/// Fixed-length numeric encoding of a transaction.
///
/// Order: `[log_amount, hour, merchant_freq, category_freq, merchant_code, category_code]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureVector([f64; FEATURE_COUNT]);

impl FeatureVector {
    pub fn new(values: [f64; FEATURE_COUNT]) -> Self {
        Self(values)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn log_amount(&self) -> f64 {
        self.0[0]
    }

    pub fn hour(&self) -> f64 {
        self.0[1]
    }

    pub fn merchant_freq(&self) -> f64 {
        self.0[2]
    }

    /// Values narrowed to f32 for ONNX input tensors
    pub fn to_f32_vec(&self) -> Vec<f32> {
        self.0.iter().map(|&v| v as f32).collect()
    }
}

impl TryFrom<&[f64]> for FeatureVector {
    type Error = ScoringError;

    fn try_from(values: &[f64]) -> Result<Self, Self::Error> {
        let array: [f64; FEATURE_COUNT] =
            values
                .try_into()
                .map_err(|_| ScoringError::InvalidFeatureVector {
                    expected: FEATURE_COUNT,
                    actual: values.len(),
                })?;
        Ok(Self(array))
    }
}

impl TryFrom<Vec<f64>> for FeatureVector {
    type Error = ScoringError;

    fn try_from(values: Vec<f64>) -> Result<Self, Self::Error> {
        Self::try_from(values.as_slice())
    }
}

impl Index<usize> for FeatureVector {
    type Output = f64;

    fn index(&self, index: usize) -> &f64 {
        &self.0[index]
    }
}

/// Result of scoring a single transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    /// Positive-class (fraud) probability in `[0, 1]`
    #[serde(rename = "prob")]
    pub probability: f64,
    /// Features that produced the probability
    pub features: FeatureVector,
}

/// Which classifier variant is serving requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    Trained,
    Heuristic,
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelKind::Trained => write!(f, "trained"),
            ModelKind::Heuristic => write!(f, "heuristic"),
        }
    }
}

/// Snapshot of the classifier chosen at startup
#[derive(Debug, Clone, PartialEq)]
pub struct ModelStatus {
    pub active: ModelKind,
    pub loaded: bool,
    /// Configured artifact location; informational only
    pub source_path: String,
    /// Why the trained artifact was not used, when falling back
    pub fallback_reason: Option<String>,
    pub loaded_at: DateTime<Utc>,
}

impl ModelStatus {
    pub fn trained(source_path: impl Into<String>) -> Self {
        Self {
            active: ModelKind::Trained,
            loaded: true,
            source_path: source_path.into(),
            fallback_reason: None,
            loaded_at: Utc::now(),
        }
    }

    pub fn heuristic(source_path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            active: ModelKind::Heuristic,
            loaded: true,
            source_path: source_path.into(),
            fallback_reason: Some(reason.into()),
            loaded_at: Utc::now(),
        }
    }
}
