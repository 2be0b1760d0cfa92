//! Threshold-based anomaly assessment

use crate::types::score::{FeatureVector, ScoreResult};
use serde::{Deserialize, Serialize};

/// Risk level classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Determine risk level from score and thresholds
    pub fn from_score(score: f64, thresholds: &RiskLevelThresholds) -> Self {
        if score >= thresholds.critical {
            RiskLevel::Critical
        } else if score >= thresholds.high {
            RiskLevel::High
        } else if score >= thresholds.medium {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }
}

/// Configurable risk level thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskLevelThresholds {
    pub low: f64,
    pub medium: f64,
    pub high: f64,
    pub critical: f64,
}

impl Default for RiskLevelThresholds {
    fn default() -> Self {
        Self {
            low: 0.3,
            medium: 0.5,
            high: 0.7,
            critical: 0.9,
        }
    }
}

/// A score together with the review decision derived from it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    pub prob: f64,
    /// True when `prob` reaches the anomaly threshold
    pub is_anomaly: bool,
    pub threshold: f64,
    pub risk_level: RiskLevel,
    pub features: FeatureVector,
}

impl Assessment {
    pub fn from_score(
        score: ScoreResult,
        threshold: f64,
        risk_levels: &RiskLevelThresholds,
    ) -> Self {
        Self {
            prob: score.probability,
            is_anomaly: score.probability >= threshold,
            threshold,
            risk_level: RiskLevel::from_score(score.probability, risk_levels),
            features: score.features,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_level_from_score() {
        let thresholds = RiskLevelThresholds::default();

        assert_eq!(RiskLevel::from_score(0.1, &thresholds), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(0.5, &thresholds), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(0.75, &thresholds), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(0.95, &thresholds), RiskLevel::Critical);
    }

    #[test]
    fn test_anomaly_threshold_is_inclusive() {
        let features = FeatureVector::new([0.0; 6]);
        let score = ScoreResult {
            probability: 0.95,
            features,
        };

        let assessment = Assessment::from_score(score, 0.95, &RiskLevelThresholds::default());
        assert!(assessment.is_anomaly);
        assert_eq!(assessment.risk_level, RiskLevel::Critical);

        let score = ScoreResult {
            probability: 0.4,
            features,
        };
        let assessment = Assessment::from_score(score, 0.95, &RiskLevelThresholds::default());
        assert!(!assessment.is_anomaly);
        assert_eq!(assessment.risk_level, RiskLevel::Low);
    }
}
