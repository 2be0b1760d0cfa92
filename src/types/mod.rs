//! Type definitions for the scoring service

pub mod assessment;
pub mod score;
pub mod transaction;

pub use assessment::{Assessment, RiskLevel, RiskLevelThresholds};
pub use score::{FeatureVector, ModelKind, ModelStatus, ScoreResult, FEATURE_COUNT};
pub use transaction::Transaction;
