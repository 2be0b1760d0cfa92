//! Fraud Scoring Library
//!
//! Scores financial transactions with a trained ONNX model, falling back to
//! a rule-based heuristic when no model artifact can be loaded.

pub mod api;
pub mod config;
pub mod error;
pub mod feature_extractor;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod service;
pub mod types;

pub use config::AppConfig;
pub use error::{ScoringError, ScoringResult};
pub use feature_extractor::FeatureExtractor;
pub use models::{Classifier, HeuristicClassifier, ModelLoader, TrainedClassifier};
pub use service::ScoringService;
pub use types::{FeatureVector, ModelKind, ModelStatus, ScoreResult, Transaction};
