//! Scoring orchestration: validation, feature extraction, classification

use crate::config::DetectionConfig;
use crate::error::{ScoringError, ScoringResult};
use crate::feature_extractor::FeatureExtractor;
use crate::metrics::ScoringMetrics;
use crate::models::classifier::Classifier;
use crate::models::loader::LoadedClassifier;
use crate::types::{Assessment, ModelStatus, ScoreResult, Transaction};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error};

/// Request-handling core.
///
/// Holds the classifier chosen at startup and never reloads it. Cheap to
/// share behind an `Arc`; every method takes `&self`.
pub struct ScoringService {
    extractor: FeatureExtractor,
    classifier: Arc<dyn Classifier>,
    status: ModelStatus,
    detection: DetectionConfig,
    metrics: Arc<ScoringMetrics>,
}

impl ScoringService {
    pub fn new(loaded: LoadedClassifier) -> Self {
        Self {
            extractor: FeatureExtractor::new(),
            classifier: loaded.classifier,
            status: loaded.status,
            detection: DetectionConfig::default(),
            metrics: Arc::new(ScoringMetrics::new()),
        }
    }

    pub fn with_detection(mut self, detection: DetectionConfig) -> Self {
        self.detection = detection;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<ScoringMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn metrics(&self) -> &Arc<ScoringMetrics> {
        &self.metrics
    }

    /// Status captured at startup; identical on every call
    pub fn health(&self) -> &ModelStatus {
        &self.status
    }

    /// Parse a raw JSON request body into a transaction
    pub fn parse_transaction(payload: &[u8]) -> ScoringResult<Transaction> {
        let tx: Transaction = serde_json::from_slice(payload)?;
        if !tx.amount.is_finite() {
            return Err(ScoringError::Validation(
                "amount must be a finite number".to_string(),
            ));
        }
        Ok(tx)
    }

    /// Parse and score a raw JSON request body
    pub fn score_payload(&self, payload: &[u8]) -> ScoringResult<ScoreResult> {
        let tx = self.parse_counted(payload)?;
        self.score(&tx)
    }

    /// Parse and assess a raw JSON request body
    pub fn assess_payload(&self, payload: &[u8]) -> ScoringResult<Assessment> {
        let tx = self.parse_counted(payload)?;
        self.assess(&tx)
    }

    /// Score a single transaction with the active classifier
    pub fn score(&self, tx: &Transaction) -> ScoringResult<ScoreResult> {
        let start_time = Instant::now();

        if !tx.amount.is_finite() {
            self.metrics.record_validation_failure();
            return Err(ScoringError::Validation(
                "amount must be a finite number".to_string(),
            ));
        }

        let features = self.extractor.extract(tx);

        let outcome = catch_unwind(AssertUnwindSafe(|| {
            self.classifier.score_probability(&features)
        }))
        .unwrap_or_else(|panic| Err(ScoringError::Inference(panic_message(panic.as_ref()))))
        .and_then(|probability| {
            if (0.0..=1.0).contains(&probability) {
                Ok(probability)
            } else {
                Err(ScoringError::Inference(format!(
                    "classifier returned {} outside [0, 1]",
                    probability
                )))
            }
        });

        match outcome {
            Ok(probability) => {
                let processing_time = start_time.elapsed();
                self.metrics.record_score(processing_time, probability);
                debug!(
                    model = %self.status.active,
                    prob = probability,
                    processing_time_us = processing_time.as_micros() as u64,
                    "Transaction scored"
                );
                Ok(ScoreResult {
                    probability,
                    features,
                })
            }
            Err(e) => {
                self.metrics.record_inference_failure();
                error!(model = %self.status.active, error = %e, "Inference failed");
                Err(e)
            }
        }
    }

    /// Score a transaction and apply the configured anomaly threshold
    pub fn assess(&self, tx: &Transaction) -> ScoringResult<Assessment> {
        let score = self.score(tx)?;
        let assessment =
            Assessment::from_score(score, self.detection.threshold, &self.detection.risk_levels);

        if assessment.is_anomaly {
            self.metrics.record_anomaly();
            debug!(
                prob = assessment.prob,
                risk_level = assessment.risk_level.as_str(),
                "Transaction flagged as anomalous"
            );
        }

        Ok(assessment)
    }

    fn parse_counted(&self, payload: &[u8]) -> ScoringResult<Transaction> {
        Self::parse_transaction(payload).inspect_err(|e| {
            self.metrics.record_validation_failure();
            debug!(error = %e, "Rejected transaction payload");
        })
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    let detail = panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown cause".to_string());
    format!("classifier panicked: {}", detail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::heuristic::{HeuristicClassifier, PerturbationSource};
    use crate::models::loader::ModelLoader;
    use crate::types::score::{FeatureVector, ModelKind};
    use crate::types::RiskLevel;
    use proptest::prelude::*;

    struct FixedClassifier(f64);

    impl Classifier for FixedClassifier {
        fn kind(&self) -> ModelKind {
            ModelKind::Trained
        }

        fn score_probability(&self, _features: &FeatureVector) -> ScoringResult<f64> {
            Ok(self.0)
        }
    }

    struct FailingClassifier;

    impl Classifier for FailingClassifier {
        fn kind(&self) -> ModelKind {
            ModelKind::Trained
        }

        fn score_probability(&self, _features: &FeatureVector) -> ScoringResult<f64> {
            Err(ScoringError::InvalidFeatureVector {
                expected: 6,
                actual: 4,
            })
        }
    }

    struct PanickingClassifier;

    impl Classifier for PanickingClassifier {
        fn kind(&self) -> ModelKind {
            ModelKind::Trained
        }

        fn score_probability(&self, _features: &FeatureVector) -> ScoringResult<f64> {
            panic!("session exploded")
        }
    }

    fn service_with(classifier: impl Classifier + 'static) -> ScoringService {
        ScoringService::new(LoadedClassifier {
            classifier: Arc::new(classifier),
            status: ModelStatus::trained("stub.onnx"),
        })
    }

    fn heuristic_service(perturbation: PerturbationSource) -> ScoringService {
        ScoringService::new(LoadedClassifier {
            classifier: Arc::new(HeuristicClassifier::with_perturbation(perturbation)),
            status: ModelStatus::heuristic("missing.onnx", "not found"),
        })
    }

    fn example_tx() -> Transaction {
        Transaction::new(-1114.77, 163)
    }

    #[test]
    fn test_stub_probability_passes_through() {
        let service = service_with(FixedClassifier(0.73));
        let result = service.score(&example_tx()).unwrap();

        assert_eq!(result.probability, 0.73);
        assert_eq!(result.features, FeatureExtractor::new().extract(&example_tx()));
        assert_eq!(service.metrics().snapshot().requests_scored, 1);
    }

    #[test]
    fn test_worked_example_under_heuristic() {
        let service = heuristic_service(PerturbationSource::Entropy);
        let result = service.score(&example_tx()).unwrap();

        assert!((result.features[0] - 7.017).abs() < 1e-3);
        assert_eq!(&result.features.as_slice()[1..], &[19.0, 1.0, 1.0, 0.0, 0.0]);
        // only the first-time merchant rule fires
        assert!((0.2..0.3).contains(&result.probability));
    }

    #[test]
    fn test_pinned_heuristic_output() {
        let service = heuristic_service(PerturbationSource::Fixed(0.0));
        let tx = Transaction::new(5000.0, 2);

        // large amount + early hour + first-time merchant
        let result = service.score(&tx).unwrap();
        assert!((result.probability - 0.7).abs() < 1e-12);
    }

    #[test]
    fn test_classifier_error_is_reported() {
        let service = service_with(FailingClassifier);
        let err = service.score(&example_tx()).unwrap_err();

        assert!(matches!(err, ScoringError::InvalidFeatureVector { .. }));
        assert_eq!(service.metrics().snapshot().inference_failures, 1);
    }

    #[test]
    fn test_panic_becomes_inference_error() {
        let service = service_with(PanickingClassifier);

        let err = service.score(&example_tx()).unwrap_err();
        match err {
            ScoringError::Inference(msg) => assert!(msg.contains("session exploded")),
            other => panic!("unexpected error: {:?}", other),
        }

        // later requests are still served
        assert!(service.score(&example_tx()).is_err());
        assert_eq!(service.metrics().snapshot().inference_failures, 2);
    }

    #[test]
    fn test_out_of_range_probability_rejected() {
        let service = service_with(FixedClassifier(1.5));
        assert!(matches!(
            service.score(&example_tx()),
            Err(ScoringError::Inference(_))
        ));

        let service = service_with(FixedClassifier(f64::NAN));
        assert!(matches!(
            service.score(&example_tx()),
            Err(ScoringError::Inference(_))
        ));
    }

    #[test]
    fn test_missing_amount_is_validation_error() {
        let service = service_with(FixedClassifier(0.5));
        let payload = br#"{"step": 1, "merchant_freq": 1, "category_freq": 1, "merchant_code": 0, "category_code": 0}"#;

        let err = service.score_payload(payload).unwrap_err();
        assert!(matches!(err, ScoringError::Validation(_)));
        assert_eq!(service.metrics().snapshot().validation_failures, 1);
    }

    #[test]
    fn test_wrong_type_is_validation_error() {
        let service = service_with(FixedClassifier(0.5));
        let payload = br#"{"amount": "lots", "step": 1, "merchant_freq": 1, "category_freq": 1, "merchant_code": 0, "category_code": 0}"#;
        assert!(matches!(
            service.score_payload(payload),
            Err(ScoringError::Validation(_))
        ));

        assert!(matches!(
            service.score_payload(b"not json"),
            Err(ScoringError::Validation(_))
        ));
    }

    #[test]
    fn test_non_finite_amount_rejected() {
        let service = service_with(FixedClassifier(0.5));
        let tx = Transaction::new(f64::INFINITY, 1);
        assert!(matches!(
            service.score(&tx),
            Err(ScoringError::Validation(_))
        ));
    }

    #[test]
    fn test_health_is_stable() {
        let loaded = ModelLoader::new().load("no/such/model.onnx");
        let service = ScoringService::new(loaded);

        let first = service.health().clone();
        service.score(&example_tx()).unwrap();
        let second = service.health().clone();

        assert_eq!(first, second);
        assert_eq!(first.active, ModelKind::Heuristic);
        assert!(first.loaded);
    }

    #[test]
    fn test_assess_applies_threshold() {
        let service = service_with(FixedClassifier(0.97));
        let assessment = service.assess(&example_tx()).unwrap();

        assert!(assessment.is_anomaly);
        assert_eq!(assessment.threshold, 0.95);
        assert_eq!(assessment.risk_level, RiskLevel::Critical);
        assert_eq!(service.metrics().snapshot().anomalies_flagged, 1);

        let service = service_with(FixedClassifier(0.6)).with_detection(DetectionConfig {
            threshold: 0.5,
            ..DetectionConfig::default()
        });
        let assessment = service.assess(&example_tx()).unwrap();
        assert!(assessment.is_anomaly);
        assert_eq!(assessment.risk_level, RiskLevel::Medium);
    }

    proptest! {
        #[test]
        fn heuristic_probability_in_unit_interval(
            amount in -1.0e9f64..1.0e9,
            step in any::<u64>(),
            merchant_freq in 0u64..5,
            category_freq in 0u64..5,
            merchant_code in any::<i64>(),
            category_code in any::<i64>(),
        ) {
            let service = heuristic_service(PerturbationSource::Entropy);
            let tx = Transaction::new(amount, step)
                .with_frequencies(merchant_freq, category_freq)
                .with_codes(merchant_code, category_code);

            let result = service.score(&tx).unwrap();
            prop_assert!((0.0..=1.0).contains(&result.probability));
        }
    }
}
