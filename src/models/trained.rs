//! ONNX-backed classifier wrapping a previously fitted model artifact

use crate::error::{ScoringError, ScoringResult};
use crate::models::classifier::{clamp_probability, Classifier};
use crate::types::score::{FeatureVector, ModelKind, FEATURE_COUNT};
use anyhow::{anyhow, bail, Context, Result};
use ort::memory::Allocator;
use ort::session::{builder::GraphOptimizationLevel, Session, SessionOutputs};
use ort::value::{DowncastableTarget, DynMapValueType, DynSequenceValueType, Tensor};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Trained binary classifier loaded from an ONNX export.
///
/// `Session::run` needs exclusive access, so the session sits behind a mutex.
/// Nothing about the model changes after it is opened.
pub struct TrainedClassifier {
    session: Mutex<Session>,
    input_name: String,
    output_name: String,
    source: PathBuf,
}

impl std::fmt::Debug for TrainedClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrainedClassifier")
            .field("input_name", &self.input_name)
            .field("output_name", &self.output_name)
            .field("source", &self.source)
            .finish()
    }
}

impl TrainedClassifier {
    /// Open a model artifact with a single inference thread
    pub fn open<P: AsRef<Path>>(path: P) -> ScoringResult<Self> {
        Self::open_with_threads(path, 1)
    }

    /// Open a model artifact and verify it accepts a six-feature input.
    pub fn open_with_threads<P: AsRef<Path>>(
        path: P,
        onnx_threads: usize,
    ) -> ScoringResult<Self> {
        Self::build(path.as_ref(), onnx_threads)
            .map_err(|e| ScoringError::ModelLoad(format!("{:#}", e)))
    }

    fn build(path: &Path, onnx_threads: usize) -> Result<Self> {
        if !path.is_file() {
            bail!("model file not found: {}", path.display());
        }

        info!(path = %path.display(), threads = onnx_threads, "Loading ONNX model");

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(onnx_threads)?
            .commit_from_file(path)
            .with_context(|| format!("failed to deserialize model from {}", path.display()))?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .ok_or_else(|| anyhow!("model declares no inputs"))?;

        let output_name = session
            .outputs
            .iter()
            .find(|o| o.name.contains("prob"))
            .or_else(|| session.outputs.last())
            .map(|o| o.name.clone())
            .ok_or_else(|| anyhow!("model declares no outputs"))?;

        let classifier = Self {
            session: Mutex::new(session),
            input_name,
            output_name,
            source: path.to_path_buf(),
        };

        // A model exported for a different feature arity fails here rather
        // than on the first request.
        let probe = classifier
            .run(&FeatureVector::new([0.0; FEATURE_COUNT]))
            .context("probe inference failed")?;
        if !(0.0..=1.0).contains(&probe) {
            bail!("probe inference returned {} outside [0, 1]", probe);
        }

        info!(
            input = %classifier.input_name,
            output = %classifier.output_name,
            "Model loaded successfully"
        );

        Ok(classifier)
    }

    fn run(&self, features: &FeatureVector) -> Result<f64> {
        // Shape [1, num_features]
        let shape = vec![1_i64, FEATURE_COUNT as i64];
        let input_tensor = Tensor::from_array((shape, features.to_f32_vec()))
            .context("failed to create input tensor")?;

        let mut session = self.session.lock();
        let outputs = session.run(ort::inputs![&self.input_name => input_tensor])?;

        extract_probability(&outputs, &self.output_name)
    }
}

impl Classifier for TrainedClassifier {
    fn kind(&self) -> ModelKind {
        ModelKind::Trained
    }

    fn score_probability(&self, features: &FeatureVector) -> ScoringResult<f64> {
        let raw = self
            .run(features)
            .map_err(|e| ScoringError::Inference(format!("{:#}", e)))?;
        clamp_probability(raw)
    }
}

/// Pull the fraud-class probability out of the session outputs.
///
/// Tensor outputs come from XGBoost and sklearn exports; `seq(map)` outputs
/// come from LightGBM and CatBoost exports with zipmap enabled.
fn extract_probability(outputs: &SessionOutputs, output_name: &str) -> Result<f64> {
    if let Some(output) = outputs.get(output_name) {
        let dtype = output.dtype();

        if let Ok((shape, data)) = output.try_extract_tensor::<f32>() {
            if let Some(prob) = fraud_prob_from_tensor(&shape, data) {
                return Ok(prob);
            }
        }

        if DynSequenceValueType::can_downcast(&dtype) {
            if let Ok(prob) = fraud_prob_from_sequence_map(output) {
                return Ok(prob);
            }
        }
    }

    for (name, output) in outputs.iter() {
        if name.contains("label") {
            continue;
        }

        let dtype = output.dtype();

        if let Ok((shape, data)) = output.try_extract_tensor::<f32>() {
            if let Some(prob) = fraud_prob_from_tensor(&shape, data) {
                debug!(output = %name, prob = prob, "Extracted probability from fallback output");
                return Ok(prob);
            }
        }

        if DynSequenceValueType::can_downcast(&dtype) {
            if let Ok(prob) = fraud_prob_from_sequence_map(&output) {
                return Ok(prob);
            }
        }
    }

    Err(anyhow!("no probability output found"))
}

/// Class-1 probability from a `seq(map(int64, float))` value
fn fraud_prob_from_sequence_map(output: &ort::value::DynValue) -> Result<f64> {
    let allocator = Allocator::default();

    let sequence = output
        .downcast_ref::<DynSequenceValueType>()
        .map_err(|e| anyhow!("failed to downcast to sequence: {}", e))?;

    let maps = sequence.try_extract_sequence::<DynMapValueType>(&allocator)?;
    let map_value = maps.first().ok_or_else(|| anyhow!("empty sequence"))?;
    let kv_pairs = map_value.try_extract_key_values::<i64, f32>()?;

    if let Some((_, prob)) = kv_pairs.iter().find(|(class_id, _)| *class_id == 1) {
        return Ok(*prob as f64);
    }
    if let Some((_, prob)) = kv_pairs.iter().find(|(class_id, _)| *class_id == 0) {
        return Ok(1.0 - *prob as f64);
    }

    Err(anyhow!("no class probability found in map"))
}

/// Class-1 probability from a `[batch, classes]`, `[classes]` or `[batch, 1]` tensor
fn fraud_prob_from_tensor(shape: &ort::tensor::Shape, data: &[f32]) -> Option<f64> {
    let dims: Vec<i64> = shape.iter().copied().collect();
    let classes = dims.last().copied().unwrap_or(0);

    match (dims.len(), classes) {
        (1 | 2, c) if c >= 2 => data.get(1).map(|&v| v as f64),
        (1 | 2, 1) => data.first().map(|&v| v as f64),
        _ => data.last().map(|&v| v as f64),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ort::tensor::Shape;
    use std::io::Write;

    /// Six float inputs, `probabilities = sigmoid(mean(x))` with shape `[1, 1]`
    const FIXTURE_MODEL: &str =
        concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/mean_sigmoid.onnx");

    #[test]
    fn test_fraud_prob_from_tensor_shapes() {
        let cases: Vec<(Vec<i64>, Vec<f32>, Option<f64>)> = vec![
            (vec![1, 2], vec![0.75, 0.25], Some(0.25)),
            (vec![2], vec![0.6, 0.4], Some(0.4_f32 as f64)),
            (vec![1, 1], vec![0.125], Some(0.125)),
            (vec![1, 0], vec![], None),
            (vec![1, 1, 3], vec![0.1, 0.2, 0.5], Some(0.5)),
        ];

        for (dims, data, expected) in cases {
            let shape = Shape::new(dims.clone());
            assert_eq!(
                fraud_prob_from_tensor(&shape, &data),
                expected,
                "shape {:?}",
                dims
            );
        }
    }

    #[test]
    fn test_fixture_model_opens_and_scores() {
        let classifier = TrainedClassifier::open(FIXTURE_MODEL).unwrap();
        assert_eq!(classifier.kind(), ModelKind::Trained);
        assert_eq!(classifier.output_name, "probabilities");

        let zero = classifier
            .score_probability(&FeatureVector::new([0.0; FEATURE_COUNT]))
            .unwrap();
        assert!((zero - 0.5).abs() < 1e-6);

        let prob = classifier
            .score_probability(&FeatureVector::new([6.0, 0.0, 0.0, 0.0, 0.0, 0.0]))
            .unwrap();
        let expected = 1.0 / (1.0 + (-1.0_f64).exp());
        assert!((prob - expected).abs() < 1e-6);
    }

    #[test]
    fn test_missing_file_is_load_error() {
        let err = TrainedClassifier::open("does/not/exist.onnx").unwrap_err();
        match err {
            ScoringError::ModelLoad(msg) => assert!(msg.contains("not found")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_corrupt_file_is_load_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"definitely not a protobuf model").unwrap();

        let err = TrainedClassifier::open(file.path()).unwrap_err();
        assert!(matches!(err, ScoringError::ModelLoad(_)));
    }

    #[test]
    fn test_directory_is_load_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            TrainedClassifier::open(dir.path()),
            Err(ScoringError::ModelLoad(_))
        ));
    }
}
