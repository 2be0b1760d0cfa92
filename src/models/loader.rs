//! Startup model selection with heuristic fallback

use crate::config::ModelConfig;
use crate::error::ScoringResult;
use crate::models::classifier::Classifier;
use crate::models::heuristic::HeuristicClassifier;
use crate::models::trained::TrainedClassifier;
use crate::types::score::ModelStatus;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// The classifier chosen at startup together with how it was chosen
#[derive(Clone)]
pub struct LoadedClassifier {
    pub classifier: Arc<dyn Classifier>,
    pub status: ModelStatus,
}

/// Loader that prefers the trained artifact and never fails
#[derive(Debug, Clone)]
pub struct ModelLoader {
    /// Number of threads for ONNX inference
    onnx_threads: usize,
    /// Seed for the fallback's perturbation; entropy when unset
    heuristic_seed: Option<u64>,
}

impl ModelLoader {
    pub fn new() -> Self {
        Self {
            onnx_threads: 1,
            heuristic_seed: None,
        }
    }

    pub fn from_config(config: &ModelConfig) -> Self {
        Self {
            onnx_threads: config.onnx_threads.max(1),
            heuristic_seed: config.heuristic_seed,
        }
    }

    pub fn with_heuristic_seed(mut self, seed: u64) -> Self {
        self.heuristic_seed = Some(seed);
        self
    }

    /// Open the artifact at `path`, falling back to the heuristic on any error
    pub fn load<P: AsRef<Path>>(&self, path: P) -> LoadedClassifier {
        let threads = self.onnx_threads.max(1);
        self.load_with(path, |p| {
            TrainedClassifier::open_with_threads(p, threads)
                .map(|c| Arc::new(c) as Arc<dyn Classifier>)
        })
    }

    /// Same as [`load`](Self::load) with a caller-supplied artifact opener
    pub fn load_with<P, F>(&self, path: P, open: F) -> LoadedClassifier
    where
        P: AsRef<Path>,
        F: FnOnce(&Path) -> ScoringResult<Arc<dyn Classifier>>,
    {
        let path = path.as_ref();
        let source = path.display().to_string();

        match open(path) {
            Ok(classifier) => {
                info!(path = %source, model = %classifier.kind(), "Trained classifier active");
                LoadedClassifier {
                    classifier,
                    status: ModelStatus::trained(source),
                }
            }
            Err(e) => {
                warn!(
                    path = %source,
                    error = %e,
                    "Failed to load trained model, falling back to heuristic classifier"
                );
                let heuristic = match self.heuristic_seed {
                    Some(seed) => HeuristicClassifier::with_seed(seed),
                    None => HeuristicClassifier::new(),
                };
                LoadedClassifier {
                    classifier: Arc::new(heuristic),
                    status: ModelStatus::heuristic(source, e.to_string()),
                }
            }
        }
    }
}

impl Default for ModelLoader {
    fn default() -> Self {
        Self::new()
    }
}
