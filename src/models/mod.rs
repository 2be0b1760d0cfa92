//! Classifier variants and startup model selection

pub mod classifier;
pub mod heuristic;
pub mod loader;
pub mod trained;

pub use classifier::Classifier;
pub use heuristic::{HeuristicClassifier, PerturbationSource};
pub use loader::{LoadedClassifier, ModelLoader};
pub use trained::TrainedClassifier;
