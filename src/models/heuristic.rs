//! Rule-based fallback classifier used when no trained artifact is available

use crate::error::ScoringResult;
use crate::models::classifier::{clamp_probability, Classifier};
use crate::types::score::{FeatureVector, ModelKind};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// log1p of roughly 3000 currency units
const LARGE_AMOUNT_LOG: f64 = 8.0;
const LARGE_AMOUNT_RISK: f64 = 0.3;
const EARLY_HOUR: f64 = 6.0;
const LATE_HOUR: f64 = 22.0;
const ODD_HOUR_RISK: f64 = 0.2;
const NEW_MERCHANT_RISK: f64 = 0.2;
const MAX_PERTURBATION: f64 = 0.1;

/// Source of the random term added to every heuristic score
pub enum PerturbationSource {
    /// Thread-local generator per call; the production default
    Entropy,
    /// Reproducible sequence from a fixed seed
    Seeded(Mutex<StdRng>),
    /// Constant term, clamped into `[0, 0.1)`
    Fixed(f64),
}

impl PerturbationSource {
    pub fn seeded(seed: u64) -> Self {
        PerturbationSource::Seeded(Mutex::new(StdRng::seed_from_u64(seed)))
    }

    fn sample(&self) -> f64 {
        match self {
            PerturbationSource::Entropy => rand::thread_rng().gen_range(0.0..MAX_PERTURBATION),
            PerturbationSource::Seeded(rng) => rng.lock().gen_range(0.0..MAX_PERTURBATION),
            PerturbationSource::Fixed(value) => {
                value.clamp(0.0, MAX_PERTURBATION - f64::EPSILON)
            }
        }
    }
}

impl std::fmt::Debug for PerturbationSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PerturbationSource::Entropy => write!(f, "Entropy"),
            PerturbationSource::Seeded(_) => write!(f, "Seeded"),
            PerturbationSource::Fixed(value) => write!(f, "Fixed({})", value),
        }
    }
}

/// Deterministic rules plus a small random term.
///
/// Not a fitted model; it only keeps the service answering.
#[derive(Debug)]
pub struct HeuristicClassifier {
    perturbation: PerturbationSource,
}

impl HeuristicClassifier {
    pub fn new() -> Self {
        Self::with_perturbation(PerturbationSource::Entropy)
    }

    pub fn with_seed(seed: u64) -> Self {
        Self::with_perturbation(PerturbationSource::seeded(seed))
    }

    pub fn with_perturbation(perturbation: PerturbationSource) -> Self {
        Self { perturbation }
    }

    /// Rule contribution before the random term is added
    pub fn base_risk(features: &FeatureVector) -> f64 {
        let mut risk = 0.0;

        if features.log_amount() > LARGE_AMOUNT_LOG {
            risk += LARGE_AMOUNT_RISK;
        }

        let hour = features.hour();
        if hour < EARLY_HOUR || hour > LATE_HOUR {
            risk += ODD_HOUR_RISK;
        }

        if features.merchant_freq() == 1.0 {
            risk += NEW_MERCHANT_RISK;
        }

        risk
    }
}

impl Default for HeuristicClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Classifier for HeuristicClassifier {
    fn kind(&self) -> ModelKind {
        ModelKind::Heuristic
    }

    fn score_probability(&self, features: &FeatureVector) -> ScoringResult<f64> {
        clamp_probability(Self::base_risk(features) + self.perturbation.sample())
    }
}
