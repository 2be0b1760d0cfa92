//! Offline scorer
//!
//! Reads JSON arrays of six features from stdin, one per line, and prints
//! the trained model's fraud probability for each. Exits non-zero on any
//! failure; there is no heuristic fallback here.

use anyhow::{Context, Result};
use clap::Parser;
use fraud_scoring::{Classifier, FeatureVector, TrainedClassifier};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "score-features", about = "Score feature vectors with a trained model")]
struct Args {
    /// Path to the ONNX model artifact
    model_path: PathBuf,

    /// Threads for ONNX inference
    #[arg(long, default_value_t = 1)]
    threads: usize,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let classifier = TrainedClassifier::open_with_threads(&args.model_path, args.threads.max(1))
        .with_context(|| format!("Failed to load model {}", args.model_path.display()))?;

    let stdin = io::stdin();
    let mut stdout = io::stdout().lock();
    let mut scored = 0usize;

    for (index, line) in stdin.lock().lines().enumerate() {
        let line = line.context("Failed to read stdin")?;
        if line.trim().is_empty() {
            continue;
        }

        let values: Vec<f64> = serde_json::from_str(&line)
            .with_context(|| format!("Line {}: expected a JSON array of numbers", index + 1))?;
        let features = FeatureVector::try_from(values)
            .with_context(|| format!("Line {}", index + 1))?;
        let prob = classifier
            .score_probability(&features)
            .with_context(|| format!("Line {}", index + 1))?;

        writeln!(stdout, "{}", prob)?;
        stdout.flush()?;
        scored += 1;
    }

    if scored == 0 {
        anyhow::bail!("No feature vectors on stdin");
    }

    Ok(())
}
